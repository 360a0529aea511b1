//! Correlates a linear stream of decoded LTE control-plane and MAC-layer
//! events into higher-level mobility reports: successful handovers,
//! handover failures and their recovery, and the two flavors of recovery
//! after a radio link failure, each annotated with its PDCP disruption
//! window.

pub mod dispatcher;
pub mod error;
pub mod event;
pub mod parser;
pub mod shared;
pub mod warnings;

pub use dispatcher::{Dispatcher, Outcome};
pub use error::Error;
pub use event::Event;
pub use shared::SharedState;
pub use warnings::ColorMode;
