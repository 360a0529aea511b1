//! The parser kernel: the abstract contract every mobility-event state
//! machine implements, plus the bundle of collaborators (`Context`) a
//! parser is lent for the duration of a single `feed` call.

use std::io::Write;

use crate::error::Error;
use crate::event::Event;
use crate::shared::SharedState;
use crate::warnings::{Reports, Warnings};

pub mod fast_recovery;
pub mod handover_failure;
pub mod handover_success;
pub mod slow_recovery;

pub use fast_recovery::FastRecoverAfterRlfParser;
pub use handover_failure::HandoverFailureParser;
pub use handover_success::HandoverSuccessParser;
pub use slow_recovery::SlowRecoverAfterRlfParser;

/// Everything a parser may read or write while handling one event, aside
/// from its own state: the shared cell/control record and the two output
/// sinks. Borrowed for the duration of a single `feed` call only — a
/// parser must never retain this across event boundaries.
pub struct Context<'a, R: Write, S: Write> {
    pub shared: &'a mut SharedState,
    pub reports: &'a mut Reports<R>,
    pub warnings: &'a mut Warnings<S>,
}

/// The contract implemented by each of the four mobility-event state
/// machines. `feed` must be total: packet types the parser does not
/// react to are silently ignored, never an error.
pub trait Parser<R: Write, S: Write> {
    /// Used to label warnings: `Warning [<name>] [<timestamp>]: ...`.
    fn name(&self) -> &'static str;

    fn feed(&mut self, event: &Event, ctx: &mut Context<R, S>) -> Result<(), Error>;

    /// Returns to the initial state of the normal transition graph.
    /// Must not touch `ctx.shared` — cell identifiers model physical
    /// reality and persist across resets. Fields that describe a commit
    /// already in flight (e.g. a pending PDCP-disruption window) must
    /// also survive: a parser's own commit can raise `reset_all` on the
    /// very event that populates those fields, so the Dispatcher may
    /// call `reset()` on this parser before the event those fields are
    /// waiting for arrives.
    fn reset(&mut self);
}
