//! Error taxonomy for event decoding and field access.
//!
//! `ProtocolAnomaly` conditions (double handover commands, missing
//! measurement reports, etc.) are deliberately *not* represented here:
//! they never fail a call, they are routed to the warning sink
//! (`crate::warnings`) and the handler still returns `Ok(())`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    #[error("malformed event at line {line}: expected 3 '$'-separated fields, got {raw:?}")]
    MalformedEvent { line: usize, raw: String },

    #[error("packet type {packet_type:?} is missing expected field {field:?}")]
    MissingField {
        packet_type: String,
        field: &'static str,
    },
}
