//! Process-wide state shared cooperatively across all parsers.
//!
//! Split into two sub-records rather than one flat bag: [`CellState`] is
//! data-plane state that models physical reality and survives parser
//! resets, while [`ControlState`] carries the transient control-plane
//! signals (`reset_all`, `stall_once`) that a parser uses to talk back to
//! the dispatcher.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellState {
    pub last_serving_cell_dl_freq: Option<String>,
    pub last_serving_cell_ul_freq: Option<String>,
    pub last_serving_cell_id: Option<String>,
    pub last_serving_cell_identity: String,
}

impl Default for CellState {
    fn default() -> Self {
        Self {
            last_serving_cell_dl_freq: None,
            last_serving_cell_ul_freq: None,
            last_serving_cell_id: None,
            last_serving_cell_identity: "Unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    pub reset_all: bool,
    pub stall_once: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedState {
    pub cell: CellState,
    pub control: ControlState,
}
