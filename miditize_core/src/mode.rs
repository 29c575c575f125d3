// Encoder mode selection.
//
// The scan driver holds one `EncodeMode` for the whole pass and asks it to
// step each column, so the threshold/gradient choice is made once instead
// of at every call site.

use crate::column::{self, ColumnState, Transition};

/// Default "on" threshold for threshold mode.
pub const DEFAULT_THRESHOLD: u8 = 64;

/// Which column encoder the scan runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeMode {
    /// Single-channel notes wherever a sample reaches `threshold`.
    Threshold { threshold: u8 },
    /// 16 intensity bands mapped to 16 MIDI channels.
    Gradient,
}

impl Default for EncodeMode {
    fn default() -> Self {
        EncodeMode::Threshold {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl EncodeMode {
    /// Advance one column by one sample.
    pub fn step(
        self,
        state: ColumnState,
        pitch: u8,
        row: u32,
        intensity: u8,
    ) -> (ColumnState, Transition) {
        match self {
            EncodeMode::Threshold { threshold } => {
                column::step_threshold(state, pitch, row, intensity, threshold)
            }
            EncodeMode::Gradient => column::step_gradient(state, pitch, row, intensity),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EncodeMode::Threshold { .. } => "threshold",
            EncodeMode::Gradient => "gradient",
        }
    }
}
