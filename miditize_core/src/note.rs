// Completed note events.
//
// A `NoteEvent` is produced exactly once, at the moment a column's note
// closes. Row indices are still in grid units here; conversion into beats
// happens in sink.rs.

use serde::{Deserialize, Serialize};

/// One closed note from one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteEvent {
    /// MIDI pitch, equal to the grid column.
    pub pitch: u8,
    /// Row where the note opened (inclusive).
    pub start_row: u32,
    /// Row where the note closed (exclusive).
    pub end_row: u32,
    /// Half of the intensity that opened the note.
    pub velocity: u8,
    pub channel: u8,
}

impl NoteEvent {
    pub fn length_rows(&self) -> u32 {
        self.end_row - self.start_row
    }
}

/// Map a grayscale sample (0-255) onto MIDI velocity (0-127) by truncating
/// halving.
pub fn velocity_from_intensity(intensity: u8) -> u8 {
    intensity / 2
}
