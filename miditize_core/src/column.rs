// Per-column note state machines.
//
// Each grid column owns one `ColumnState`. The scan driver feeds it one
// sample per row, in row order, through a pure transition function that
// returns the next state plus a `Transition` describing what happened.
// Nothing here mutates shared state; the driver owns the state array.
//
// Two encoders exist:
// - Threshold: a sample at or above the threshold keeps a note sounding on
//   channel 0; anything below closes it.
// - Gradient: samples below `GRADIENT_BLACK_THRESHOLD` are silence; brighter
//   samples pick one of 16 channels by 16-unit band. A band change closes
//   the current note and opens a new one on the same row.
//
// Channel and velocity are fixed when a note opens. A note that opens on
// row r and closes on row r+1 is one row long; notes never have zero length
// because opening and closing never happen on the same row.

use crate::note::{NoteEvent, velocity_from_intensity};

/// Samples below this are silence in gradient mode.
pub const GRADIENT_BLACK_THRESHOLD: u8 = 16;

/// Width of one intensity band in gradient mode (16 bands, one per channel).
pub const GRADIENT_BAND_WIDTH: u8 = 16;

/// State of one column: silent, or holding a note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColumnState {
    #[default]
    Closed,
    Open {
        start_row: u32,
        velocity: u8,
        channel: u8,
    },
}

impl ColumnState {
    pub fn is_open(&self) -> bool {
        matches!(self, ColumnState::Open { .. })
    }

    fn open(row: u32, intensity: u8, channel: u8) -> Self {
        ColumnState::Open {
            start_row: row,
            velocity: velocity_from_intensity(intensity),
            channel,
        }
    }

    /// Close an open note at `end_row`. Returns `None` for a closed column.
    fn close(self, pitch: u8, end_row: u32) -> Option<NoteEvent> {
        match self {
            ColumnState::Closed => None,
            ColumnState::Open {
                start_row,
                velocity,
                channel,
            } => Some(NoteEvent {
                pitch,
                start_row,
                end_row,
                velocity,
                channel,
            }),
        }
    }
}

/// What a single step did to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Opened,
    ClosedWithEvent(NoteEvent),
    /// Gradient band change: the old note is emitted and a new one is open.
    ClosedAndReopenedWithEvent(NoteEvent),
}

impl Transition {
    /// The completed note, if this step produced one.
    pub fn event(&self) -> Option<NoteEvent> {
        match self {
            Transition::Unchanged | Transition::Opened => None,
            Transition::ClosedWithEvent(e) | Transition::ClosedAndReopenedWithEvent(e) => Some(*e),
        }
    }
}

/// Gradient band (and channel) for a sample.
pub fn gradient_band(intensity: u8) -> u8 {
    intensity / GRADIENT_BAND_WIDTH
}

/// Threshold encoder step. A sample equal to `threshold` counts as "on".
pub fn step_threshold(
    state: ColumnState,
    pitch: u8,
    row: u32,
    intensity: u8,
    threshold: u8,
) -> (ColumnState, Transition) {
    let on = intensity >= threshold;
    match (state, on) {
        (ColumnState::Closed, true) => (ColumnState::open(row, intensity, 0), Transition::Opened),
        (ColumnState::Open { .. }, true) | (ColumnState::Closed, false) => {
            (state, Transition::Unchanged)
        }
        (ColumnState::Open { .. }, false) => close_step(state, pitch, row),
    }
}

/// Gradient encoder step.
pub fn step_gradient(
    state: ColumnState,
    pitch: u8,
    row: u32,
    intensity: u8,
) -> (ColumnState, Transition) {
    if intensity < GRADIENT_BLACK_THRESHOLD {
        return close_step(state, pitch, row);
    }

    let band = gradient_band(intensity);
    match state {
        ColumnState::Closed => (ColumnState::open(row, intensity, band), Transition::Opened),
        ColumnState::Open { channel, .. } if channel == band => (state, Transition::Unchanged),
        ColumnState::Open {
            start_row,
            velocity,
            channel,
        } => {
            let event = NoteEvent {
                pitch,
                start_row,
                end_row: row,
                velocity,
                channel,
            };
            (
                ColumnState::open(row, intensity, band),
                Transition::ClosedAndReopenedWithEvent(event),
            )
        }
    }
}

/// Force-close a column at `row`, regardless of mode.
///
/// Equivalent to a zero-intensity step in gradient mode and in threshold
/// mode with a non-zero threshold. With a threshold of 0 a black sample is
/// still "on", so the flush pass calls this rather than stepping.
pub fn flush(state: ColumnState, pitch: u8, row: u32) -> (ColumnState, Transition) {
    close_step(state, pitch, row)
}

fn close_step(state: ColumnState, pitch: u8, row: u32) -> (ColumnState, Transition) {
    match state.close(pitch, row) {
        Some(event) => (ColumnState::Closed, Transition::ClosedWithEvent(event)),
        None => (ColumnState::Closed, Transition::Unchanged),
    }
}
