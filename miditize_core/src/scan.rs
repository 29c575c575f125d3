// The scan driver.
//
// Walks the grid once, rows top to bottom and pitches ascending within each
// row, stepping each column's state machine and forwarding closed notes to
// a sink as soon as they appear. After the last row a flush pass closes
// every note still open at row `height`, so nothing is ever dropped.
//
// Emission order is therefore (end_row, pitch). `encode_parallel` advances
// the 128 columns independently on the rayon pool and then sorts into that
// same order, so both entry points produce identical event lists.

use crate::column::{self, ColumnState, Transition};
use crate::grid::{IntensityGrid, PITCH_COUNT};
use crate::mode::EncodeMode;
use crate::note::NoteEvent;
use crate::sink::NoteSink;
use rayon::prelude::*;

/// Counts from one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub rows: usize,
    pub events: usize,
    /// Notes that were still open after the last row.
    pub flushed: usize,
}

/// Scan `grid` with `mode`, forwarding each closed note to `sink`.
pub fn scan<S: NoteSink + ?Sized>(
    grid: &IntensityGrid,
    mode: EncodeMode,
    sink: &mut S,
) -> ScanSummary {
    let mut states = [ColumnState::Closed; PITCH_COUNT];
    let mut summary = ScanSummary {
        rows: grid.height(),
        ..Default::default()
    };

    for row in 0..grid.height() {
        let samples = grid.row(row);
        for (pitch, state) in states.iter_mut().enumerate() {
            let (next, transition) = mode.step(*state, pitch as u8, row as u32, samples[pitch]);
            *state = next;
            if let Some(event) = transition.event() {
                summary.events += 1;
                sink.accept(event);
            }
        }
    }

    let end_row = grid.height() as u32;
    for (pitch, state) in states.iter_mut().enumerate() {
        let (next, transition) = column::flush(*state, pitch as u8, end_row);
        *state = next;
        if let Transition::ClosedWithEvent(event) = transition {
            summary.events += 1;
            summary.flushed += 1;
            sink.accept(event);
        }
    }

    log::debug!(
        "{} scan: {} rows, {} notes ({} flushed)",
        mode.name(),
        summary.rows,
        summary.events,
        summary.flushed
    );
    summary
}

/// Scan into a fresh event list.
pub fn encode(grid: &IntensityGrid, mode: EncodeMode) -> Vec<NoteEvent> {
    let mut events = Vec::new();
    scan(grid, mode, &mut events);
    events
}

/// Scan with columns advanced in parallel. Output order matches `encode`.
pub fn encode_parallel(grid: &IntensityGrid, mode: EncodeMode) -> Vec<NoteEvent> {
    let mut events: Vec<NoteEvent> = (0..PITCH_COUNT)
        .into_par_iter()
        .flat_map_iter(|pitch| scan_column(grid, mode, pitch))
        .collect();
    // At most one event per (end_row, pitch), so this key is total.
    events.sort_unstable_by_key(|e| (e.end_row, e.pitch));
    events
}

/// Run one column's state machine over the whole grid, including the flush.
fn scan_column(grid: &IntensityGrid, mode: EncodeMode, pitch: usize) -> Vec<NoteEvent> {
    let mut state = ColumnState::Closed;
    let mut events = Vec::new();
    for (row, sample) in grid.column(pitch).enumerate() {
        let (next, transition) = mode.step(state, pitch as u8, row as u32, sample);
        state = next;
        events.extend(transition.event());
    }
    let (_, transition) = column::flush(state, pitch as u8, grid.height() as u32);
    events.extend(transition.event());
    events
}
