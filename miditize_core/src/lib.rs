// miditize_core: turns a grid of grayscale samples into MIDI note events.
//
// Each of the 128 grid columns is a MIDI pitch and each row is a slice of
// musical time. A bank of per-column state machines scans the rows top to
// bottom and decides when a note opens, continues, changes channel, or ends.
// Completed notes flow into a sink that scales row indices into beats and
// hands them to a MIDI writer.
//
// Architecture:
// - grid.rs:   `IntensityGrid`, the fixed-width (128 column) sample buffer,
//              plus a text preview renderer
// - note.rs:   `NoteEvent`, the immutable record of one closed note
// - column.rs: `ColumnState` and the pure transition functions for the
//              threshold and gradient encoders
// - mode.rs:   `EncodeMode`, selecting which transition function to run
// - scan.rs:   the scan driver (sequential and rayon-parallel) with the
//              final flush pass
// - sink.rs:   `NoteSink` / `NoteWriter` seams and the y-scale sink
// - midi.rs:   `MidiFile`, an SMF writer built on `midly`
//
// The encoder itself never fails: every state has a transition for every
// sample value. Errors only come from grid construction and MIDI output.

pub mod column;
pub mod grid;
pub mod midi;
pub mod mode;
pub mod note;
pub mod scan;
pub mod sink;

pub use column::{ColumnState, Transition};
pub use grid::{GridError, IntensityGrid, PITCH_COUNT};
pub use midi::{MidiError, MidiFile};
pub use mode::EncodeMode;
pub use note::NoteEvent;
pub use scan::{ScanSummary, encode, encode_parallel, scan};
pub use sink::{DEFAULT_Y_SCALE, NoteSink, NoteWriter, ScaledNote, ScaledSink};
