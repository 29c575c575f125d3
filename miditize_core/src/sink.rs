// Event sinks: where closed notes go.
//
// `NoteSink` is what the scan driver talks to. The usual sink is
// `ScaledSink`, which converts row indices into beats with a single y-scale
// factor and forwards the result to a `NoteWriter` (normally `MidiFile`)
// on track 0. Tests and the event dump collect into a plain `Vec`.
//
// The y-scale is not checked here. Non-positive values produce zero or
// negative lengths; rejecting them is the configuration layer's job.

use crate::note::NoteEvent;

/// Default beats per grid row.
pub const DEFAULT_Y_SCALE: f64 = 0.1;

/// Receives closed notes in emission order.
pub trait NoteSink {
    fn accept(&mut self, event: NoteEvent);
}

impl NoteSink for Vec<NoteEvent> {
    fn accept(&mut self, event: NoteEvent) {
        self.push(event);
    }
}

impl<S: NoteSink + ?Sized> NoteSink for &mut S {
    fn accept(&mut self, event: NoteEvent) {
        (**self).accept(event);
    }
}

/// Fan out: every event goes to both sinks, first one first.
impl<A: NoteSink, B: NoteSink> NoteSink for (A, B) {
    fn accept(&mut self, event: NoteEvent) {
        self.0.accept(event);
        self.1.accept(event);
    }
}

/// A note writer in the shape of a MIDI file builder. Times are in beats.
pub trait NoteWriter {
    fn add_note(
        &mut self,
        track: usize,
        channel: u8,
        pitch: u8,
        start: f64,
        duration: f64,
        velocity: u8,
    );
}

/// A note after time scaling, as handed to the writer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledNote {
    pub track: usize,
    pub channel: u8,
    pub pitch: u8,
    pub start: f64,
    pub duration: f64,
    pub velocity: u8,
}

impl ScaledNote {
    /// Scale a row-indexed event into beats on track 0.
    pub fn from_event(event: &NoteEvent, y_scale: f64) -> Self {
        ScaledNote {
            track: 0,
            channel: event.channel,
            pitch: event.pitch,
            start: f64::from(event.start_row) * y_scale,
            duration: f64::from(event.length_rows()) * y_scale,
            velocity: event.velocity,
        }
    }
}

/// Sink that scales every event and forwards it to a writer.
#[derive(Debug)]
pub struct ScaledSink<W> {
    writer: W,
    y_scale: f64,
    accepted: usize,
    /// End of the latest note seen, in beats.
    end_beats: f64,
}

impl<W: NoteWriter> ScaledSink<W> {
    pub fn new(writer: W, y_scale: f64) -> Self {
        ScaledSink {
            writer,
            y_scale,
            accepted: 0,
            end_beats: 0.0,
        }
    }

    /// Scale one event, forward it, and return what was forwarded.
    pub fn record(&mut self, event: &NoteEvent) -> ScaledNote {
        let note = ScaledNote::from_event(event, self.y_scale);
        self.writer.add_note(
            note.track,
            note.channel,
            note.pitch,
            note.start,
            note.duration,
            note.velocity,
        );
        self.accepted += 1;
        self.end_beats = self.end_beats.max(note.start + note.duration);
        note
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn end_beats(&self) -> f64 {
        self.end_beats
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<W: NoteWriter> NoteSink for ScaledSink<W> {
    fn accept(&mut self, event: NoteEvent) {
        self.record(&event);
    }
}

impl NoteWriter for Vec<ScaledNote> {
    fn add_note(
        &mut self,
        track: usize,
        channel: u8,
        pitch: u8,
        start: f64,
        duration: f64,
        velocity: u8,
    ) {
        self.push(ScaledNote {
            track,
            channel,
            pitch,
            start,
            duration,
            velocity,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(start_row: u32, end_row: u32) -> NoteEvent {
        NoteEvent {
            pitch: 12,
            start_row,
            end_row,
            velocity: 100,
            channel: 3,
        }
    }

    #[test]
    fn test_scaling_matches_rows() {
        let mut sink = ScaledSink::new(Vec::<ScaledNote>::new(), DEFAULT_Y_SCALE);
        let note = sink.record(&event(3, 7));
        assert!((note.start - 0.3).abs() < 1e-9);
        assert!((note.duration - 0.4).abs() < 1e-9);
        assert_eq!(note.track, 0);
        assert_eq!(note.channel, 3);
        assert_eq!(note.pitch, 12);
        assert_eq!(note.velocity, 100);
    }

    #[test]
    fn test_forwards_to_writer() {
        let mut sink = ScaledSink::new(Vec::<ScaledNote>::new(), 0.5);
        sink.accept(event(0, 2));
        sink.accept(event(4, 6));
        assert_eq!(sink.accepted(), 2);
        assert!((sink.end_beats() - 3.0).abs() < 1e-9);
        let written = sink.into_writer();
        assert_eq!(written.len(), 2);
        assert!((written[1].start - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_nonpositive_scale_is_passed_through() {
        let mut sink = ScaledSink::new(Vec::<ScaledNote>::new(), -1.0);
        let note = sink.record(&event(1, 3));
        assert!((note.duration + 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_pair_sink_fans_out() {
        let mut events: Vec<NoteEvent> = Vec::new();
        let mut scaled = ScaledSink::new(Vec::<ScaledNote>::new(), 1.0);
        {
            let mut both = (&mut events, &mut scaled);
            both.accept(event(2, 5));
        }
        assert_eq!(events, vec![event(2, 5)]);
        assert_eq!(scaled.accepted(), 1);
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut sink: Vec<NoteEvent> = Vec::new();
        sink.accept(event(0, 1));
        assert_eq!(sink, vec![event(0, 1)]);
    }
}
