// MIDI output for scanned notes.
//
// `MidiFile` collects notes through the `NoteWriter` seam (times in beats)
// and renders them as a Standard MIDI File using the `midly` crate. Output
// is SMF Format 1: track 0 is a tempo track, and each note track follows it,
// so writer track `n` lands in SMF track `n + 1`.
//
// With `adjust_origin` on (the default) every note is shifted so the
// earliest one starts at beat 0, which drops leading silence from images
// with dark tops. At equal ticks note-offs are written before note-ons, so a
// gradient band change (close and reopen at the same row) stays well formed.

use crate::sink::NoteWriter;
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;
use thiserror::Error;

/// Ticks per quarter note (one beat) in MIDI output.
pub const TICKS_PER_QUARTER: u16 = 960;

/// Default tempo in BPM.
pub const DEFAULT_TEMPO_BPM: u32 = 120;

/// Largest tempo value (microseconds per quarter) a tempo meta event holds.
const MAX_TEMPO_MICROS: u32 = 0x00FF_FFFF;

/// Largest delta time a track event holds (28 bits).
const MAX_DELTA_TICKS: u32 = 0x0FFF_FFFF;

#[derive(Debug, Error)]
pub enum MidiError {
    #[error("failed to write MIDI file: {0}")]
    Io(#[from] std::io::Error),

    #[error("note on track {track}, but the file has {num_tracks} track(s)")]
    TrackOutOfRange { track: usize, num_tracks: usize },

    #[error("note out of MIDI range (channel {channel}, pitch {pitch}, velocity {velocity})")]
    NoteOutOfRange { channel: u8, pitch: u8, velocity: u8 },
}

/// A note waiting to be rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingNote {
    track: usize,
    channel: u8,
    pitch: u8,
    start: f64,
    duration: f64,
    velocity: u8,
}

/// In-memory MIDI file builder.
#[derive(Debug, Clone)]
pub struct MidiFile {
    num_tracks: usize,
    tempo_bpm: u32,
    adjust_origin: bool,
    notes: Vec<PendingNote>,
}

impl MidiFile {
    /// Create an empty file with `num_tracks` note tracks.
    pub fn new(num_tracks: usize) -> Self {
        MidiFile {
            num_tracks,
            tempo_bpm: DEFAULT_TEMPO_BPM,
            adjust_origin: true,
            notes: Vec::new(),
        }
    }

    pub fn with_tempo(mut self, bpm: u32) -> Self {
        self.tempo_bpm = bpm;
        self
    }

    pub fn with_adjust_origin(mut self, adjust: bool) -> Self {
        self.adjust_origin = adjust;
        self
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Beat where the first note starts, or 0 when origin adjustment is off.
    fn origin(&self) -> f64 {
        if !self.adjust_origin {
            return 0.0;
        }
        self.notes
            .iter()
            .map(|n| n.start)
            .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.min(s))))
            .unwrap_or(0.0)
    }

    /// Length of the rendered piece in beats, after origin adjustment.
    pub fn length_beats(&self) -> f64 {
        let origin = self.origin();
        self.notes
            .iter()
            .map(|n| n.start + n.duration - origin)
            .fold(0.0, f64::max)
    }

    /// Render to an in-memory SMF.
    pub fn to_smf(&self) -> Result<Smf<'static>, MidiError> {
        let mut smf = Smf::new(Header::new(
            Format::Parallel,
            Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
        ));
        smf.tracks.push(self.tempo_track());

        let origin = self.origin();
        let mut per_track: Vec<Vec<(u32, u8, TrackEventKind<'static>)>> =
            vec![Vec::new(); self.num_tracks];

        for note in &self.notes {
            if note.track >= self.num_tracks {
                return Err(MidiError::TrackOutOfRange {
                    track: note.track,
                    num_tracks: self.num_tracks,
                });
            }
            if note.channel > 15 || note.pitch > 127 || note.velocity > 127 {
                return Err(MidiError::NoteOutOfRange {
                    channel: note.channel,
                    pitch: note.pitch,
                    velocity: note.velocity,
                });
            }

            let start_tick = beats_to_ticks(note.start - origin);
            // At least one tick long: a zero-tick note would sort its off
            // ahead of its own on and hang.
            let end_tick = beats_to_ticks(note.start + note.duration - origin)
                .max(start_tick.saturating_add(1));
            let channel = u4::new(note.channel);
            let key = u7::new(note.pitch);

            let events = &mut per_track[note.track];
            events.push((
                start_tick,
                1,
                TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOn {
                        key,
                        vel: u7::new(note.velocity),
                    },
                },
            ));
            events.push((
                end_tick,
                0,
                TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOff {
                        key,
                        vel: u7::new(0),
                    },
                },
            ));
        }

        for mut events in per_track {
            // Stable: insertion order breaks the remaining ties.
            events.sort_by_key(|&(tick, order, _)| (tick, order));

            let mut track: Track<'static> = Vec::with_capacity(events.len() + 1);
            let mut last_tick = 0u32;
            for (tick, _, kind) in events {
                track.push(TrackEvent {
                    delta: u28::new((tick - last_tick).min(MAX_DELTA_TICKS)),
                    kind,
                });
                last_tick = tick;
            }
            track.push(TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
            });
            smf.tracks.push(track);
        }

        Ok(smf)
    }

    fn tempo_track(&self) -> Track<'static> {
        let micros = 60_000_000 / self.tempo_bpm.max(1);
        vec![
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(
                    micros.min(MAX_TEMPO_MICROS),
                ))),
            },
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
            },
        ]
    }

    /// Serialize to SMF bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MidiError> {
        let smf = self.to_smf()?;
        let mut buf = Vec::new();
        smf.write_std(&mut buf)?;
        Ok(buf)
    }

    /// Serialize and write to `path`.
    pub fn write(&self, path: &Path) -> Result<(), MidiError> {
        let buf = self.to_bytes()?;
        std::fs::write(path, &buf)?;
        log::info!(
            "wrote {} notes ({} bytes) to {}",
            self.notes.len(),
            buf.len(),
            path.display()
        );
        Ok(())
    }
}

impl NoteWriter for MidiFile {
    fn add_note(
        &mut self,
        track: usize,
        channel: u8,
        pitch: u8,
        start: f64,
        duration: f64,
        velocity: u8,
    ) {
        self.notes.push(PendingNote {
            track,
            channel,
            pitch,
            start,
            duration,
            velocity,
        });
    }
}

/// Nearest tick for a beat position; negative positions clamp to 0.
fn beats_to_ticks(beats: f64) -> u32 {
    let ticks = (beats * f64::from(TICKS_PER_QUARTER)).round();
    if ticks.is_finite() && ticks > 0.0 {
        ticks.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// (absolute tick, is_note_on, channel, key, velocity) for one SMF track.
    fn note_events(track: &Track<'_>) -> Vec<(u32, bool, u8, u8, u8)> {
        let mut tick = 0u32;
        let mut out = Vec::new();
        for ev in track {
            tick += ev.delta.as_int();
            if let TrackEventKind::Midi { channel, message } = ev.kind {
                match message {
                    MidiMessage::NoteOn { key, vel } => {
                        out.push((tick, true, channel.as_int(), key.as_int(), vel.as_int()));
                    }
                    MidiMessage::NoteOff { key, vel } => {
                        out.push((tick, false, channel.as_int(), key.as_int(), vel.as_int()));
                    }
                    _ => {}
                }
            }
        }
        out
    }

    #[test]
    fn test_empty_file_has_tempo_and_note_track() {
        let smf = MidiFile::new(1).to_smf().unwrap();
        assert_eq!(smf.tracks.len(), 2);
        assert!(matches!(
            smf.tracks[0][0].kind,
            TrackEventKind::Meta(MetaMessage::Tempo(t)) if t.as_int() == 500_000
        ));
        assert!(note_events(&smf.tracks[1]).is_empty());
    }

    #[test]
    fn test_note_ticks_with_origin_adjust() {
        let mut midi = MidiFile::new(1);
        midi.add_note(0, 0, 60, 0.3, 0.4, 100);
        midi.add_note(0, 2, 61, 0.5, 1.0, 10);
        let smf = midi.to_smf().unwrap();
        let events = note_events(&smf.tracks[1]);
        assert_eq!(
            events,
            vec![
                (0, true, 0, 60, 100),
                (192, true, 2, 61, 10),
                (384, false, 0, 60, 0),
                (1152, false, 2, 61, 0),
            ]
        );
        assert!((midi.length_beats() - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_no_origin_adjust_keeps_offsets() {
        let mut midi = MidiFile::new(1).with_adjust_origin(false);
        midi.add_note(0, 0, 60, 1.0, 0.5, 64);
        let events = note_events(&midi.to_smf().unwrap().tracks[1]);
        assert_eq!(events[0].0, 960);
        assert_eq!(events[1].0, 1440);
    }

    #[test]
    fn test_note_off_precedes_note_on_at_same_tick() {
        let mut midi = MidiFile::new(1);
        midi.add_note(0, 1, 70, 0.0, 0.2, 10);
        midi.add_note(0, 2, 70, 0.2, 0.3, 20);
        let events = note_events(&midi.to_smf().unwrap().tracks[1]);
        let at_192: Vec<bool> = events
            .iter()
            .filter(|e| e.0 == 192)
            .map(|e| e.1)
            .collect();
        assert_eq!(at_192, vec![false, true]);
    }

    #[test]
    fn test_sub_tick_note_lasts_one_tick() {
        let mut midi = MidiFile::new(1);
        midi.add_note(0, 0, 60, 0.0, 0.0001, 50);
        midi.add_note(0, 0, 61, 0.5, 0.0, 50);
        assert_eq!(midi.note_count(), 2);
        let events = note_events(&midi.to_smf().unwrap().tracks[1]);
        assert_eq!(
            events,
            vec![
                (0, true, 0, 60, 50),
                (1, false, 0, 60, 0),
                (480, true, 0, 61, 50),
                (481, false, 0, 61, 0),
            ]
        );
    }

    #[test]
    fn test_collapsed_reopen_keeps_on_off_balance() {
        // Band change on one pitch where both notes round to the same tick.
        let mut midi = MidiFile::new(1);
        midi.add_note(0, 1, 70, 0.0, 0.0001, 10);
        midi.add_note(0, 2, 70, 0.0001, 0.0001, 20);
        let events = note_events(&midi.to_smf().unwrap().tracks[1]);
        let kinds: Vec<bool> = events.iter().map(|e| e.1).collect();
        assert_eq!(kinds, vec![true, true, false, false]);
        assert!(events.iter().filter(|e| !e.1).all(|e| e.0 == 1));
    }

    #[test]
    fn test_rejects_unknown_track() {
        let mut midi = MidiFile::new(1);
        midi.add_note(3, 0, 60, 0.0, 1.0, 64);
        assert!(matches!(
            midi.to_smf(),
            Err(MidiError::TrackOutOfRange {
                track: 3,
                num_tracks: 1
            })
        ));
    }

    #[test]
    fn test_rejects_out_of_range_channel() {
        let mut midi = MidiFile::new(1);
        midi.add_note(0, 16, 60, 0.0, 1.0, 64);
        assert!(matches!(
            midi.to_smf(),
            Err(MidiError::NoteOutOfRange { channel: 16, .. })
        ));
    }

    #[test]
    fn test_tempo_setting() {
        let smf = MidiFile::new(1).with_tempo(60).to_smf().unwrap();
        assert!(matches!(
            smf.tracks[0][0].kind,
            TrackEventKind::Meta(MetaMessage::Tempo(t)) if t.as_int() == 1_000_000
        ));
    }

    #[test]
    fn test_bytes_parse_back() {
        let mut midi = MidiFile::new(1);
        midi.add_note(0, 0, 42, 0.0, 0.4, 100);
        let bytes = midi.to_bytes().unwrap();
        assert_eq!(&bytes[0..4], b"MThd");
        let parsed = Smf::parse(&bytes).unwrap();
        assert_eq!(parsed.header.format, Format::Parallel);
        assert_eq!(parsed.tracks.len(), 2);
        assert_eq!(note_events(&parsed.tracks[1]).len(), 2);
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mid");
        let mut midi = MidiFile::new(1);
        midi.add_note(0, 0, 42, 0.0, 0.4, 100);
        midi.write(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes, midi.to_bytes().unwrap());
    }

    #[test]
    fn test_write_to_missing_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("out.mid");
        let midi = MidiFile::new(1);
        assert!(matches!(midi.write(&path), Err(MidiError::Io(_))));
    }

    #[test]
    fn test_beats_to_ticks_rounding() {
        assert_eq!(beats_to_ticks(0.3), 288);
        assert_eq!(beats_to_ticks(-1.0), 0);
        assert_eq!(beats_to_ticks(f64::NAN), 0);
    }
}
