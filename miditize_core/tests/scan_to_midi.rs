// End-to-end tests for the core pipeline: grid -> scan -> scaled sink -> SMF.
//
// Builds small synthetic grids, runs them through the real `MidiFile`
// writer, and parses the bytes back with midly to check what a MIDI player
// would actually see.

use midly::{MidiMessage, Smf, TrackEventKind};
use miditize_core::{
    EncodeMode, IntensityGrid, MidiFile, NoteEvent, PITCH_COUNT, ScaledSink, encode, scan,
};

/// Absolute-tick note-on events `(tick, channel, key, vel)` from a track.
fn note_ons(smf: &Smf<'_>, track: usize) -> Vec<(u32, u8, u8, u8)> {
    let mut tick = 0;
    let mut out = Vec::new();
    for ev in &smf.tracks[track] {
        tick += ev.delta.as_int();
        if let TrackEventKind::Midi {
            channel,
            message: MidiMessage::NoteOn { key, vel },
        } = ev.kind
        {
            out.push((tick, channel.as_int(), key.as_int(), vel.as_int()));
        }
    }
    out
}

/// A grid with a different pattern in every column, bright and dim.
fn busy_grid(rows: usize) -> IntensityGrid {
    let mut grid = IntensityGrid::new(rows);
    for row in 0..rows {
        for col in 0..PITCH_COUNT {
            let v = ((row * 31 + col * 17 + (row * col) % 5) % 256) as u8;
            grid.set(row, col, v);
        }
    }
    grid
}

#[test]
fn threshold_run_reaches_midi() {
    let mut grid = IntensityGrid::new(12);
    grid.fill_column_rows(60, 3..7, 200);

    let mut sink = ScaledSink::new(MidiFile::new(1).with_adjust_origin(false), 0.1);
    let summary = scan(&grid, EncodeMode::default(), &mut sink);
    assert_eq!(summary.events, 1);
    assert_eq!(sink.accepted(), 1);

    let bytes = sink.into_writer().to_bytes().unwrap();
    let smf = Smf::parse(&bytes).unwrap();
    // 0.3 beats at 960 ticks per beat.
    assert_eq!(note_ons(&smf, 1), vec![(288, 0, 60, 100)]);
}

#[test]
fn gradient_channels_reach_midi() {
    let mut grid = IntensityGrid::new(6);
    grid.fill_column_rows(64, 0..2, 20);
    grid.fill_column_rows(64, 2..5, 40);

    let mut sink = ScaledSink::new(MidiFile::new(1), 1.0);
    scan(&grid, EncodeMode::Gradient, &mut sink);
    let bytes = sink.into_writer().to_bytes().unwrap();
    let smf = Smf::parse(&bytes).unwrap();
    assert_eq!(note_ons(&smf, 1), vec![(0, 1, 64, 10), (1920, 2, 64, 20)]);
}

#[test]
fn every_note_is_monophonic_and_ordered() {
    let grid = busy_grid(64);
    for mode in [
        EncodeMode::default(),
        EncodeMode::Gradient,
        EncodeMode::Threshold { threshold: 0 },
        EncodeMode::Threshold { threshold: 255 },
    ] {
        let events = encode(&grid, mode);
        for pitch in 0..PITCH_COUNT as u8 {
            let mine: Vec<&NoteEvent> = events.iter().filter(|e| e.pitch == pitch).collect();
            for e in &mine {
                assert!(e.end_row > e.start_row, "{mode:?}: empty note {e:?}");
                assert!(e.end_row as usize <= grid.height());
            }
            for pair in mine.windows(2) {
                assert!(pair[0].start_row <= pair[1].start_row);
                assert!(pair[0].end_row <= pair[1].start_row, "{mode:?}: overlap {pair:?}");
            }
        }
    }
}

#[test]
fn zero_threshold_covers_every_column_once() {
    let grid = busy_grid(10);
    let events = encode(&grid, EncodeMode::Threshold { threshold: 0 });
    assert_eq!(events.len(), PITCH_COUNT);
    assert!(events.iter().all(|e| e.start_row == 0 && e.end_row == 10));
}

#[test]
fn gradient_velocity_and_channel_come_from_opening_sample() {
    let mut grid = IntensityGrid::new(4);
    grid.set(0, 1, 33);
    grid.set(1, 1, 47); // same band (2), brighter
    let events = encode(&grid, EncodeMode::Gradient);
    assert_eq!(
        events,
        vec![NoteEvent {
            pitch: 1,
            start_row: 0,
            end_row: 2,
            velocity: 16,
            channel: 2,
        }]
    );
}

/// All note events `(tick, is_on, key)` from a track, in file order.
fn note_events(smf: &Smf<'_>, track: usize) -> Vec<(u32, bool, u8)> {
    let mut tick = 0;
    let mut out = Vec::new();
    for ev in &smf.tracks[track] {
        tick += ev.delta.as_int();
        match ev.kind {
            TrackEventKind::Midi {
                message: MidiMessage::NoteOn { key, .. },
                ..
            } => out.push((tick, true, key.as_int())),
            TrackEventKind::Midi {
                message: MidiMessage::NoteOff { key, .. },
                ..
            } => out.push((tick, false, key.as_int())),
            _ => {}
        }
    }
    out
}

#[test]
fn one_row_note_survives_tiny_y_scale() {
    // One row is well under half a tick at this scale.
    let mut grid = IntensityGrid::new(3);
    grid.set(1, 60, 255);

    let mut sink = ScaledSink::new(MidiFile::new(1), 0.0001);
    scan(&grid, EncodeMode::default(), &mut sink);
    assert_eq!(sink.writer().note_count(), 1);

    let bytes = sink.into_writer().to_bytes().unwrap();
    let smf = Smf::parse(&bytes).unwrap();
    assert_eq!(note_events(&smf, 1), vec![(0, true, 60), (1, false, 60)]);
}

#[test]
fn collapsed_gradient_reopen_never_hangs() {
    let mut grid = IntensityGrid::new(2);
    grid.set(0, 64, 20);
    grid.set(1, 64, 40);

    let mut sink = ScaledSink::new(MidiFile::new(1), 0.0001);
    scan(&grid, EncodeMode::Gradient, &mut sink);
    assert_eq!(sink.writer().note_count(), 2);

    let bytes = sink.into_writer().to_bytes().unwrap();
    let smf = Smf::parse(&bytes).unwrap();
    let events = note_events(&smf, 1);
    let mut sounding = 0i32;
    for &(_, on, _) in &events {
        sounding += if on { 1 } else { -1 };
        assert!(sounding >= 0, "note-off before its note-on: {events:?}");
    }
    assert_eq!(sounding, 0);
}
