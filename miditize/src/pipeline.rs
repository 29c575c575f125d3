// The conversion pipeline: settings -> grid -> notes -> MIDI file.
//
// Stages run strictly in order and the output file is only touched at the
// very end, so a bad configuration or an unreadable image never leaves a
// partial MIDI file behind. The sequential scan forwards each note to the
// MIDI writer as it closes (and to the event list, for the JSON dump); the
// parallel scan collects first and forwards afterwards in the same order.

use crate::cli::Job;
use crate::config::ConfigError;
use miditize_core::{
    EncodeMode, IntensityGrid, MidiError, MidiFile, NoteEvent, NoteSink, ScaledSink,
    encode_parallel, scan,
};
use miditize_image::SourceError;
use std::fs::File;
use std::io::{BufWriter, Write};
use thiserror::Error;

/// Lines of text in the grid preview.
pub const PREVIEW_ROWS: usize = 48;

#[derive(Debug, Error)]
pub enum MiditizeError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Midi(#[from] MidiError),

    #[error("failed to write events file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode events: {0}")]
    Json(#[from] serde_json::Error),
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub rows: usize,
    pub notes: usize,
    /// Notes still sounding at the bottom of the image.
    pub flushed: usize,
    pub length_beats: f64,
    /// Text rendering of the grid, when the preview was requested.
    pub preview: Option<String>,
}

/// Run one conversion end to end.
pub fn run(job: &Job) -> Result<RunReport, MiditizeError> {
    let settings = job.settings.validate()?;
    log::info!(
        "mode {}, y-scale {}, orientation {:?}, edges {}",
        settings.mode.name(),
        settings.y_scale,
        settings.source.orientation,
        settings.source.edges.is_some()
    );

    let grid = miditize_image::load_grid(&job.input, &settings.source)?;
    let stats = grid.stats();
    log::debug!(
        "grid {} rows, {} lit samples, peak {}",
        stats.rows,
        stats.lit_samples,
        stats.max_intensity
    );
    let preview = settings.preview.then(|| grid.preview(PREVIEW_ROWS));

    let midi = MidiFile::new(1)
        .with_tempo(settings.tempo_bpm)
        .with_adjust_origin(settings.adjust_origin);
    let mut sink = ScaledSink::new(midi, settings.y_scale);
    let mut events: Vec<NoteEvent> = Vec::new();

    let flushed = if settings.parallel {
        encode_into_parallel(&grid, settings.mode, &mut events, &mut sink)
    } else {
        scan(&grid, settings.mode, &mut (&mut events, &mut sink)).flushed
    };

    if events.is_empty() {
        log::warn!("image produced no notes; the MIDI file will be silent");
    }

    if let Some(path) = &job.events {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &events)?;
        writer.flush()?;
        log::info!("wrote {} events to {}", events.len(), path.display());
    }

    let midi = sink.into_writer();
    midi.write(&job.output)?;

    Ok(RunReport {
        rows: grid.height(),
        notes: events.len(),
        flushed,
        length_beats: midi.length_beats(),
        preview,
    })
}

/// Parallel scan, then forward in canonical order. Returns the flush count.
fn encode_into_parallel(
    grid: &IntensityGrid,
    mode: EncodeMode,
    events: &mut Vec<NoteEvent>,
    sink: &mut ScaledSink<MidiFile>,
) -> usize {
    let height = grid.height() as u32;
    let mut flushed = 0;
    for event in encode_parallel(grid, mode) {
        // Flushed notes are exactly those closed at the synthetic row.
        if event.end_row == height {
            flushed += 1;
        }
        sink.accept(event);
        events.push(event);
    }
    flushed
}
