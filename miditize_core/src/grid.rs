// The intensity grid: the encoder's only input.
//
// A row-major buffer of 8-bit grayscale samples whose width is fixed at
// `PITCH_COUNT` (one column per MIDI pitch). Height is whatever the image
// source produced after resampling. Row 0 is the top of the image and the
// start of the piece.
//
// Grid construction is the one place in this crate that validates shape:
// once an `IntensityGrid` exists, every (row, column) pair below `height`
// and `PITCH_COUNT` is addressable and the scan driver never fails.

use thiserror::Error;

/// Number of columns in every grid, one per MIDI pitch 0..=127.
pub const PITCH_COUNT: usize = 128;

/// Shading ramp for `preview`, darkest first.
const PREVIEW_RAMP: &[u8] = b" .:*#";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("grid needs {expected} samples ({per_row} per row), got {actual}", per_row = PITCH_COUNT)]
    SampleCount { expected: usize, actual: usize },
}

/// Fixed-width grid of intensity samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntensityGrid {
    height: usize,
    samples: Vec<u8>,
}

impl IntensityGrid {
    /// Create an all-black grid with the given number of rows.
    pub fn new(height: usize) -> Self {
        IntensityGrid {
            height,
            samples: vec![0; height * PITCH_COUNT],
        }
    }

    /// Build a grid from a row-major sample buffer.
    pub fn from_samples(height: usize, samples: Vec<u8>) -> Result<Self, GridError> {
        let expected = height * PITCH_COUNT;
        if samples.len() != expected {
            return Err(GridError::SampleCount {
                expected,
                actual: samples.len(),
            });
        }
        Ok(IntensityGrid { height, samples })
    }

    /// Build a grid from whole rows.
    pub fn from_rows(rows: &[[u8; PITCH_COUNT]]) -> Self {
        IntensityGrid {
            height: rows.len(),
            samples: rows.iter().flatten().copied().collect(),
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        PITCH_COUNT
    }

    /// Sample at (row, column). Panics when out of range, like slice indexing.
    pub fn sample(&self, row: usize, col: usize) -> u8 {
        self.samples[row * PITCH_COUNT + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        self.samples[row * PITCH_COUNT + col] = value;
    }

    /// One scanline, ordered by pitch.
    pub fn row(&self, row: usize) -> &[u8] {
        &self.samples[row * PITCH_COUNT..(row + 1) * PITCH_COUNT]
    }

    /// Iterate a single column top to bottom.
    pub fn column(&self, col: usize) -> impl Iterator<Item = u8> + '_ {
        self.samples.iter().skip(col).step_by(PITCH_COUNT).copied()
    }

    /// Paint `value` into `col` for every row in `rows`.
    pub fn fill_column_rows(&mut self, col: usize, rows: std::ops::Range<usize>, value: u8) {
        for row in rows {
            self.set(row, col, value);
        }
    }

    /// The raw row-major buffer.
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }
}

impl IntensityGrid {
    /// Render a shaded text picture of the grid for terminal preview.
    ///
    /// Columns are paired (64 characters per line) and rows are subsampled
    /// so at most `max_rows` lines come out. Each character shows the
    /// brightest sample it covers.
    pub fn preview(&self, max_rows: usize) -> String {
        let mut out = String::new();
        if self.height == 0 || max_rows == 0 {
            return out;
        }
        let step = self.height.div_ceil(max_rows);

        for top in (0..self.height).step_by(step) {
            let bottom = (top + step).min(self.height);
            for pair in 0..PITCH_COUNT / 2 {
                let mut peak = 0u8;
                for row in top..bottom {
                    let r = self.row(row);
                    peak = peak.max(r[pair * 2]).max(r[pair * 2 + 1]);
                }
                let level = peak as usize * PREVIEW_RAMP.len() / 256;
                out.push(PREVIEW_RAMP[level] as char);
            }
            out.push('\n');
        }
        out
    }

    /// Summary statistics, used for logging.
    pub fn stats(&self) -> GridStats {
        GridStats {
            rows: self.height,
            lit_samples: self.samples.iter().filter(|&&s| s > 0).count(),
            max_intensity: self.samples.iter().copied().max().unwrap_or(0),
        }
    }
}

/// Statistics about a grid's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridStats {
    pub rows: usize,
    pub lit_samples: usize,
    pub max_intensity: u8,
}
