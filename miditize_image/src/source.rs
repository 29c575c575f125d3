// The intensity grid source.
//
// Pipeline, in order:
// 1. decode the file (any format the `image` crate knows) to 8-bit luma
// 2. apply the requested `Orientation`
// 3. resample to exactly `PITCH_COUNT` columns; the row count keeps the
//    aspect ratio, `floor(height * 128 / width)`, and is at least 1
// 4. optionally replace the picture with its Canny edge map
//
// The result is handed to `IntensityGrid::from_samples`. Decode failures are
// reported before any scanning starts, so a bad input never produces a
// partial MIDI file.

use crate::orientation::Orientation;
use image::GrayImage;
use image::imageops::{self, FilterType};
use miditize_core::{GridError, IntensityGrid, PITCH_COUNT};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image {} has no pixels", path.display())]
    Empty { path: PathBuf },

    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Low/high hysteresis thresholds for the Canny edge pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeThresholds {
    pub low: f32,
    pub high: f32,
}

impl Default for EdgeThresholds {
    fn default() -> Self {
        EdgeThresholds {
            low: 150.0,
            high: 200.0,
        }
    }
}

/// Preprocessing choices for turning an image into a grid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GridSourceOptions {
    pub orientation: Orientation,
    /// Run edge detection after resampling when set.
    pub edges: Option<EdgeThresholds>,
}

/// Decode an image file and preprocess it into a grid.
pub fn load_grid(path: &Path, options: &GridSourceOptions) -> Result<IntensityGrid, SourceError> {
    let decoded = image::open(path).map_err(|source| SourceError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "decoded {} ({}x{})",
        path.display(),
        decoded.width(),
        decoded.height()
    );

    let luma = decoded.into_luma8();
    if luma.width() == 0 || luma.height() == 0 {
        return Err(SourceError::Empty {
            path: path.to_path_buf(),
        });
    }
    grid_from_luma(&luma, options)
}

/// Preprocess an in-memory grayscale image into a grid.
pub fn grid_from_luma(
    image: &GrayImage,
    options: &GridSourceOptions,
) -> Result<IntensityGrid, SourceError> {
    let oriented = options.orientation.apply(image);
    let rows = scaled_height(oriented.width(), oriented.height());

    let mut resized = imageops::resize(&oriented, PITCH_COUNT as u32, rows, FilterType::CatmullRom);
    if let Some(edges) = options.edges {
        resized = imageproc::edges::canny(&resized, edges.low, edges.high);
        log::debug!("edge pass with thresholds ({}, {})", edges.low, edges.high);
    }
    log::debug!(
        "resampled {}x{} -> {}x{}",
        oriented.width(),
        oriented.height(),
        PITCH_COUNT,
        rows
    );

    Ok(IntensityGrid::from_samples(rows as usize, resized.into_raw())?)
}

/// Rows after scaling the width to `PITCH_COUNT`, truncated, never 0.
fn scaled_height(width: u32, height: u32) -> u32 {
    let rows = u64::from(height) * PITCH_COUNT as u64 / u64::from(width.max(1));
    u32::try_from(rows).unwrap_or(u32::MAX).max(1)
}
