// Run configuration.
//
// `Settings` holds every tunable the converter reads, with defaults that
// match the command line's. It can be loaded from a JSON file; missing
// fields take their defaults, and command-line flags are applied on top
// (see cli.rs).
//
// Nothing is scanned until `Settings::validate` succeeds. Validation turns
// the loose, serde-friendly fields into typed values (`EncodeMode`,
// `Orientation`, `EdgeThresholds`) so the pipeline never sees a bad
// y-scale, threshold, rotation, or tempo.

use miditize_core::midi::DEFAULT_TEMPO_BPM;
use miditize_core::mode::DEFAULT_THRESHOLD;
use miditize_core::{DEFAULT_Y_SCALE, EncodeMode};
use miditize_image::{EdgeThresholds, GridSourceOptions, Orientation};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Slowest tempo whose quarter note still fits a MIDI tempo event.
pub const MIN_TEMPO_BPM: u32 = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("y-scale must be a positive finite number, got {0}")]
    YScale(f64),

    #[error("gray threshold must be within 0..=255, got {0}")]
    Threshold(i32),

    #[error("rotation selector must be within 0..=5, got {0}")]
    Rotation(u32),

    #[error("edge thresholds must satisfy 0 <= low <= high, got ({low}, {high})")]
    EdgeThresholds { low: f32, high: f32 },

    #[error("tempo must be at least {min} BPM, got {0}", min = MIN_TEMPO_BPM)]
    Tempo(u32),

    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Converter settings as written in a config file or on the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Beats per image row.
    pub y_scale: f64,
    /// Threshold-mode "on" level.
    pub threshold: i32,
    /// Use gradient (16-channel) mode instead of threshold mode.
    pub gradient: bool,
    /// Print a text rendering of the grid before encoding.
    pub preview: bool,
    /// Orientation selector, see `Orientation::from_selector`.
    pub rotation: u32,
    /// Replace the image with its edge map before scanning.
    pub edges: bool,
    pub edge_low: f32,
    pub edge_high: f32,
    pub tempo_bpm: u32,
    /// Shift output so the first note starts at beat 0.
    pub adjust_origin: bool,
    /// Scan columns on the rayon pool.
    pub parallel: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let edges = EdgeThresholds::default();
        Settings {
            y_scale: DEFAULT_Y_SCALE,
            threshold: i32::from(DEFAULT_THRESHOLD),
            gradient: false,
            preview: false,
            rotation: 0,
            edges: false,
            edge_low: edges.low,
            edge_high: edges.high,
            tempo_bpm: DEFAULT_TEMPO_BPM,
            adjust_origin: true,
            parallel: false,
        }
    }
}

/// Settings after validation, in the types the pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Validated {
    pub mode: EncodeMode,
    pub source: GridSourceOptions,
    pub y_scale: f64,
    pub tempo_bpm: u32,
    pub adjust_origin: bool,
    pub parallel: bool,
    pub preview: bool,
}

impl Settings {
    /// Load settings from a JSON file. Absent fields keep their defaults.
    pub fn load(path: &Path) -> Result<Settings, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<Validated, ConfigError> {
        if !self.y_scale.is_finite() || self.y_scale <= 0.0 {
            return Err(ConfigError::YScale(self.y_scale));
        }
        let threshold =
            u8::try_from(self.threshold).map_err(|_| ConfigError::Threshold(self.threshold))?;
        let orientation =
            Orientation::from_selector(self.rotation).ok_or(ConfigError::Rotation(self.rotation))?;
        if self.tempo_bpm < MIN_TEMPO_BPM {
            return Err(ConfigError::Tempo(self.tempo_bpm));
        }

        let edges = if self.edges {
            // Written so NaN fails too.
            if !(self.edge_low >= 0.0 && self.edge_low <= self.edge_high) {
                return Err(ConfigError::EdgeThresholds {
                    low: self.edge_low,
                    high: self.edge_high,
                });
            }
            Some(EdgeThresholds {
                low: self.edge_low,
                high: self.edge_high,
            })
        } else {
            None
        };

        let mode = if self.gradient {
            EncodeMode::Gradient
        } else {
            EncodeMode::Threshold { threshold }
        };

        Ok(Validated {
            mode,
            source: GridSourceOptions { orientation, edges },
            y_scale: self.y_scale,
            tempo_bpm: self.tempo_bpm,
            adjust_origin: self.adjust_origin,
            parallel: self.parallel,
            preview: self.preview,
        })
    }
}
