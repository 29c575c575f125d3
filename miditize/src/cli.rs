// Command-line parsing.
//
// Hand-rolled over `std::env::args()`, matching flags one at a time. Two
// positional arguments (input image, output MIDI) are required. Flags that
// mirror `Settings` fields are kept as `Option`s and layered over whatever
// the `--config` file (or the defaults) provided.

use crate::config::{ConfigError, Settings};
use std::path::PathBuf;
use thiserror::Error;

pub const USAGE: &str = "\
Usage: miditize <input_image> <output_midi> [OPTIONS]

Options:
  -y <F>              Y scale, beats per image row (default 0.1)
  -t <N>              Gray threshold, 0-255 (default 64)
  -g                  Channel gradient mode
  -s                  Show a text preview of the resized image
  -r <N>              Rotation: 0 none, 1 90, 2 180, 3 270, 4 flip, 5 mirror
  -e                  Edge detection before scanning
  --config <FILE>     JSON settings file (flags override it)
  --tempo <BPM>       Tempo of the MIDI file (default 120)
  --edge-low <F>      Low edge threshold (default 150)
  --edge-high <F>     High edge threshold (default 200)
  --no-adjust-origin  Keep leading silence before the first note
  --parallel          Scan columns in parallel
  --events <FILE>     Also write the note events as JSON
  -h, --help          Show this message";

#[derive(Debug, Error, PartialEq)]
pub enum UsageError {
    #[error("help requested")]
    Help,

    #[error("{0} requires a value")]
    MissingValue(String),

    #[error("invalid value '{value}' for {flag}")]
    InvalidValue { flag: String, value: String },

    #[error("unknown option {0}")]
    UnknownFlag(String),

    #[error("expected <input_image> and <output_midi>")]
    MissingPositional,

    #[error("unexpected argument {0}")]
    ExtraPositional(String),
}

/// Parsed command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub config: Option<PathBuf>,
    pub events: Option<PathBuf>,
    pub y_scale: Option<f64>,
    pub threshold: Option<i32>,
    pub rotation: Option<u32>,
    pub tempo_bpm: Option<u32>,
    pub edge_low: Option<f32>,
    pub edge_high: Option<f32>,
    pub gradient: bool,
    pub preview: bool,
    pub edges: bool,
    pub no_adjust_origin: bool,
    pub parallel: bool,
}

/// One complete conversion request.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
    pub events: Option<PathBuf>,
    pub settings: Settings,
}

/// Parse arguments, not including the program name.
pub fn parse_args(args: &[String]) -> Result<CliArgs, UsageError> {
    let mut cli = CliArgs::default();
    let mut positional: Vec<PathBuf> = Vec::new();
    let mut i = 0;

    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "-h" | "--help" => return Err(UsageError::Help),
            "-g" => cli.gradient = true,
            "-s" => cli.preview = true,
            "-e" => cli.edges = true,
            "--no-adjust-origin" => cli.no_adjust_origin = true,
            "--parallel" => cli.parallel = true,
            "-y" => cli.y_scale = Some(parse_value(args, &mut i)?),
            "-t" => cli.threshold = Some(parse_value(args, &mut i)?),
            "-r" => cli.rotation = Some(parse_value(args, &mut i)?),
            "--tempo" => cli.tempo_bpm = Some(parse_value(args, &mut i)?),
            "--edge-low" => cli.edge_low = Some(parse_value(args, &mut i)?),
            "--edge-high" => cli.edge_high = Some(parse_value(args, &mut i)?),
            "--config" => cli.config = Some(PathBuf::from(take_value(args, &mut i)?)),
            "--events" => cli.events = Some(PathBuf::from(take_value(args, &mut i)?)),
            // A lone "-" is not a flag; negative numbers only appear as values.
            _ if arg.starts_with('-') && arg.len() > 1 => {
                return Err(UsageError::UnknownFlag(arg.to_string()));
            }
            _ => {
                if positional.len() == 2 {
                    return Err(UsageError::ExtraPositional(arg.to_string()));
                }
                positional.push(PathBuf::from(arg));
            }
        }
        i += 1;
    }

    let mut positional = positional.into_iter();
    match (positional.next(), positional.next()) {
        (Some(input), Some(output)) => {
            cli.input = input;
            cli.output = output;
            Ok(cli)
        }
        _ => Err(UsageError::MissingPositional),
    }
}

/// Advance past a flag and return its value.
fn take_value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str, UsageError> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| UsageError::MissingValue(flag.clone()))
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: &mut usize) -> Result<T, UsageError> {
    let flag = args[*i].clone();
    let value = take_value(args, i)?;
    value.parse().map_err(|_| UsageError::InvalidValue {
        flag,
        value: value.to_string(),
    })
}

impl CliArgs {
    /// Layer command-line flags over `settings`.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(y) = self.y_scale {
            settings.y_scale = y;
        }
        if let Some(t) = self.threshold {
            settings.threshold = t;
        }
        if let Some(r) = self.rotation {
            settings.rotation = r;
        }
        if let Some(bpm) = self.tempo_bpm {
            settings.tempo_bpm = bpm;
        }
        if let Some(low) = self.edge_low {
            settings.edge_low = low;
        }
        if let Some(high) = self.edge_high {
            settings.edge_high = high;
        }
        settings.gradient |= self.gradient;
        settings.preview |= self.preview;
        settings.edges |= self.edges;
        settings.parallel |= self.parallel;
        if self.no_adjust_origin {
            settings.adjust_origin = false;
        }
    }

    /// Resolve the config file (if any) and flags into a `Job`.
    pub fn into_job(self) -> Result<Job, ConfigError> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        self.apply(&mut settings);
        Ok(Job {
            input: self.input,
            output: self.output,
            events: self.events,
            settings,
        })
    }
}
