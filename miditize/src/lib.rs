// miditize: convert images into MIDI files.
//
// Every pixel column of the (resampled, 128-wide) image is a MIDI pitch and
// every row is a step of time. Bright runs down a column become notes. In
// gradient mode the brightness band also picks the MIDI channel.
//
// Module overview:
// - `config.rs`:   `Settings` (JSON-loadable, validated before use)
// - `cli.rs`:      hand-rolled argument parsing into a `Job`
// - `pipeline.rs`: `run`, which loads, scans, and writes, plus the
//                  application-level `MiditizeError`
//
// The encoding itself lives in `miditize_core`, image handling in
// `miditize_image`.

pub mod cli;
pub mod config;
pub mod pipeline;

pub use cli::{Job, USAGE, UsageError, parse_args};
pub use config::{ConfigError, Settings};
pub use pipeline::{MiditizeError, RunReport, run};
