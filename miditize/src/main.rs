// miditize: CLI entry point.
//
// Converts an image into a MIDI file, one pitch per pixel column.
//
// Usage:
//   miditize <input_image> <output_midi> [-y F] [-t N] [-g] [-s] [-r N] [-e]
//     [--config FILE] [--tempo BPM] [--edge-low F] [--edge-high F]
//     [--no-adjust-origin] [--parallel] [--events FILE]
//
// Logging goes through env_logger (default level `info`, override with
// RUST_LOG). Exit status is 0 on success, 1 on a conversion error, and 2 on
// a usage error.

use miditize::{USAGE, UsageError, parse_args, run};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(UsageError::Help) => {
            println!("{USAGE}");
            return;
        }
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    let job = match cli.into_job() {
        Ok(job) => job,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    println!("=== miditize ===");
    println!("Input:  {}", job.input.display());
    println!("Output: {}", job.output.display());
    println!();

    match run(&job) {
        Ok(report) => {
            if let Some(preview) = &report.preview {
                println!("{preview}");
            }
            println!(
                "  {} rows -> {} notes ({} held to the end)",
                report.rows, report.notes, report.flushed
            );
            println!("  Length: {:.1} beats", report.length_beats);
            println!();
            println!("Play with: timidity {} (or any MIDI player)", job.output.display());
        }
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}
