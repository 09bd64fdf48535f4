//! Command-line interface for parlo
//!
//! Handles argument parsing and logging configuration.

use clap::{Parser, ValueEnum};
use log::LevelFilter;

/// Which front end to run
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Frequency-bar microphone visualizer
    Visualize,
    /// Voice loop: record, transcribe remotely, speak the response
    Assist,
}

/// parlo - microphone visualizer and voice-loop assistant
#[derive(Parser, Debug)]
#[command(name = "parlo")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Which front end to run
    #[arg(value_enum, default_value = "visualize")]
    pub mode: Mode,

    /// Increase logging verbosity (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Get the log level filter based on verbosity flags
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else {
            match self.verbose {
                0 => LevelFilter::Warn,
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }
}

/// Initialize the logging system based on CLI arguments
pub fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::new();

    // Keep deps at warn so wgpu/winit internals don't flood the output
    builder.filter_level(LevelFilter::Warn);
    builder.filter_module("parlo", args.log_level());

    if args.verbose >= 3 {
        builder.filter_module("wgpu_core", LevelFilter::Info);
        builder.filter_module("naga", LevelFilter::Info);
    }

    builder.format_timestamp_millis().init();
}
