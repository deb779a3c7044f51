//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Overlay Streamer - one camera source shared by many frame consumers
#[derive(Parser, Debug)]
#[command(
    name = "overlay-streamer",
    author,
    version,
    about = "Shared camera frame broadcaster with overlay refresh",
    long_about = "Serves frames of a camera source to any number of concurrent consumers.\n\n\
                  The source is opened on first demand, stopped after an idle period, \n\
                  and every consumer receives each new frame at most once."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "OVERLAY_STREAMER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "OVERLAY_STREAMER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve one camera to simulated consumers
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "streamer.toml",
        env = "OVERLAY_STREAMER_CONFIG"
    )]
    pub config: PathBuf,

    /// Camera id to serve (defaults to the first configured camera)
    #[arg(long, env = "OVERLAY_STREAMER_CAMERA")]
    pub camera: Option<String>,

    /// Number of simulated consumers
    #[arg(long, default_value = "4", env = "OVERLAY_STREAMER_CONSUMERS")]
    pub consumers: usize,

    /// Run duration in seconds (0 = until Ctrl+C)
    #[arg(long, default_value = "0", env = "OVERLAY_STREAMER_DURATION")]
    pub duration: u64,

    /// Request rate of each consumer in Hz (0 = as fast as frames arrive)
    #[arg(long, default_value = "0", env = "OVERLAY_STREAMER_CONSUMER_FPS")]
    pub consumer_fps: f64,

    /// Validate configuration and exit without serving
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "OVERLAY_STREAMER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "streamer.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "streamer.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
