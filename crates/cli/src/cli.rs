//! Command-line arguments

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "swing-tracker",
    author,
    version,
    about = "Real-time swing detection pipeline",
    long_about = "Streams wrist IMU samples through a sliding-window peak detector.\n\n\
                  Samples come from a synthetic generator or a recorded WristMotion CSV; \n\
                  sessions, swings and raw buffers are dispatched to the configured sinks."
)]
pub struct Cli {
    /// Log more (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SWING_TRACKER_VERBOSE")]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log line format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SWING_TRACKER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run detection over a mock stream or a recorded CSV
    Run(RunArgs),

    /// Load a config file and report problems
    Validate(ValidateArgs),

    /// Print the effective configuration
    Info(InfoArgs),
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Run(_) => "run",
            Self::Validate(_) => "validate",
            Self::Info(_) => "info",
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "SWING_TRACKER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Replay a WristMotion CSV instead of generating samples
    #[arg(long, env = "SWING_TRACKER_REPLAY", conflicts_with = "sessions")]
    pub replay: Option<PathBuf>,

    /// Number of concurrent mock sessions
    #[arg(long, default_value = "1")]
    pub sessions: usize,

    /// Session id (derived from device and start time when omitted)
    #[arg(long)]
    pub session_id: Option<String>,

    /// Mock stream length in seconds
    #[arg(long, default_value = "30")]
    pub duration: f64,

    /// Seconds between mock swings
    #[arg(long, default_value = "3")]
    pub swing_interval: f64,

    /// Seed for mock noise (incremented per session)
    #[arg(long, default_value = "7")]
    pub seed: u64,

    /// Playback speed relative to real time (0 = as fast as possible)
    #[arg(long, default_value = "0")]
    pub speed: f64,

    /// Re-deliver every n-th batch to exercise duplicate suppression
    #[arg(long)]
    pub duplicate_every: Option<usize>,

    /// Override the configured batch size
    #[arg(long, env = "SWING_TRACKER_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Add a file sink writing session records under this directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Stop all sessions after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "SWING_TRACKER_TIMEOUT")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SWING_TRACKER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Log an experimental racket speed estimate with each swing
    #[arg(long)]
    pub show_speed: bool,

    /// Resolve and print the configuration, then exit
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Config file to check
    #[arg(short, long, default_value = "swing-tracker.toml")]
    pub config: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Config file to describe
    #[arg(short, long, default_value = "swing-tracker.toml")]
    pub config: PathBuf,

    #[arg(long)]
    pub json: bool,

    /// Include each sink's params
    #[arg(long)]
    pub sinks: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    Json,
    /// Multi-line, for terminals
    #[default]
    Pretty,
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
