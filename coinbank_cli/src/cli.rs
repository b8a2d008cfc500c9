//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

pub const DEFAULT_CONFIG: &str = "etc/coinbank.toml";

#[derive(Parser, Debug)]
#[command(name = "coinbank", version, about = "Coin bank weight monitor")]
pub struct Cli {
    /// Path to config TOML [default: etc/coinbank.toml, built-in defaults if absent]
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Emit JSON lines on stdout and JSON logs on stderr
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins when set
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the sensor, persist readings and raise removal alerts
    Run {
        /// Use a simulated sensor instead of the serial port
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
        /// Log the weight and coin breakdown every N seconds
        #[arg(long, value_name = "SECS", default_value_t = 30)]
        status_every_s: u64,
        /// Stop on its own after N seconds instead of waiting for Ctrl-C
        #[arg(long, value_name = "SECS")]
        duration_s: Option<u64>,
    },
    /// Print the coin breakdown for a weight
    Breakdown {
        /// Weight in grams
        #[arg(long, allow_negative_numbers = true)]
        grams: f64,
        /// Price of a savings goal to report progress against
        #[arg(long, value_name = "VALUE")]
        prize: Option<f64>,
    },
    /// Feed weights through the detector and print what happens to each
    Simulate {
        /// Weights in grams, applied in order
        #[arg(required = true, allow_negative_numbers = true, value_name = "GRAMS")]
        weights: Vec<f64>,
        /// Deliver alerts through the configured channel instead of the log
        #[arg(long, action = ArgAction::SetTrue)]
        deliver: bool,
    },
    /// Validate config, then exercise the reading store and the sensor link
    SelfCheck {
        /// Check the simulated sensor instead of the serial port
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
    },
}
