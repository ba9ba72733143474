//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// GeoBroker - in-process broker with nearest-service lookup
#[derive(Parser)]
#[command(
    name = "gb",
    about = "In-process publish/request broker with a fleet of simulated geo services",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Number of geo services to start (overrides config)
    #[arg(short = 's', long, global = true)]
    pub services: Option<usize>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive command prompt (default)
    Repl,

    /// Start the fleet, find the service nearest to a point, and exit
    Nearest {
        /// Point as "X,Y"
        #[arg(value_name = "X,Y", allow_hyphen_values = true)]
        point: String,
    },

    /// Start the fleet, list the registered services, and exit
    Services,
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("geobroker")
        .join("logs")
        .join("geobroker.log")
}
