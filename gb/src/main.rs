//! GeoBroker - in-process broker demo
//!
//! CLI entry point: wires a broker to a fleet of geo services and hands it
//! to the interactive command surface.

use std::fs;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{debug, info};

use geobroker::broker::BrokerConfig;
use geobroker::cli::{Cli, Command, get_log_path};
use geobroker::config::Config;
use geobroker::geo::{GeoBroker, NearestFinder, RandomLocator, ServiceHandle, ServiceWorker};
use geobroker::repl::{self, parse_point};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(count) = cli.services {
        config.service.count = count;
    }
    config.validate().context("Invalid configuration")?;

    let broker = start_broker(config.broker.clone());
    let services = start_services(&config, &broker).await;
    info!(count = services.len(), "GeoBroker fleet started");

    debug!(command = ?cli.command, "main: dispatching command");
    let result = match cli.command {
        None | Some(Command::Repl) => repl::run_interactive(&config, broker.clone()).await,
        Some(Command::Nearest { point }) => cmd_nearest(&config, &broker, &point).await,
        Some(Command::Services) => cmd_services(&broker).await,
    };

    for service in services {
        service.stop().await;
    }
    broker.shutdown().await;
    result
}

fn start_broker(config: BrokerConfig) -> GeoBroker {
    let broker = GeoBroker::new(config);
    broker.start();
    broker
}

async fn start_services(config: &Config, broker: &GeoBroker) -> Vec<ServiceHandle> {
    let mut handles = Vec::with_capacity(config.service.count);
    for _ in 0..config.service.count {
        let worker = ServiceWorker::new(
            broker.clone(),
            RandomLocator::new(config.service.max_coordinate),
            config.service.heartbeat_interval(),
        );
        handles.push(worker.start().await);
    }
    handles
}

/// Find the nearest service once and print it
async fn cmd_nearest(config: &Config, broker: &GeoBroker, point: &str) -> Result<()> {
    debug!(%point, "cmd_nearest: called");
    let (x, y) = parse_point(point).map_err(|msg| eyre::eyre!(msg))?;
    let finder = NearestFinder::new(broker.clone(), &config.nearest)?;
    match finder.closest(x, y).await? {
        Some(found) => println!("{} {:.2}", found.service, found.dist),
        None => println!("no service answered"),
    }
    Ok(())
}

/// Print the registered services
async fn cmd_services(broker: &GeoBroker) -> Result<()> {
    debug!("cmd_services: called");
    let mut services = broker.get_services().await;
    services.sort();
    for service in services {
        println!("{}", service);
    }
    Ok(())
}
