//! Beaconwatch - Main Entry Point
//!
//! Connects to the configured MQTT broker, keeps the device registry fresh,
//! and hands the terminal to the interactive export menu.

use beaconwatch::config::SubscriberConfig;
use beaconwatch::menu;
use beaconwatch::observability::init_default_logging;
use beaconwatch::{ClientError, SubscriberApp};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

/// BLE gateway telemetry subscriber
#[derive(Parser)]
#[command(name = "beaconwatch")]
#[command(about = "MQTT subscriber for BLE gateway telemetry with CSV export")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the subscriber with the interactive export menu
    Run,
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_subscriber(config).await,
        Commands::Config { show } => handle_config_command(config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<SubscriberConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(SubscriberConfig::load_from_file(path)?)
        }
        None => {
            // Try default locations
            let default_paths = vec!["beaconwatch.toml", "config/beaconwatch.toml"];

            for path_str in default_paths {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(SubscriberConfig::load_from_file(&path)?);
                }
            }

            error!(
                "No configuration file found. Please provide one with -c/--config or create beaconwatch.toml"
            );
            process::exit(1);
        }
    }
}

async fn run_subscriber(config: SubscriberConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(broker = %config.broker.url, topic = %config.telemetry.topic, "starting subscriber");

    let mut app = match SubscriberApp::connect(config).await {
        Ok(app) => app,
        Err(e @ ClientError::ConnectionExhausted { .. }) => {
            // The one fatal path: without a broker connection there is
            // nothing to subscribe to.
            error!("{}", e);
            process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    menu::run(&mut app).await?;

    app.shutdown().await;
    Ok(())
}

fn handle_config_command(
    config: SubscriberConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(&config)?);
    }

    info!("Configuration validation complete");
    Ok(())
}
