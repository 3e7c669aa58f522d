use super::checkout;
use crate::error::ConfigError;
use crate::logging;
use crate::models::config::AppConfig;
use crate::services::config::ConfigManager;
use crate::services::inference::{Detector, HttpDetector};
use crate::services::order_session::OrderSession;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "bakery-pos", version, about = "Scan bread, build the order, take payment")]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan images into one order, printing the receipt after each scan
    Scan {
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Settle the order after the last scan
        #[arg(long)]
        pay: bool,

        /// Override the acceptance threshold for this run
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Print the price list
    Catalog,
    /// Print the resolved config file path
    ConfigPath,
}

fn config_manager(cli: &Cli) -> Result<ConfigManager, ConfigError> {
    match &cli.config {
        Some(path) => Ok(ConfigManager::with_file(path)),
        None => ConfigManager::new(),
    }
}

fn build_detector(config: &AppConfig) -> Option<Arc<dyn Detector>> {
    match HttpDetector::new(&config.inference) {
        Ok(detector) => Some(Arc::new(detector)),
        Err(e) => {
            warn!(error = %e, "failed to create inference client");
            None
        }
    }
}

/// Execute one CLI invocation, returning the text to print
pub async fn run(cli: Cli) -> Result<String, ConfigError> {
    let manager = config_manager(&cli)?;

    if let Command::ConfigPath = cli.command {
        return Ok(format!("{}\n", manager.config_file_path().display()));
    }

    let mut config = manager.load()?;
    logging::init(&config.logging);

    match cli.command {
        Command::Scan {
            images,
            pay,
            threshold,
        } => {
            if let Some(threshold) = threshold {
                config.acceptance.threshold = threshold;
            }

            let detector = build_detector(&config);
            if let Some(detector) = &detector {
                if let Err(e) = detector.health_check().await {
                    warn!(error = %e, "inference server health check failed");
                }
            }

            let session = OrderSession::from_config(&config, detector)?;
            info!(threshold = session.threshold(), images = images.len(), "scanning");

            let mut out = checkout::scan_files(&session, &images).await;
            if pay {
                out.push_str(&checkout::pay(&session).await);
            }
            Ok(out)
        }
        Command::Catalog => {
            let session = OrderSession::from_config(&config, None)?;
            Ok(checkout::catalog_listing(session.catalog()))
        }
        Command::ConfigPath => Ok(format!("{}\n", manager.config_file_path().display())),
    }
}
