use std::process::ExitCode;

use tracing::{error, info};

use newswire::{Config, Database, Pipeline};

/// Environment variable naming the configuration file.
const CONFIG_ENV: &str = "NEWSWIRE_CONFIG";

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "config.toml".to_string());

    // Load configuration
    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = newswire::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        newswire::logging::init_console_only(&config.logging.level);
    }

    info!("newswire - breaking news aggregator");

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    let db = match Database::open(&config.database.path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match Pipeline::from_config(&config, db.clone()) {
        Ok(pipeline) => pipeline.run_cycle().await,
        Err(e) => Err(e),
    };
    db.close().await;

    match result {
        Ok(report) => {
            if report.notification.is_none() {
                info!("Notifications disabled");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Cycle failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
