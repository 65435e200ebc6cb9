use std::sync::Arc;

use tracing::{error, info};

use tempshare::{Config, ContentStore, Database, WebServer};

/// Config file used when no path is given on the command line.
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    // Load configuration
    let mut config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    // Initialize logging
    if let Err(e) = tempshare::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        tempshare::logging::init_console_only(&config.logging.level);
    }

    info!("tempshare - ephemeral file sharing");
    info!(
        "Retention: {}h, sweep every {}s, content root: {}",
        config.retention.max_age_hours,
        config.retention.sweep_interval_secs,
        config.storage.content_root
    );

    let db = match Database::open(&config.database.path).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to open database {}: {}", config.database.path, e);
            std::process::exit(1);
        }
    };

    let store = match ContentStore::new(&config.storage.content_root) {
        Ok(store) => store,
        Err(e) => {
            error!(
                "Failed to create content root {}: {}",
                config.storage.content_root, e
            );
            std::process::exit(1);
        }
    };

    let server = match WebServer::new(&config, db, store) {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        error!("Web server error: {}", e);
        std::process::exit(1);
    }
}
