use clap::Parser;
use shelf_core::config::{get_default_config_file, ShelfConfig, StorageConfig};
use shelf_server::http_server;
use shelf_store::{open_record_store, ResourceStore};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "shelf-daemon", about = "Session-scoped catalog service")]
struct Args {
    /// Path to config file
    #[arg(short, long, env = "SHELF_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP server address
    #[arg(long, env = "SHELF_HTTP_ADDR")]
    http_addr: Option<String>,

    /// SQLite database url; the in-memory store is used when neither this
    /// nor the config file selects a database
    #[arg(long, env = "SHELF_DATABASE_URL")]
    database_url: Option<String>,

    /// Mark the session cookie Secure (HTTPS only)
    #[arg(long)]
    secure_cookie: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line args
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .map_err(|e| anyhow::anyhow!("Invalid log filter {}: {}", args.log_level, e))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting shelf daemon");

    // Load config from file or use defaults
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => get_default_config_file("shelf")
            .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?,
    };
    let mut config = match ShelfConfig::load_from_file(&config_path) {
        Ok(cfg) => {
            info!("Loaded configuration from {}", config_path.display());
            cfg
        }
        Err(e) => {
            error!("Failed to load configuration from {}: {}", config_path.display(), e);
            return Err(anyhow::anyhow!("Configuration error: {}", e));
        }
    };

    // Update config from CLI args
    if let Some(http_addr) = args.http_addr {
        config.server.bind_addr = http_addr;
    }

    if let Some(url) = args.database_url {
        config.storage = StorageConfig::Sqlite {
            url,
            max_connections: match config.storage {
                StorageConfig::Sqlite { max_connections, .. } => max_connections,
                StorageConfig::Memory => 4,
            },
        };
    }

    if args.secure_cookie {
        config.identity.secure = true;
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    // Open the record store
    let backend = match open_record_store(&config.storage).await {
        Ok(backend) => backend,
        Err(e) => {
            error!(error = %e, "Failed to open record store");
            return Err(anyhow::anyhow!("Failed to open record store: {}", e));
        }
    };
    let store = ResourceStore::new(backend);

    if let Err(e) = http_server::run_server(config, store).await {
        error!(error = %e, "HTTP server failed");
        return Err(e);
    }

    info!("Shelf daemon shutting down");
    Ok(())
}
