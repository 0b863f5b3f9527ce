//! YANS server binary

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use yans::{BackendType, Config, NntpServer, SqliteBackend, SERVER_NAME, SERVER_VERSION};

#[derive(Parser, Debug)]
#[command(name = "yans", version, about = "Yet Another News Server")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> yans::Result<()> {
    let config = Config::load(&cli.config)?;

    info!("Starting {SERVER_NAME} {SERVER_VERSION}...");
    let backend = match config.backend_type {
        BackendType::Sqlite => Arc::new(SqliteBackend::open(&config.sqlite.path).await?),
    };

    let mut server = NntpServer::new(config, backend);
    let addr = server.start().await?;
    info!("{SERVER_NAME} has been successfully started on {addr}");

    tokio::signal::ctrl_c().await?;
    info!("Stopping {SERVER_NAME}...");
    server.stop();

    Ok(())
}
