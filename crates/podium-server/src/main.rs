use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use podium_core::config::{self, Config};
use podium_core::JudgingService;
use podium_server::routes;

#[derive(Debug, Parser)]
#[command(name = "podium-server", about = "Competition-judging HTTP service")]
struct Cli {
    /// Path to the YAML config; defaults apply when the file is absent.
    #[arg(long, env = "PODIUM_CONFIG", default_value = "podium.yaml")]
    config: PathBuf,

    /// Override the bind address from the config.
    #[arg(long, env = "PODIUM_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        tracing::info!(path = %cli.config.display(), "no config file, using defaults");
        Config::default()
    };
    let bind = cli.bind.unwrap_or_else(|| config.bind.clone());

    let service = Arc::new(JudgingService::from_config(&config));
    let app = routes::router(service);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(%bind, teams = config.teams.len(), "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
