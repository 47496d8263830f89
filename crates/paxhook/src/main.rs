//! paxhook daemon - intercepting proxy for the game's chat endpoint

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use paxhook::config::Config;
use paxhook::error::Result;
use paxhook::proxy::ProxyServer;
use paxhook::settings::{FileSettingsStore, SettingsStore};

/// paxhook - answer Pax Historia's chat requests with the LLM of your choice
#[derive(Parser)]
#[command(name = "paxhook")]
#[command(about = "An intercepting proxy that routes the game's AI calls to your own LLM provider")]
#[command(version)]
pub struct Cli {
    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the proxy server (default command)
    #[command(name = "serve")]
    Serve,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => serve(cli.config).await,
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,paxhook=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(config_path: Option<PathBuf>) -> Result<()> {
    tracing::info!("Starting paxhook daemon");

    let config = Config::load(config_path.as_deref())?;
    tracing::debug!("Config loaded: {:?}", config);

    let store = FileSettingsStore::new(config.settings.resolved_path());
    tracing::info!("Provider settings: {}", store.path().display());

    let settings = store.load().await?;
    tracing::info!(
        provider = %settings.provider,
        "Active provider: {}",
        settings.provider.spec().display_name
    );

    let proxy = ProxyServer::new(config, Arc::new(store));
    proxy.serve().await?;

    tracing::info!("paxhook daemon stopped");
    Ok(())
}
