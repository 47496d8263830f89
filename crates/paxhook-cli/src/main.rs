use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use paxhook::config::Config;
use paxhook::settings::{FileSettingsStore, SettingsStore};
use paxhook_cli::commands::{ModelsCommand, ProvidersCommand, SettingsCommand};
use paxhook_cli::error::CliResult;
use paxhook_cli::output::OutputFormat;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "paxhook-cli")]
#[command(about = "paxhook CLI - manage provider settings for the paxhook proxy")]
#[command(version)]
pub struct Cli {
    #[clap(long, short, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[clap(long, short = 'c', global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[clap(
        long,
        short = 's',
        global = true,
        help = "Path to provider settings file (overrides the config)"
    )]
    pub settings: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Provider settings commands")]
    Settings(SettingsCommand),

    #[clap(about = "List supported providers and their effective configuration")]
    Providers(ProvidersCommand),

    #[clap(about = "Test a provider connection and list its models")]
    Models(ModelsCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    init_logging();

    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };

    let config = Config::load(cli.config.as_deref())?;
    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(|| config.settings.resolved_path());
    let store: Arc<dyn SettingsStore> = Arc::new(FileSettingsStore::new(settings_path));

    match &cli.command {
        Command::Settings(cmd) => cmd.execute(store.as_ref(), format).await,
        Command::Providers(cmd) => cmd.execute(store.as_ref(), format).await,
        Command::Models(cmd) => cmd.execute(&config, store, format).await,
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
