use std::sync::Arc;

use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use paxhook::admin::ModelsResponse;
use paxhook::config::Config;
use paxhook::providers::{ProviderId, ProviderRegistry};
use paxhook::proxy::Gateway;
use paxhook::retry::RetryPolicy;
use paxhook::settings::SettingsStore;

use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct ModelsCommand {
    #[clap(long, short, help = "Provider to probe (defaults to the active one)")]
    pub provider: Option<String>,

    #[clap(long, help = "Base URL to probe instead of the stored one")]
    pub base_url: Option<String>,
}

impl ModelsCommand {
    pub async fn execute(
        &self,
        config: &Config,
        store: Arc<dyn SettingsStore>,
        format: OutputFormat,
    ) -> CliResult<()> {
        let provider = self
            .provider
            .as_deref()
            .map(str::parse::<ProviderId>)
            .transpose()?;

        let client = reqwest::Client::builder()
            .timeout(config.retry.attempt_timeout())
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;

        let gateway = Gateway::new(
            store,
            ProviderRegistry::new(client),
            RetryPolicy::from(&config.retry),
            config.proxy.chat_path.clone(),
        );

        let response = probe(&gateway, provider, self.base_url.as_deref()).await?;

        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
            OutputFormat::Table => {
                let name = response.provider.spec().display_name;
                if !response.online {
                    println!(
                        "{name}: offline ({})",
                        response.error.as_deref().unwrap_or("unknown error")
                    );
                    return Ok(());
                }

                println!("{name}: online, {} models\n", response.models.len());

                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Model"]);

                for model in &response.models {
                    table.add_row([model]);
                }

                println!("{table}");
            }
        }

        Ok(())
    }
}

/// Run the connectivity probe and shape it like `/_paxhook/models`
pub async fn probe(
    gateway: &Gateway,
    provider: Option<ProviderId>,
    base_url: Option<&str>,
) -> CliResult<ModelsResponse> {
    let (provider, status) = gateway.probe(provider, base_url).await?;

    Ok(ModelsResponse {
        provider,
        online: status.online,
        models: status.models,
        error: status.error,
    })
}
