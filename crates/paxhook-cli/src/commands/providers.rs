use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use paxhook::admin::ProviderSummary;
use paxhook::settings::SettingsStore;

use crate::error::CliResult;
use crate::output::{OutputFormat, or_dash, truncate_string};

#[derive(Parser)]
pub struct ProvidersCommand {}

impl ProvidersCommand {
    pub async fn execute(&self, store: &dyn SettingsStore, format: OutputFormat) -> CliResult<()> {
        let settings = store.load().await?;
        let summaries = ProviderSummary::all(&settings);

        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            }
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["", "ID", "Name", "Dialect", "Key", "Model", "Base URL"]);

                for s in &summaries {
                    table.add_row([
                        if s.active { "*" } else { "" }.to_string(),
                        s.id.to_string(),
                        s.name.clone(),
                        s.dialect.clone(),
                        key_status(s).to_string(),
                        or_dash(s.model.as_deref()),
                        truncate_string(&or_dash(s.base_url.as_deref()), 48),
                    ]);
                }

                println!("{table}");
                println!("\n* active provider");
            }
        }

        Ok(())
    }
}

fn key_status(summary: &ProviderSummary) -> &'static str {
    match (summary.requires_key, summary.has_key) {
        (_, true) => "set",
        (true, false) => "missing",
        (false, false) => "-",
    }
}
