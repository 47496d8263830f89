use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use paxhook::settings::{SettingKey, Settings, SettingsStore, redact};

use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct SettingsCommand {
    #[clap(subcommand)]
    pub command: SettingsSubcommand,
}

#[derive(Subcommand)]
pub enum SettingsSubcommand {
    #[clap(about = "Show all provider settings (API keys are masked)")]
    Show(ShowArgs),

    #[clap(about = "Read one setting")]
    Get(GetArgs),

    #[clap(about = "Change one setting (an empty value clears a provider field)")]
    Set(SetArgs),
}

#[derive(Parser)]
pub struct ShowArgs {
    #[clap(long, help = "Include settings that are empty")]
    pub all: bool,
}

#[derive(Parser)]
pub struct GetArgs {
    #[clap(help = "Setting key, e.g. provider, thinking_budget, anthropic.api_key")]
    pub key: String,

    #[clap(long, help = "Print API keys in full")]
    pub reveal: bool,
}

#[derive(Parser)]
pub struct SetArgs {
    #[clap(help = "Setting key, e.g. provider, thinking_budget, groq.model")]
    pub key: String,

    #[clap(help = "New value")]
    pub value: String,
}

impl SettingsCommand {
    pub async fn execute(&self, store: &dyn SettingsStore, format: OutputFormat) -> CliResult<()> {
        match &self.command {
            SettingsSubcommand::Show(args) => Self::show(store, args, format).await,
            SettingsSubcommand::Get(args) => Self::get(store, args, format).await,
            SettingsSubcommand::Set(args) => Self::set(store, args, format).await,
        }
    }

    async fn show(
        store: &dyn SettingsStore,
        args: &ShowArgs,
        format: OutputFormat,
    ) -> CliResult<()> {
        let settings = store.load().await?;
        let rows = display_rows(&settings, args.all);

        match format {
            OutputFormat::Json => {
                let output: serde_json::Map<String, serde_json::Value> = rows
                    .into_iter()
                    .map(|(k, v)| (k, serde_json::Value::String(v)))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Key", "Value"]);

                for (key, value) in rows {
                    table.add_row([key, value]);
                }

                println!("{table}");
            }
        }

        Ok(())
    }

    async fn get(
        store: &dyn SettingsStore,
        args: &GetArgs,
        format: OutputFormat,
    ) -> CliResult<()> {
        let key = SettingKey::parse(&args.key)?;
        let settings = store.load().await?;
        let value = display_value(&settings, key, args.reveal);

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({ "key": key.to_string(), "value": value });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => println!("{value}"),
        }

        Ok(())
    }

    async fn set(
        store: &dyn SettingsStore,
        args: &SetArgs,
        format: OutputFormat,
    ) -> CliResult<()> {
        let key = SettingKey::parse(&args.key)?;
        let settings = apply_setting(store, key, &args.value).await?;
        let value = display_value(&settings, key, false);

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({ "key": key.to_string(), "value": value });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                if value.is_empty() {
                    println!("Cleared {key}");
                } else {
                    println!("Set {key} = {value}");
                }
            }
        }

        Ok(())
    }
}

/// Load, change one key, save; returns the saved settings
pub async fn apply_setting(
    store: &dyn SettingsStore,
    key: SettingKey,
    value: &str,
) -> CliResult<Settings> {
    let mut settings = store.load().await?;
    settings.set(key, value)?;
    store.save(&settings).await?;
    Ok(settings)
}

fn display_value(settings: &Settings, key: SettingKey, reveal: bool) -> String {
    let value = settings.get(key);
    if key.is_secret() && !reveal {
        redact(&value)
    } else {
        value
    }
}

/// Key/value pairs for `settings show`, secrets masked
pub fn display_rows(settings: &Settings, include_empty: bool) -> Vec<(String, String)> {
    Settings::keys()
        .into_iter()
        .map(|key| (key.to_string(), display_value(settings, key, false)))
        .filter(|(_, value)| include_empty || !value.is_empty())
        .collect()
}
