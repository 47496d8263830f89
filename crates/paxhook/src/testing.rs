//! Test utilities for paxhook - fixtures and in-memory wiring
//!
//! Lets unit and integration tests build a gateway or router against mock
//! provider servers without touching the settings file on disk.

use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ProxyConfig;
use crate::providers::{ProviderId, ProviderRegistry};
use crate::proxy::{AppState, Gateway};
use crate::retry::RetryPolicy;
use crate::settings::{MemorySettingsStore, Settings};

/// Same attempt count as the default policy, with millisecond delays
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(5),
    }
}

/// Settings with `provider` active and pointed at `base_url`
pub fn settings_for(provider: ProviderId, base_url: &str, api_key: &str) -> Settings {
    let mut settings = Settings {
        provider,
        ..Settings::default()
    };
    let entry = settings.provider_settings_mut(provider);
    entry.base_url = base_url.to_string();
    entry.api_key = api_key.to_string();
    settings
}

/// Gateway over an in-memory settings store
pub fn test_gateway(settings: Settings) -> Gateway {
    Gateway::new(
        Arc::new(MemorySettingsStore::new(settings)),
        ProviderRegistry::new(reqwest::Client::new()),
        fast_retry(),
        ProxyConfig::default().chat_path,
    )
}

/// Router state with an in-memory settings store
pub fn test_state(config: ProxyConfig, settings: Settings) -> Arc<AppState> {
    let gateway = Gateway::new(
        Arc::new(MemorySettingsStore::new(settings)),
        ProviderRegistry::new(reqwest::Client::new()),
        fast_retry(),
        config.chat_path.clone(),
    );

    Arc::new(AppState {
        config,
        client: reqwest::Client::new(),
        gateway: Arc::new(gateway),
    })
}

/// Chat request body as the game sends it
pub fn chat_body(prompt: &str) -> Vec<u8> {
    json!({ "prompt": prompt, "promptStage": "chatWithUser" })
        .to_string()
        .into_bytes()
}

/// Action request body for a named schema
pub fn action_body(prompt: &str, stage: &str, schema_name: &str, schema: Value) -> Vec<u8> {
    json!({
        "prompt": prompt,
        "promptStage": stage,
        "jsonSchema": { "name": schema_name, "schema": schema },
    })
    .to_string()
    .into_bytes()
}
