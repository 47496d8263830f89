//! User-editable provider settings
//!
//! Settings are the runtime knobs a player changes while the daemon runs:
//! which provider answers chat requests, per-provider keys, models and base
//! URLs, and the Gemini thinking budget. They are persisted through a
//! [`SettingsStore`] and re-read on every intercepted request.

mod store;

pub use store::{FileSettingsStore, MemorySettingsStore, SettingsStore};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{HookError, Result};
use crate::providers::ProviderId;

/// Default Gemini thinking budget, in tokens
pub const DEFAULT_THINKING_BUDGET: i32 = 4096;

/// Per-provider credentials and overrides
///
/// Empty strings mean "not set"; model and base URL then fall back to the
/// provider table defaults.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub model: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub base_url: String,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Field of a [`ProviderSettings`] addressable by key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderField {
    ApiKey,
    Model,
    BaseUrl,
}

impl ProviderField {
    pub const ALL: [ProviderField; 3] = [
        ProviderField::ApiKey,
        ProviderField::Model,
        ProviderField::BaseUrl,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderField::ApiKey => "api_key",
            ProviderField::Model => "model",
            ProviderField::BaseUrl => "base_url",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s)
    }
}

/// A parsed settings key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    /// `provider`
    ActiveProvider,
    /// `thinking_budget`
    ThinkingBudget,
    /// `<provider>.<field>`
    Provider(ProviderId, ProviderField),
}

impl SettingKey {
    pub fn parse(key: &str) -> Result<Self> {
        match key.trim() {
            "provider" => Ok(SettingKey::ActiveProvider),
            "thinking_budget" => Ok(SettingKey::ThinkingBudget),
            other => {
                let (provider, field) = other
                    .split_once('.')
                    .ok_or_else(|| HookError::Settings(format!("unknown setting '{other}'")))?;
                let provider: ProviderId = provider.parse().map_err(HookError::Settings)?;
                let field = ProviderField::parse(field).ok_or_else(|| {
                    HookError::Settings(format!(
                        "unknown field '{field}' for provider {provider} (expected api_key, model or base_url)"
                    ))
                })?;
                Ok(SettingKey::Provider(provider, field))
            }
        }
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, SettingKey::Provider(_, ProviderField::ApiKey))
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingKey::ActiveProvider => f.write_str("provider"),
            SettingKey::ThinkingBudget => f.write_str("thinking_budget"),
            SettingKey::Provider(id, field) => write!(f, "{id}.{}", field.as_str()),
        }
    }
}

/// Full persisted settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Provider that answers intercepted chat requests
    pub provider: ProviderId,
    /// Gemini `thinkingBudget`; `-1` lets the model decide
    pub thinking_budget: i32,
    pub google: ProviderSettings,
    pub anthropic: ProviderSettings,
    pub openrouter: ProviderSettings,
    pub openai: ProviderSettings,
    pub groq: ProviderSettings,
    pub ollama: ProviderSettings,
    pub lmstudio: ProviderSettings,
    pub together: ProviderSettings,
    pub fireworks: ProviderSettings,
    pub mistral: ProviderSettings,
    pub copilot: ProviderSettings,
    pub generic: ProviderSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: ProviderId::Google,
            thinking_budget: DEFAULT_THINKING_BUDGET,
            google: ProviderSettings::default(),
            anthropic: ProviderSettings::default(),
            openrouter: ProviderSettings::default(),
            openai: ProviderSettings::default(),
            groq: ProviderSettings::default(),
            ollama: ProviderSettings::default(),
            lmstudio: ProviderSettings::default(),
            together: ProviderSettings::default(),
            fireworks: ProviderSettings::default(),
            mistral: ProviderSettings::default(),
            copilot: ProviderSettings::default(),
            generic: ProviderSettings::default(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Settings");
        s.field("provider", &self.provider)
            .field("thinking_budget", &self.thinking_budget);
        for id in ProviderId::ALL {
            s.field(id.as_str(), self.provider_settings(id));
        }
        s.finish()
    }
}

impl Settings {
    pub fn provider_settings(&self, id: ProviderId) -> &ProviderSettings {
        match id {
            ProviderId::Google => &self.google,
            ProviderId::Anthropic => &self.anthropic,
            ProviderId::OpenRouter => &self.openrouter,
            ProviderId::OpenAi => &self.openai,
            ProviderId::Groq => &self.groq,
            ProviderId::Ollama => &self.ollama,
            ProviderId::LmStudio => &self.lmstudio,
            ProviderId::Together => &self.together,
            ProviderId::Fireworks => &self.fireworks,
            ProviderId::Mistral => &self.mistral,
            ProviderId::Copilot => &self.copilot,
            ProviderId::Generic => &self.generic,
        }
    }

    pub fn provider_settings_mut(&mut self, id: ProviderId) -> &mut ProviderSettings {
        match id {
            ProviderId::Google => &mut self.google,
            ProviderId::Anthropic => &mut self.anthropic,
            ProviderId::OpenRouter => &mut self.openrouter,
            ProviderId::OpenAi => &mut self.openai,
            ProviderId::Groq => &mut self.groq,
            ProviderId::Ollama => &mut self.ollama,
            ProviderId::LmStudio => &mut self.lmstudio,
            ProviderId::Together => &mut self.together,
            ProviderId::Fireworks => &mut self.fireworks,
            ProviderId::Mistral => &mut self.mistral,
            ProviderId::Copilot => &mut self.copilot,
            ProviderId::Generic => &mut self.generic,
        }
    }

    /// Every addressable key, in display order
    pub fn keys() -> Vec<SettingKey> {
        let mut keys = vec![SettingKey::ActiveProvider, SettingKey::ThinkingBudget];
        for id in ProviderId::ALL {
            for field in ProviderField::ALL {
                keys.push(SettingKey::Provider(id, field));
            }
        }
        keys
    }

    /// Read a value by key; unset provider fields read as an empty string
    pub fn get(&self, key: SettingKey) -> String {
        match key {
            SettingKey::ActiveProvider => self.provider.to_string(),
            SettingKey::ThinkingBudget => self.thinking_budget.to_string(),
            SettingKey::Provider(id, field) => {
                let p = self.provider_settings(id);
                match field {
                    ProviderField::ApiKey => p.api_key.clone(),
                    ProviderField::Model => p.model.clone(),
                    ProviderField::BaseUrl => p.base_url.clone(),
                }
            }
        }
    }

    /// Set a value by key; an empty value clears a provider field
    pub fn set(&mut self, key: SettingKey, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            SettingKey::ActiveProvider => {
                self.provider = value.parse().map_err(HookError::Settings)?;
            }
            SettingKey::ThinkingBudget => {
                self.thinking_budget = value.parse().map_err(|e| {
                    HookError::Settings(format!("invalid thinking_budget '{value}': {e}"))
                })?;
            }
            SettingKey::Provider(id, field) => {
                let p = self.provider_settings_mut(id);
                let slot = match field {
                    ProviderField::ApiKey => &mut p.api_key,
                    ProviderField::Model => &mut p.model,
                    ProviderField::BaseUrl => &mut p.base_url,
                };
                *slot = value.to_string();
            }
        }
        Ok(())
    }
}

/// Mask all but the last four characters of a secret
pub fn redact(secret: &str) -> String {
    let count = secret.chars().count();
    if count == 0 {
        String::new()
    } else if count <= 8 {
        "****".to_string()
    } else {
        let tail: String = secret.chars().skip(count - 4).collect();
        format!("****{tail}")
    }
}
