//! Local status endpoints for the CLI and browser tooling
//!
//! Shared response types for `/_paxhook/*`.

pub mod handlers;

use serde::{Deserialize, Serialize};

use crate::providers::{AuthMode, Dialect, ProviderId};
use crate::settings::Settings;

/// One row of `/_paxhook/providers`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderSummary {
    pub id: ProviderId,
    pub name: String,
    pub dialect: String,
    pub requires_key: bool,
    pub has_key: bool,
    /// Effective API root, if one can be determined
    pub base_url: Option<String>,
    /// Effective model, if one can be determined
    pub model: Option<String>,
    pub active: bool,
}

impl ProviderSummary {
    /// Summaries for every provider as seen through `settings`
    pub fn all(settings: &Settings) -> Vec<Self> {
        ProviderId::ALL
            .into_iter()
            .map(|id| Self::from_settings(settings, id))
            .collect()
    }

    pub fn from_settings(settings: &Settings, id: ProviderId) -> Self {
        let spec = id.spec();
        let stored = settings.provider_settings(id);
        let model = Some(stored.model.trim())
            .filter(|m| !m.is_empty())
            .or(spec.default_model)
            .map(str::to_string);

        Self {
            id,
            name: spec.display_name.to_string(),
            dialect: dialect_name(spec.dialect).to_string(),
            requires_key: spec.requires_key(),
            has_key: spec.auth != AuthMode::None && !stored.api_key.trim().is_empty(),
            base_url: spec.resolve_base_url(Some(stored.base_url.as_str())),
            model,
            active: settings.provider == id,
        }
    }
}

fn dialect_name(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Google => "google",
        Dialect::Anthropic => "anthropic",
        Dialect::OpenAiCompatible => "openai",
    }
}

/// Body of `/_paxhook/models`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelsResponse {
    pub provider: ProviderId,
    pub online: bool,
    pub models: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summaries_reflect_settings() {
        let mut settings = Settings::default();
        settings.provider = ProviderId::Copilot;
        settings.copilot.base_url = "http://10.0.0.5:4141".to_string();
        settings.google.api_key = "AIza".to_string();

        let all = ProviderSummary::all(&settings);
        assert_eq!(all.len(), ProviderId::ALL.len());

        let copilot = all.iter().find(|s| s.id == ProviderId::Copilot).unwrap();
        assert!(copilot.active);
        assert!(!copilot.requires_key);
        assert_eq!(copilot.base_url.as_deref(), Some("http://10.0.0.5:4141/v1"));
        assert_eq!(copilot.model.as_deref(), Some("gpt-4.1"));

        let google = all.iter().find(|s| s.id == ProviderId::Google).unwrap();
        assert!(google.has_key);
        assert!(!google.active);
        assert_eq!(google.dialect, "google");

        let generic = all.iter().find(|s| s.id == ProviderId::Generic).unwrap();
        assert_eq!(generic.base_url, None);
        assert_eq!(generic.model, None);
    }
}
