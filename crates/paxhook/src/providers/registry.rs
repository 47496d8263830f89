//! Fixed table of supported providers
//!
//! Each entry names the wire dialect a provider speaks, where its API lives,
//! and whether it needs a key. Adding a provider means adding a `ProviderId`
//! variant and one row in `PROVIDERS`; a new dialect additionally needs a
//! `ProviderAdapter` implementation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a configurable provider
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    #[default]
    Google,
    Anthropic,
    OpenRouter,
    OpenAi,
    Groq,
    Ollama,
    LmStudio,
    Together,
    Fireworks,
    Mistral,
    Copilot,
    Generic,
}

impl ProviderId {
    pub const ALL: [ProviderId; 12] = [
        ProviderId::Google,
        ProviderId::Anthropic,
        ProviderId::OpenRouter,
        ProviderId::OpenAi,
        ProviderId::Groq,
        ProviderId::Ollama,
        ProviderId::LmStudio,
        ProviderId::Together,
        ProviderId::Fireworks,
        ProviderId::Mistral,
        ProviderId::Copilot,
        ProviderId::Generic,
    ];

    pub fn as_str(self) -> &'static str {
        self.spec().key
    }

    pub fn spec(self) -> &'static ProviderSpec {
        &PROVIDERS[self as usize]
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ProviderId::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = ProviderId::ALL.iter().map(|id| id.as_str()).collect();
                format!("unknown provider '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// Request/response dialect spoken by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// `models/{model}:generateContent`
    Google,
    /// `/messages`
    Anthropic,
    /// `/chat/completions` and `/models`
    OpenAiCompatible,
}

/// Where a provider's API root comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Documented hosted API root
    Hosted(&'static str),
    /// Self-hosted server root supplied by the user, with an optional default
    SelfHosted(Option<&'static str>),
}

/// How a provider authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// A stored key is mandatory; calls are skipped without one
    Required,
    /// A key is sent only when one is stored
    Optional,
    /// Never authenticated
    None,
}

/// One row of the provider table
#[derive(Debug)]
pub struct ProviderSpec {
    pub id: ProviderId,
    /// Settings/CLI identifier
    pub key: &'static str,
    pub display_name: &'static str,
    pub dialect: Dialect,
    pub endpoint: Endpoint,
    pub auth: AuthMode,
    pub default_model: Option<&'static str>,
    /// Extra headers sent with every completion request
    pub extra_headers: &'static [(&'static str, &'static str)],
}

// Indexed by `ProviderId as usize`; keep in declaration order.
static PROVIDERS: [ProviderSpec; 12] = [
    ProviderSpec {
        id: ProviderId::Google,
        key: "google",
        display_name: "Google AI Studio",
        dialect: Dialect::Google,
        endpoint: Endpoint::Hosted("https://generativelanguage.googleapis.com/v1beta"),
        auth: AuthMode::Required,
        default_model: Some("gemini-3-flash-preview"),
        extra_headers: &[],
    },
    ProviderSpec {
        id: ProviderId::Anthropic,
        key: "anthropic",
        display_name: "Anthropic",
        dialect: Dialect::Anthropic,
        endpoint: Endpoint::Hosted("https://api.anthropic.com/v1"),
        auth: AuthMode::Required,
        default_model: Some("claude-sonnet-4-5"),
        extra_headers: &[],
    },
    ProviderSpec {
        id: ProviderId::OpenRouter,
        key: "openrouter",
        display_name: "OpenRouter",
        dialect: Dialect::OpenAiCompatible,
        endpoint: Endpoint::Hosted("https://openrouter.ai/api/v1"),
        auth: AuthMode::Required,
        default_model: Some("google/gemini-2.0-flash-thinking-exp:free"),
        extra_headers: &[
            ("HTTP-Referer", "https://paxhistoria.co"),
            ("X-Title", "paxhook"),
        ],
    },
    ProviderSpec {
        id: ProviderId::OpenAi,
        key: "openai",
        display_name: "OpenAI",
        dialect: Dialect::OpenAiCompatible,
        endpoint: Endpoint::Hosted("https://api.openai.com/v1"),
        auth: AuthMode::Required,
        default_model: Some("gpt-4o-mini"),
        extra_headers: &[],
    },
    ProviderSpec {
        id: ProviderId::Groq,
        key: "groq",
        display_name: "Groq",
        dialect: Dialect::OpenAiCompatible,
        endpoint: Endpoint::Hosted("https://api.groq.com/openai/v1"),
        auth: AuthMode::Required,
        default_model: Some("llama-3.3-70b-versatile"),
        extra_headers: &[],
    },
    ProviderSpec {
        id: ProviderId::Ollama,
        key: "ollama",
        display_name: "Ollama (local)",
        dialect: Dialect::OpenAiCompatible,
        endpoint: Endpoint::SelfHosted(Some("http://localhost:11434")),
        auth: AuthMode::None,
        default_model: Some("llama3.1"),
        extra_headers: &[],
    },
    ProviderSpec {
        id: ProviderId::LmStudio,
        key: "lmstudio",
        display_name: "LM Studio (local)",
        dialect: Dialect::OpenAiCompatible,
        endpoint: Endpoint::SelfHosted(Some("http://localhost:1234")),
        auth: AuthMode::None,
        default_model: Some("local-model"),
        extra_headers: &[],
    },
    ProviderSpec {
        id: ProviderId::Together,
        key: "together",
        display_name: "Together AI",
        dialect: Dialect::OpenAiCompatible,
        endpoint: Endpoint::Hosted("https://api.together.xyz/v1"),
        auth: AuthMode::Required,
        default_model: Some("meta-llama/Llama-3.3-70B-Instruct-Turbo"),
        extra_headers: &[],
    },
    ProviderSpec {
        id: ProviderId::Fireworks,
        key: "fireworks",
        display_name: "Fireworks AI",
        dialect: Dialect::OpenAiCompatible,
        endpoint: Endpoint::Hosted("https://api.fireworks.ai/inference/v1"),
        auth: AuthMode::Required,
        default_model: Some("accounts/fireworks/models/llama-v3p3-70b-instruct"),
        extra_headers: &[],
    },
    ProviderSpec {
        id: ProviderId::Mistral,
        key: "mistral",
        display_name: "Mistral",
        dialect: Dialect::OpenAiCompatible,
        endpoint: Endpoint::Hosted("https://api.mistral.ai/v1"),
        auth: AuthMode::Required,
        default_model: Some("mistral-large-latest"),
        extra_headers: &[],
    },
    ProviderSpec {
        id: ProviderId::Copilot,
        key: "copilot",
        display_name: "Copilot API proxy (local)",
        dialect: Dialect::OpenAiCompatible,
        endpoint: Endpoint::SelfHosted(Some("http://localhost:4141")),
        auth: AuthMode::None,
        default_model: Some("gpt-4.1"),
        extra_headers: &[],
    },
    ProviderSpec {
        id: ProviderId::Generic,
        key: "generic",
        display_name: "Generic OpenAI-compatible",
        dialect: Dialect::OpenAiCompatible,
        endpoint: Endpoint::SelfHosted(None),
        auth: AuthMode::Optional,
        default_model: None,
        extra_headers: &[],
    },
];

impl ProviderSpec {
    pub fn requires_key(&self) -> bool {
        self.auth == AuthMode::Required
    }

    pub fn is_self_hosted(&self) -> bool {
        matches!(self.endpoint, Endpoint::SelfHosted(_))
    }

    /// Resolve the API root, preferring a user-supplied override
    ///
    /// Hosted roots are used verbatim (minus a trailing slash). Self-hosted
    /// roots are normalized to end in `/v1`.
    pub fn resolve_base_url(&self, override_url: Option<&str>) -> Option<String> {
        let override_url = override_url.map(str::trim).filter(|u| !u.is_empty());

        match self.endpoint {
            Endpoint::Hosted(default) => Some(
                override_url
                    .unwrap_or(default)
                    .trim_end_matches('/')
                    .to_string(),
            ),
            Endpoint::SelfHosted(default) => {
                override_url.or(default).map(normalize_self_hosted_url)
            }
        }
    }
}

/// Strip a trailing slash and make sure the root ends in `/v1`
pub fn normalize_self_hosted_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_id() {
        for id in ProviderId::ALL {
            assert_eq!(id.spec().id, id, "row for {id:?} is out of order");
        }
    }

    #[test]
    fn default_provider_is_google() {
        assert_eq!(ProviderId::default(), ProviderId::Google);
        assert_eq!(ProviderId::default().spec().default_model, Some("gemini-3-flash-preview"));
    }

    #[test]
    fn provider_id_round_trips_through_str() {
        for id in ProviderId::ALL {
            assert_eq!(id.as_str().parse::<ProviderId>().unwrap(), id);
        }
        assert_eq!("OpenRouter".parse::<ProviderId>().unwrap(), ProviderId::OpenRouter);
        assert!("bard".parse::<ProviderId>().is_err());
    }

    #[test]
    fn serde_names_match_keys() {
        for id in ProviderId::ALL {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.as_str()));
        }
    }

    #[test]
    fn key_requirement_follows_hosting() {
        for id in [ProviderId::Ollama, ProviderId::LmStudio, ProviderId::Copilot, ProviderId::Generic] {
            assert!(!id.spec().requires_key(), "{id} should not need a key");
        }
        for id in [ProviderId::Google, ProviderId::Anthropic, ProviderId::OpenRouter, ProviderId::Mistral] {
            assert!(id.spec().requires_key(), "{id} should need a key");
        }
    }

    #[test]
    fn self_hosted_urls_get_v1_suffix() {
        assert_eq!(normalize_self_hosted_url("http://localhost:4141/"), "http://localhost:4141/v1");
        assert_eq!(normalize_self_hosted_url("http://localhost:4141/v1/"), "http://localhost:4141/v1");
        assert_eq!(normalize_self_hosted_url("http://box:8080/v1"), "http://box:8080/v1");
    }

    #[test]
    fn resolve_base_url_defaults_and_overrides() {
        let copilot = ProviderId::Copilot.spec();
        assert_eq!(copilot.resolve_base_url(None).as_deref(), Some("http://localhost:4141/v1"));
        assert_eq!(
            copilot.resolve_base_url(Some("http://10.0.0.2:4141")).as_deref(),
            Some("http://10.0.0.2:4141/v1")
        );

        let openrouter = ProviderId::OpenRouter.spec();
        assert_eq!(
            openrouter.resolve_base_url(Some("  ")).as_deref(),
            Some("https://openrouter.ai/api/v1")
        );
        assert_eq!(
            openrouter.resolve_base_url(Some("http://127.0.0.1:9000/")).as_deref(),
            Some("http://127.0.0.1:9000")
        );

        assert_eq!(ProviderId::Generic.spec().resolve_base_url(None), None);
    }
}
