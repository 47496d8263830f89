//! LLM provider adapters
//!
//! Every provider speaks one of three dialects. An adapter translates an
//! intercepted request into that dialect, performs a single attempt, and
//! pulls the generated text back out. Retry lives one level up in
//! [`crate::retry`].

mod anthropic;
mod google;
mod openai;
mod registry;

pub use anthropic::{ANTHROPIC_MAX_TOKENS, ANTHROPIC_VERSION, AnthropicAdapter};
pub use google::{GOOGLE_TEMPERATURE, GoogleAdapter};
pub use openai::OpenAiCompatAdapter;
pub use registry::{
    AuthMode, Dialect, Endpoint, ProviderId, ProviderSpec, normalize_self_hosted_url,
};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::classify::JsonSchema;
use crate::error::{HookError, Result};
use crate::settings::{Settings, redact};

/// Longest upstream error body kept in a [`ProviderError`]
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Failure of a single provider attempt
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Provider answered with a non-2xx status
    #[error("{provider} returned HTTP {status}: {body}")]
    Upstream {
        provider: ProviderId,
        status: u16,
        body: String,
    },

    /// No usable HTTP response (connect failure, reset, timeout)
    #[error("{provider} request failed: {message}")]
    Transport { provider: ProviderId, message: String },

    /// 2xx response whose body could not be read as the dialect's JSON
    #[error("{provider} sent an unreadable response: {message}")]
    Decode { provider: ProviderId, message: String },
}

impl ProviderError {
    pub fn provider(&self) -> ProviderId {
        match self {
            ProviderError::Upstream { provider, .. }
            | ProviderError::Transport { provider, .. }
            | ProviderError::Decode { provider, .. } => *provider,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Rate limits, server errors and network failures are worth another try
    pub fn is_retryable(&self) -> bool {
        match self.status() {
            Some(status) => status == 429 || (500..600).contains(&status),
            None => {
                matches!(self, ProviderError::Transport { .. })
                    || looks_like_network_failure(&self.to_string())
            }
        }
    }

    /// Short human-readable reason, used in model probe results
    pub fn summary(&self) -> String {
        match self {
            ProviderError::Upstream { status, body, .. } if body.trim().is_empty() => {
                format!("HTTP {status}")
            }
            ProviderError::Upstream { body, .. } => body.clone(),
            ProviderError::Transport { message, .. } | ProviderError::Decode { message, .. } => {
                message.clone()
            }
        }
    }

    /// Classify a reqwest failure; the URL is dropped since it may carry a key
    pub(crate) fn from_reqwest(provider: ProviderId, err: reqwest::Error) -> Self {
        let is_decode = err.is_decode();
        let message = err.without_url().to_string();
        if is_decode {
            ProviderError::Decode { provider, message }
        } else {
            ProviderError::Transport { provider, message }
        }
    }

    pub(crate) fn decode(provider: ProviderId, message: impl Into<String>) -> Self {
        ProviderError::Decode {
            provider,
            message: message.into(),
        }
    }
}

fn looks_like_network_failure(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["timed out", "timeout", "connection", "network", "dns", "reset"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Everything needed to call one provider, resolved from [`Settings`]
#[derive(Clone)]
pub struct Connection {
    pub provider: ProviderId,
    /// API root without a trailing slash
    pub base_url: String,
    /// Present only when the provider authenticates and a key is stored
    pub api_key: Option<String>,
    pub model: String,
    pub thinking_budget: i32,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_deref().map(redact))
            .field("model", &self.model)
            .field("thinking_budget", &self.thinking_budget)
            .finish()
    }
}

impl Connection {
    /// Resolve a provider's connection from the current settings
    ///
    /// Fails with [`HookError::MissingCredential`] when the provider needs a
    /// key and none is stored, and with [`HookError::Config`] when no base URL
    /// or model can be determined.
    pub fn resolve(settings: &Settings, provider: ProviderId) -> Result<Self> {
        Self::resolve_inner(settings, provider, true)
    }

    /// Like [`Connection::resolve`], but an unknown model is left empty
    ///
    /// Listing models does not need one.
    pub fn resolve_for_probe(settings: &Settings, provider: ProviderId) -> Result<Self> {
        Self::resolve_inner(settings, provider, false)
    }

    fn resolve_inner(settings: &Settings, provider: ProviderId, require_model: bool) -> Result<Self> {
        let spec = provider.spec();
        let stored = settings.provider_settings(provider);

        let key = Some(stored.api_key.trim()).filter(|k| !k.is_empty());
        let api_key = match spec.auth {
            AuthMode::Required => Some(
                key.ok_or(HookError::MissingCredential(provider))?
                    .to_string(),
            ),
            AuthMode::Optional => key.map(str::to_string),
            AuthMode::None => None,
        };

        let base_url = spec
            .resolve_base_url(Some(stored.base_url.as_str()))
            .ok_or_else(|| {
                HookError::Config(format!("{provider} needs a base_url before it can be used"))
            })?;

        let model = match Some(stored.model.trim())
            .filter(|m| !m.is_empty())
            .or(spec.default_model)
        {
            Some(model) => model.to_string(),
            None if !require_model => String::new(),
            None => {
                return Err(HookError::Config(format!(
                    "{provider} needs a model before it can be used"
                )));
            }
        };

        Ok(Self {
            provider,
            base_url,
            api_key,
            model,
            thinking_budget: settings.thinking_budget,
        })
    }
}

/// One outbound completion, already prompt-assembled
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub prompt: &'a str,
    /// Action request whose schema is the advisor schema
    pub advisor: bool,
    pub schema: Option<&'a JsonSchema>,
}

impl<'a> CompletionRequest<'a> {
    /// Schema body to request native structured output with, advisor only
    pub fn structured_schema(&self) -> Option<&'a Value> {
        if self.advisor {
            self.schema.and_then(JsonSchema::body)
        } else {
            None
        }
    }
}

/// Result of probing a provider's model list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub online: bool,
    pub models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionStatus {
    pub fn offline(error: impl Into<String>) -> Self {
        Self {
            online: false,
            models: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// One wire dialect
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Authentication headers for this connection (may be empty)
    fn auth_headers(&self, conn: &Connection) -> HeaderMap;

    /// Make one completion attempt and return the generated text
    async fn complete(
        &self,
        request: &CompletionRequest<'_>,
        conn: &Connection,
    ) -> std::result::Result<String, ProviderError>;

    /// Fetch the provider's model identifiers
    async fn list_models(&self, conn: &Connection)
    -> std::result::Result<Vec<String>, ProviderError>;

    async fn test_connection(&self, conn: &Connection) -> ConnectionStatus {
        match self.list_models(conn).await {
            Ok(models) => ConnectionStatus {
                online: true,
                models,
                error: None,
            },
            Err(e) => ConnectionStatus::offline(e.summary()),
        }
    }
}

/// Adapters keyed by dialect, looked up through the provider table
#[derive(Clone)]
pub struct ProviderRegistry {
    google: Arc<dyn ProviderAdapter>,
    anthropic: Arc<dyn ProviderAdapter>,
    openai: Arc<dyn ProviderAdapter>,
}

impl ProviderRegistry {
    /// Build all adapters around one shared HTTP client
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            google: Arc::new(GoogleAdapter::new(client.clone())),
            anthropic: Arc::new(AnthropicAdapter::new(client.clone())),
            openai: Arc::new(OpenAiCompatAdapter::new(client)),
        }
    }

    pub fn adapter(&self, provider: ProviderId) -> Arc<dyn ProviderAdapter> {
        match provider.spec().dialect {
            Dialect::Google => self.google.clone(),
            Dialect::Anthropic => self.anthropic.clone(),
            Dialect::OpenAiCompatible => self.openai.clone(),
        }
    }
}

/// Send a request and decode a 2xx JSON body
pub(crate) async fn send_json(
    provider: ProviderId,
    request: reqwest::RequestBuilder,
) -> std::result::Result<Value, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Upstream {
            provider,
            status: status.as_u16(),
            body: truncate_chars(body.trim(), MAX_ERROR_BODY_CHARS),
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, e))
}

/// Static headers from the provider table (e.g. OpenRouter attribution)
pub(crate) fn extra_headers(provider: ProviderId) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for &(name, value) in provider.spec().extra_headers {
        if let Ok(name) = HeaderName::from_bytes(name.as_bytes()) {
            headers.insert(name, HeaderValue::from_static(value));
        }
    }
    headers
}

/// Header value for a secret, marked sensitive so it never appears in logs
pub(crate) fn secret_header(value: &str) -> Option<HeaderValue> {
    match HeaderValue::from_str(value) {
        Ok(mut header) => {
            header.set_sensitive(true);
            Some(header)
        }
        Err(_) => {
            tracing::warn!("Stored API key contains characters not allowed in a header");
            None
        }
    }
}

/// Model ids from `{"data": [{"id": ...}]}` or a bare `[{"id": ...}]`, deduplicated
pub(crate) fn parse_model_ids(body: &Value) -> Vec<String> {
    let entries = body
        .get("data")
        .and_then(Value::as_array)
        .or_else(|| body.as_array());

    let mut models: Vec<String> = Vec::new();
    for entry in entries.into_iter().flatten() {
        let id = entry
            .get("id")
            .and_then(Value::as_str)
            .or_else(|| entry.as_str());
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            if !models.iter().any(|m| m == id) {
                models.push(id.to_string());
            }
        }
    }
    models
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn upstream(status: u16) -> ProviderError {
        ProviderError::Upstream {
            provider: ProviderId::Google,
            status,
            body: String::new(),
        }
    }

    #[test]
    fn retryable_statuses() {
        assert!(upstream(429).is_retryable());
        assert!(upstream(500).is_retryable());
        assert!(upstream(503).is_retryable());
        assert!(!upstream(400).is_retryable());
        assert!(!upstream(401).is_retryable());
        assert!(!upstream(404).is_retryable());
    }

    #[test]
    fn transport_errors_are_retryable() {
        let err = ProviderError::Transport {
            provider: ProviderId::Groq,
            message: "error sending request".to_string(),
        };
        assert!(err.is_retryable());

        let decode = ProviderError::decode(ProviderId::Groq, "expected value at line 1");
        assert!(!decode.is_retryable());

        let timed_out = ProviderError::decode(ProviderId::Groq, "operation timed out");
        assert!(timed_out.is_retryable());
    }

    #[test]
    fn summary_prefers_body() {
        assert_eq!(upstream(401).summary(), "HTTP 401");
        let err = ProviderError::Upstream {
            provider: ProviderId::Copilot,
            status: 401,
            body: "bad token".to_string(),
        };
        assert_eq!(err.summary(), "bad token");
    }

    #[test]
    fn resolve_requires_key_for_hosted() {
        let settings = Settings::default();
        let err = Connection::resolve(&settings, ProviderId::Google).unwrap_err();
        assert!(matches!(err, HookError::MissingCredential(ProviderId::Google)));
    }

    #[test]
    fn resolve_uses_defaults() {
        let mut settings = Settings::default();
        settings.google.api_key = "  AIza-key ".to_string();
        let conn = Connection::resolve(&settings, ProviderId::Google).unwrap();
        assert_eq!(conn.api_key.as_deref(), Some("AIza-key"));
        assert_eq!(conn.model, "gemini-3-flash-preview");
        assert_eq!(conn.base_url, "https://generativelanguage.googleapis.com/v1beta");
        assert_eq!(conn.thinking_budget, 4096);
    }

    #[test]
    fn resolve_self_hosted_without_key() {
        let mut settings = Settings::default();
        settings.copilot.api_key = "ignored".to_string();
        let conn = Connection::resolve(&settings, ProviderId::Copilot).unwrap();
        assert_eq!(conn.api_key, None);
        assert_eq!(conn.base_url, "http://localhost:4141/v1");
        assert_eq!(conn.model, "gpt-4.1");
    }

    #[test]
    fn resolve_generic_needs_url_and_model() {
        let mut settings = Settings::default();
        assert!(matches!(
            Connection::resolve(&settings, ProviderId::Generic),
            Err(HookError::Config(_))
        ));

        settings.generic.base_url = "http://gpu-box:8000".to_string();
        assert!(matches!(
            Connection::resolve(&settings, ProviderId::Generic),
            Err(HookError::Config(_))
        ));

        let probe = Connection::resolve_for_probe(&settings, ProviderId::Generic).unwrap();
        assert_eq!(probe.model, "");

        settings.generic.model = "qwen2.5".to_string();
        let conn = Connection::resolve(&settings, ProviderId::Generic).unwrap();
        assert_eq!(conn.base_url, "http://gpu-box:8000/v1");
        assert_eq!(conn.api_key, None);

        settings.generic.api_key = "secret".to_string();
        let conn = Connection::resolve(&settings, ProviderId::Generic).unwrap();
        assert_eq!(conn.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn connection_debug_hides_key() {
        let mut settings = Settings::default();
        settings.openai.api_key = "sk-proj-abcdefghijkl".to_string();
        let conn = Connection::resolve(&settings, ProviderId::OpenAi).unwrap();
        assert!(!format!("{conn:?}").contains("sk-proj-abcdefghijkl"));
    }

    #[test]
    fn model_ids_from_either_shape() {
        let wrapped = serde_json::json!({"data": [{"id": "gpt-4.1"}, {"id": "gpt-4.1"}, {"id": "o3"}]});
        assert_eq!(parse_model_ids(&wrapped), vec!["gpt-4.1", "o3"]);

        let bare = serde_json::json!([{"id": "claude-sonnet-4"}, {"name": "no-id"}]);
        assert_eq!(parse_model_ids(&bare), vec!["claude-sonnet-4"]);

        assert!(parse_model_ids(&serde_json::json!({"object": "list"})).is_empty());
    }

    #[test]
    fn openrouter_gets_attribution_headers() {
        let headers = extra_headers(ProviderId::OpenRouter);
        assert_eq!(headers.get("http-referer").unwrap(), "https://paxhistoria.co");
        assert_eq!(headers.get("x-title").unwrap(), "paxhook");
        assert!(extra_headers(ProviderId::Groq).is_empty());
    }

    #[test]
    fn truncates_long_bodies() {
        let long = "x".repeat(600);
        let out = truncate_chars(&long, MAX_ERROR_BODY_CHARS);
        assert_eq!(out.len(), MAX_ERROR_BODY_CHARS + 3);
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
