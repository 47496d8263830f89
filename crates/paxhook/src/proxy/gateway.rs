//! Interception pipeline for the game's chat endpoint
//!
//! settings → credential check → classify → prompt → provider (with retry)
//! → normalize. Any failure along the way resolves to
//! [`PassthroughDecision::Forward`].

use std::sync::Arc;
use tracing::{Instrument, field, info, info_span};
use uuid::Uuid;

use super::error::{PassthroughDecision, handle_intercept_error};
use crate::classify::InterceptedRequest;
use crate::error::Result;
use crate::normalize::normalize_response;
use crate::providers::{Connection, ConnectionStatus, ProviderId, ProviderRegistry};
use crate::retry::RetryPolicy;
use crate::settings::SettingsStore;

pub struct Gateway {
    settings: Arc<dyn SettingsStore>,
    registry: ProviderRegistry,
    retry: RetryPolicy,
    chat_path: String,
}

impl Gateway {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        registry: ProviderRegistry,
        retry: RetryPolicy,
        chat_path: impl Into<String>,
    ) -> Self {
        Self {
            settings,
            registry,
            retry,
            chat_path: chat_path.into(),
        }
    }

    pub fn settings(&self) -> &Arc<dyn SettingsStore> {
        &self.settings
    }

    /// Whether a request URL targets the game's chat endpoint
    pub fn matches(&self, url: &str) -> bool {
        !self.chat_path.is_empty() && url.contains(&self.chat_path)
    }

    /// Decide how to answer a request bound for `url`
    ///
    /// Requests that are not for the chat endpoint are always forwarded.
    pub async fn decide(&self, url: &str, body: &[u8]) -> PassthroughDecision {
        if !self.matches(url) {
            return PassthroughDecision::Forward;
        }

        let span = info_span!(
            "intercept",
            request_id = %Uuid::new_v4(),
            provider = field::Empty,
            mode = field::Empty,
        );

        async {
            match self.intercept(body).await {
                Ok(response) => PassthroughDecision::Respond(response),
                Err(e) => handle_intercept_error(&e),
            }
        }
        .instrument(span)
        .await
    }

    /// Run the pipeline and return the normalized response body
    pub async fn intercept(&self, body: &[u8]) -> Result<String> {
        let settings = self.settings.load().await?;
        let provider = settings.provider;
        tracing::Span::current().record("provider", field::display(provider));

        let conn = Connection::resolve(&settings, provider)?;

        let request = InterceptedRequest::parse(body)?;
        tracing::Span::current().record("mode", field::debug(request.mode));
        info!(
            model = %conn.model,
            advisor = request.is_advisor(),
            prompt_chars = request.prompt.chars().count(),
            "Intercepted chat request"
        );

        let prompt = request.prepared_prompt();
        let completion = request.completion(&prompt);
        let adapter = self.registry.adapter(provider);

        let raw = self
            .retry
            .run(|| adapter.complete(&completion, &conn))
            .await?;

        info!(response_chars = raw.chars().count(), "Provider answered");
        Ok(normalize_response(&raw, request.mode))
    }

    /// Probe a provider's model list using current settings
    ///
    /// `provider` defaults to the active one; `base_url` overrides the stored
    /// value for this probe only. Resolution failures become an offline
    /// status rather than an error.
    pub async fn probe(
        &self,
        provider: Option<ProviderId>,
        base_url: Option<&str>,
    ) -> Result<(ProviderId, ConnectionStatus)> {
        let mut settings = self.settings.load().await?;
        let provider = provider.unwrap_or(settings.provider);

        if let Some(url) = base_url.map(str::trim).filter(|u| !u.is_empty()) {
            settings.provider_settings_mut(provider).base_url = url.to_string();
        }

        let status = match Connection::resolve_for_probe(&settings, provider) {
            Ok(conn) => self.registry.adapter(provider).test_connection(&conn).await,
            Err(e) => ConnectionStatus::offline(e.to_string()),
        };

        Ok((provider, status))
    }
}
