//! Anthropic Messages dialect

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{Value, json};
use tracing::debug;

use super::{
    CompletionRequest, Connection, Dialect, ProviderAdapter, ProviderError, parse_model_ids,
    secret_header, send_json,
};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const ANTHROPIC_MAX_TOKENS: u32 = 8192;

/// Beta flag that enables `output_format`
const STRUCTURED_OUTPUTS_BETA: &str = "structured-outputs-2025-11-13";

#[derive(Debug, Clone)]
pub struct AnthropicAdapter {
    client: Client,
}

impl AnthropicAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn build_payload(request: &CompletionRequest<'_>, model: &str) -> Value {
        let mut payload = json!({
            "model": model,
            "max_tokens": ANTHROPIC_MAX_TOKENS,
            "messages": [{ "role": "user", "content": request.prompt }],
        });

        if let Some(schema) = request.structured_schema() {
            payload["output_format"] = json!({
                "type": "json_schema",
                "schema": schema,
            });
        }

        payload
    }

    /// Concatenated text blocks
    pub fn extract_text(response: &Value) -> String {
        response
            .get("content")
            .and_then(Value::as_array)
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                    .filter_map(|b| b.get("text").and_then(Value::as_str))
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Anthropic
    }

    fn auth_headers(&self, conn: &Connection) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = conn.api_key.as_deref().and_then(secret_header) {
            headers.insert("x-api-key", value);
        }
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers
    }

    async fn complete(
        &self,
        request: &CompletionRequest<'_>,
        conn: &Connection,
    ) -> Result<String, ProviderError> {
        debug!(model = %conn.model, advisor = request.advisor, "Calling Anthropic messages");

        let mut headers = self.auth_headers(conn);
        if request.structured_schema().is_some() {
            headers.insert("anthropic-beta", HeaderValue::from_static(STRUCTURED_OUTPUTS_BETA));
        }

        let payload = Self::build_payload(request, &conn.model);
        let response = send_json(
            conn.provider,
            self.client
                .post(format!("{}/messages", conn.base_url))
                .headers(headers)
                .json(&payload),
        )
        .await?;

        Ok(Self::extract_text(&response))
    }

    async fn list_models(&self, conn: &Connection) -> Result<Vec<String>, ProviderError> {
        let body = send_json(
            conn.provider,
            self.client
                .get(format!("{}/models", conn.base_url))
                .headers(self.auth_headers(conn)),
        )
        .await?;
        Ok(parse_model_ids(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::JsonSchema;

    #[test]
    fn plain_payload() {
        let request = CompletionRequest {
            prompt: "Hello",
            advisor: false,
            schema: None,
        };
        let payload = AnthropicAdapter::build_payload(&request, "claude-sonnet-4-5");
        assert_eq!(payload["model"], "claude-sonnet-4-5");
        assert_eq!(payload["max_tokens"], 8192);
        assert_eq!(payload["messages"][0]["role"], "user");
        assert_eq!(payload["messages"][0]["content"], "Hello");
        assert!(payload.get("output_format").is_none());
    }

    #[test]
    fn advisor_payload_uses_raw_schema() {
        let schema = JsonSchema::new(json!({
            "name": "advisorResponse",
            "schema": {"type": "object", "additionalProperties": false}
        }));
        let request = CompletionRequest {
            prompt: "Advise",
            advisor: true,
            schema: Some(&schema),
        };
        let payload = AnthropicAdapter::build_payload(&request, "m");
        assert_eq!(
            payload["output_format"],
            json!({"type": "json_schema", "schema": {"type": "object", "additionalProperties": false}})
        );
    }

    #[test]
    fn extract_joins_text_blocks() {
        let response = json!({"content": [
            {"type": "thinking", "thinking": "hmm"},
            {"type": "text", "text": "Hello, "},
            {"type": "text", "text": "world"}
        ]});
        assert_eq!(AnthropicAdapter::extract_text(&response), "Hello, world");
        assert_eq!(AnthropicAdapter::extract_text(&json!({})), "");
    }
}
