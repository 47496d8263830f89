//! OpenAI-compatible chat completions dialect
//!
//! Shared by every hosted and self-hosted provider that exposes
//! `/chat/completions` and `/models`.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap};
use serde_json::{Value, json};
use tracing::debug;

use super::{
    CompletionRequest, Connection, Dialect, ProviderAdapter, ProviderError, extra_headers,
    parse_model_ids, secret_header, send_json,
};

#[derive(Debug, Clone)]
pub struct OpenAiCompatAdapter {
    client: Client,
}

impl OpenAiCompatAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn build_payload(request: &CompletionRequest<'_>, model: &str) -> Value {
        let mut payload = json!({
            "model": model,
            "messages": [{ "role": "user", "content": request.prompt }],
        });

        if request.structured_schema().is_some() {
            if let Some(schema) = request.schema {
                payload["response_format"] = json!({
                    "type": "json_schema",
                    "json_schema": schema.as_value(),
                });
            }
        }

        payload
    }

    pub fn extract_text(response: &Value) -> String {
        response
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::OpenAiCompatible
    }

    fn auth_headers(&self, conn: &Connection) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = conn
            .api_key
            .as_deref()
            .and_then(|key| secret_header(&format!("Bearer {key}")))
        {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    async fn complete(
        &self,
        request: &CompletionRequest<'_>,
        conn: &Connection,
    ) -> Result<String, ProviderError> {
        debug!(
            provider = %conn.provider,
            model = %conn.model,
            advisor = request.advisor,
            "Calling chat completions"
        );

        let mut headers = self.auth_headers(conn);
        headers.extend(extra_headers(conn.provider));

        let payload = Self::build_payload(request, &conn.model);
        let response = send_json(
            conn.provider,
            self.client
                .post(format!("{}/chat/completions", conn.base_url))
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
    use crate::providers::ProviderId;

    fn conn(api_key: Option<&str>) -> Connection {
        Connection {
            provider: ProviderId::Generic,
            base_url: "http://localhost:8000/v1".to_string(),
            api_key: api_key.map(str::to_string),
            model: "m".to_string(),
            thinking_budget: 0,
        }
    }

    #[test]
    fn plain_payload_has_no_response_format() {
        let request = CompletionRequest {
            prompt: "Hi",
            advisor: false,
            schema: None,
        };
        let payload = OpenAiCompatAdapter::build_payload(&request, "gpt-4.1");
        assert_eq!(payload, json!({"model": "gpt-4.1", "messages": [{"role": "user", "content": "Hi"}]}));
    }

    #[test]
    fn advisor_payload_passes_descriptor() {
        let descriptor = json!({"name": "advisorResponse", "schema": {"type": "object"}});
        let schema = JsonSchema::new(descriptor.clone());
        let request = CompletionRequest {
            prompt: "Advise",
            advisor: true,
            schema: Some(&schema),
        };
        let payload = OpenAiCompatAdapter::build_payload(&request, "m");
        assert_eq!(payload["response_format"]["type"], "json_schema");
        assert_eq!(payload["response_format"]["json_schema"], descriptor);
    }

    #[test]
    fn bearer_only_with_key() {
        let adapter = OpenAiCompatAdapter::new(Client::new());
        assert!(adapter.auth_headers(&conn(None)).is_empty());

        let headers = adapter.auth_headers(&conn(Some("sk-test")));
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer sk-test");
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[test]
    fn extract_first_choice() {
        let response = json!({"choices": [{"message": {"role": "assistant", "content": "Hello"}}]});
        assert_eq!(OpenAiCompatAdapter::extract_text(&response), "Hello");
        assert_eq!(OpenAiCompatAdapter::extract_text(&json!({"choices": []})), "");
    }
}
