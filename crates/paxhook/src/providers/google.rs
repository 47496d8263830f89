//! Google Gemini `generateContent` dialect

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{
    CompletionRequest, Connection, Dialect, ProviderAdapter, ProviderError, send_json,
};
use crate::schema::to_google_schema;

pub const GOOGLE_TEMPERATURE: f64 = 0.7;

#[derive(Debug, Clone)]
pub struct GoogleAdapter {
    client: Client,
}

impl GoogleAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Request body for `generateContent`
    pub fn build_payload(request: &CompletionRequest<'_>, thinking_budget: i32) -> Value {
        let mut generation_config = json!({
            "temperature": GOOGLE_TEMPERATURE,
            "thinkingConfig": {
                "includeThoughts": true,
                "thinkingBudget": thinking_budget,
            },
        });

        if request.advisor {
            generation_config["responseMimeType"] = json!("application/json");
            if let Some(schema) = request.structured_schema() {
                generation_config["responseSchema"] = to_google_schema(schema);
            }
        }

        json!({
            "contents": [{ "parts": [{ "text": request.prompt }] }],
            "generationConfig": generation_config,
        })
    }

    /// Text of the last non-empty part of the first candidate
    ///
    /// With thoughts included, earlier parts hold the reasoning.
    pub fn extract_text(response: &Value) -> Option<String> {
        response
            .pointer("/candidates/0/content/parts")?
            .as_array()?
            .iter()
            .rev()
            .find_map(|part| part.get("text").and_then(Value::as_str).filter(|t| !t.is_empty()))
            .map(str::to_string)
    }

    fn model_path(model: &str) -> &str {
        model.strip_prefix("models/").unwrap_or(model)
    }

    fn key_query(conn: &Connection) -> Vec<(&'static str, String)> {
        conn.api_key
            .iter()
            .map(|key| ("key", key.clone()))
            .collect()
    }
}

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Google
    }

    /// Gemini takes the key as a query parameter
    fn auth_headers(&self, _conn: &Connection) -> HeaderMap {
        HeaderMap::new()
    }

    async fn complete(
        &self,
        request: &CompletionRequest<'_>,
        conn: &Connection,
    ) -> Result<String, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent",
            conn.base_url,
            Self::model_path(&conn.model)
        );
        debug!(model = %conn.model, advisor = request.advisor, "Calling Gemini generateContent");

        let payload = Self::build_payload(request, conn.thinking_budget);
        let response = send_json(
            conn.provider,
            self.client
                .post(&url)
                .query(&Self::key_query(conn))
                .headers(self.auth_headers(conn))
                .json(&payload),
        )
        .await?;

        Ok(Self::extract_text(&response).unwrap_or_else(|| {
            warn!("Gemini response had no text part");
            String::new()
        }))
    }

    async fn list_models(&self, conn: &Connection) -> Result<Vec<String>, ProviderError> {
        let body = send_json(
            conn.provider,
            self.client
                .get(format!("{}/models", conn.base_url))
                .query(&Self::key_query(conn)),
        )
        .await?;

        let models = body
            .get("models")
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::decode(conn.provider, "model list missing 'models'"))?;

        let mut names: Vec<String> = Vec::new();
        for name in models.iter().filter_map(|m| m.get("name").and_then(Value::as_str)) {
            let name = Self::model_path(name);
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::JsonSchema;

    #[test]
    fn payload_has_thinking_config() {
        let request = CompletionRequest {
            prompt: "Hello",
            advisor: false,
            schema: None,
        };
        let payload = GoogleAdapter::build_payload(&request, 2048);

        assert_eq!(payload["contents"][0]["parts"][0]["text"], "Hello");
        assert_eq!(payload["generationConfig"]["temperature"], 0.7);
        assert_eq!(payload["generationConfig"]["thinkingConfig"]["includeThoughts"], true);
        assert_eq!(payload["generationConfig"]["thinkingConfig"]["thinkingBudget"], 2048);
        assert!(payload["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn advisor_payload_requests_json() {
        let schema = JsonSchema::new(json!({
            "name": "advisorResponse",
            "schema": {"type": "object", "additionalProperties": false,
                       "properties": {"advice": {"type": ["string", "null"]}}}
        }));
        let request = CompletionRequest {
            prompt: "Advise",
            advisor: true,
            schema: Some(&schema),
        };
        let config = &GoogleAdapter::build_payload(&request, 4096)["generationConfig"];

        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(
            config["responseSchema"],
            json!({"type": "object", "properties": {"advice": {"type": "string", "nullable": true}}})
        );
    }

    #[test]
    fn extract_text_skips_thoughts() {
        let response = json!({
            "candidates": [{"content": {"parts": [
                {"text": "thinking about it", "thought": true},
                {"text": "final answer"},
                {"text": ""}
            ]}}]
        });
        assert_eq!(GoogleAdapter::extract_text(&response).as_deref(), Some("final answer"));
    }

    #[test]
    fn extract_text_handles_missing_candidates() {
        assert_eq!(GoogleAdapter::extract_text(&json!({"candidates": []})), None);
        assert_eq!(GoogleAdapter::extract_text(&json!({})), None);
    }

    #[test]
    fn model_prefix_is_stripped() {
        assert_eq!(GoogleAdapter::model_path("models/gemini-2.5-pro"), "gemini-2.5-pro");
        assert_eq!(GoogleAdapter::model_path("gemini-2.5-pro"), "gemini-2.5-pro");
    }
}
