//! Parsing and classification of intercepted chat requests
//!
//! The game posts `{"prompt": ..., "promptStage": ..., "jsonSchema": ...}`. A
//! request carrying a schema outside the `chatWithUser` stage is an action:
//! the game expects a JSON object matching the schema back. Everything else
//! is plain chat.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{HookError, Result};
use crate::providers::CompletionRequest;

/// Stage name the game uses for free-form conversation
pub const CHAT_WITH_USER_STAGE: &str = "chatWithUser";

/// Schema name that identifies the advisor request
pub const ADVISOR_SCHEMA_NAME: &str = "advisorResponse";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Chat,
    Action,
}

/// Opaque JSON schema descriptor as sent by the game
///
/// Usually `{"name": ..., "schema": {...}}`, but any JSON is accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonSchema(Value);

impl JsonSchema {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    /// The inner `schema` object, if present
    pub fn body(&self) -> Option<&Value> {
        self.0.get("schema").filter(|s| s.is_object())
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn is_advisor(&self) -> bool {
        self.name() == Some(ADVISOR_SCHEMA_NAME)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRequest {
    #[serde(default)]
    prompt: Option<Value>,
    #[serde(default)]
    prompt_stage: Option<Value>,
    #[serde(default)]
    json_schema: Option<Value>,
}

/// A classified chat request
#[derive(Debug, Clone, PartialEq)]
pub struct InterceptedRequest {
    pub prompt: String,
    pub mode: Mode,
    pub schema: Option<JsonSchema>,
}

impl InterceptedRequest {
    /// Parse and classify a request body
    ///
    /// An empty body is a chat request with an empty prompt. A body that is
    /// not a JSON object fails with [`HookError::Parse`].
    pub fn parse(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self {
                prompt: String::new(),
                mode: Mode::Chat,
                schema: None,
            });
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|e| HookError::Parse(format!("chat request body is not valid JSON: {e}")))?;
        if !value.is_object() {
            return Err(HookError::Parse(
                "chat request body is not a JSON object".to_string(),
            ));
        }
        let raw: RawRequest = serde_json::from_value(value)
            .map_err(|e| HookError::Parse(format!("unexpected chat request shape: {e}")))?;

        let prompt = match raw.prompt {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
        };

        let schema = raw
            .json_schema
            .filter(|s| !s.is_null())
            .map(JsonSchema::new);

        let is_chat_stage =
            raw.prompt_stage.as_ref().and_then(Value::as_str) == Some(CHAT_WITH_USER_STAGE);
        let mode = if schema.is_some() && !is_chat_stage {
            Mode::Action
        } else {
            Mode::Chat
        };

        Ok(Self {
            prompt,
            mode,
            schema,
        })
    }

    /// Action request for the advisor schema
    pub fn is_advisor(&self) -> bool {
        self.mode == Mode::Action && self.schema.as_ref().is_some_and(JsonSchema::is_advisor)
    }

    /// Outbound prompt text
    ///
    /// Non-advisor actions get the schema appended with a JSON-only
    /// instruction. Chat and advisor prompts are sent unchanged.
    pub fn prepared_prompt(&self) -> String {
        match (&self.mode, &self.schema) {
            (Mode::Action, Some(schema)) if !self.is_advisor() => format!(
                "{}\n\nTASK: Generate a valid JSON object matching this schema.\nSCHEMA: {}\n\nIMPORTANT: Return ONLY the JSON object. No markdown.",
                self.prompt,
                schema.as_value()
            ),
            _ => self.prompt.clone(),
        }
    }

    /// Build the adapter-facing request around an already prepared prompt
    pub fn completion<'a>(&'a self, prompt: &'a str) -> CompletionRequest<'a> {
        CompletionRequest {
            prompt,
            advisor: self.is_advisor(),
            schema: self.schema.as_ref(),
        }
    }
}
