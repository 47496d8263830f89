//! Fail-open error handling for intercepted requests
//!
//! Nothing that goes wrong inside interception may break the game. Every
//! failure is logged and the original request is forwarded to the game's
//! own backend unchanged:
//! - Missing credential: warn, forward
//! - Unparseable body: forward
//! - Provider failure after retries: forward
//!
//! Only errors of the passthrough relay itself turn into a response, as
//! 502 Bad Gateway.

use axum::{
    body::Body,
    http::{Response, StatusCode},
    response::IntoResponse,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::error::HookError;

/// Errors of the HTTP relay
#[derive(Error, Debug, Clone)]
pub enum ProxyError {
    /// Request could not be read or rebuilt
    #[error("Request error: {0}")]
    Request(String),

    /// Upstream could not be reached or its response not read
    #[error("Network error: {0}")]
    Network(String),
}

impl ProxyError {
    pub fn category(&self) -> &'static str {
        match self {
            ProxyError::Request(_) => "request",
            ProxyError::Network(_) => "network",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response<Body> {
        error_response(StatusCode::BAD_GATEWAY, "proxy_error", &self.to_string())
    }
}

/// JSON error body in the shape `{"error": {"type", "message"}}`
pub fn error_response(status: StatusCode, error_type: &str, message: &str) -> Response<Body> {
    let body = serde_json::json!({
        "error": {
            "type": error_type,
            "message": message,
        }
    });

    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        axum::http::header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("application/json"),
    );
    response
}

/// What to do with an intercepted chat request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassthroughDecision {
    /// Answer the game directly with this JSON body
    Respond(String),
    /// Send the original request to the game's backend
    Forward,
}

/// Route an interception failure to its handler
pub fn handle_intercept_error(error: &HookError) -> PassthroughDecision {
    match error {
        HookError::MissingCredential(_) => handle_credential_error(error),
        HookError::Parse(_) => handle_request_error(error),
        HookError::Provider(_) => handle_provider_error(error),
        _ => handle_internal_error(error),
    }
}

/// Active provider needs a key and has none
pub fn handle_credential_error(error: &HookError) -> PassthroughDecision {
    warn!(
        error_type = "credential",
        error_message = %error,
        "Provider not usable, forwarding to the game backend"
    );
    PassthroughDecision::Forward
}

/// Body was not a JSON object
pub fn handle_request_error(error: &HookError) -> PassthroughDecision {
    error!(
        error_type = "request",
        error_message = %error,
        "Could not parse chat request, forwarding unchanged"
    );
    PassthroughDecision::Forward
}

/// Provider failed after retries
pub fn handle_provider_error(error: &HookError) -> PassthroughDecision {
    let status = match error {
        HookError::Provider(e) => e.status(),
        _ => None,
    };
    error!(
        error_type = "provider",
        status = ?status,
        error_message = %error,
        "Provider call failed, falling back to the game backend"
    );
    PassthroughDecision::Forward
}

/// Settings, configuration or anything else unexpected
pub fn handle_internal_error(error: &HookError) -> PassthroughDecision {
    error!(
        error_type = "internal",
        error_message = %error,
        "Interception failed, forwarding unchanged"
    );
    PassthroughDecision::Forward
}
