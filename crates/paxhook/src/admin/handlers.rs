use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::admin::{ModelsResponse, ProviderSummary};
use crate::providers::ProviderId;
use crate::proxy::{AppState, error_response};

#[derive(Debug, Deserialize, Default)]
pub struct ModelsQuery {
    /// Provider to probe; defaults to the active one
    pub provider: Option<String>,
    /// Base URL to probe instead of the stored one
    pub base_url: Option<String>,
}

pub async fn providers_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.gateway.settings().load().await {
        Ok(settings) => Json(ProviderSummary::all(&settings)).into_response(),
        Err(e) => {
            tracing::error!("Failed to load settings: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "settings_error", &e.to_string())
        }
    }
}

pub async fn models_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelsQuery>,
) -> Response {
    let provider = match query.provider.as_deref().filter(|p| !p.is_empty()) {
        Some(raw) => match raw.parse::<ProviderId>() {
            Ok(id) => Some(id),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, "unknown_provider", &e),
        },
        None => None,
    };

    match state.gateway.probe(provider, query.base_url.as_deref()).await {
        Ok((provider, status)) => Json(ModelsResponse {
            provider,
            online: status.online,
            models: status.models,
            error: status.error,
        })
        .into_response(),
        Err(e) => {
            tracing::error!("Model probe failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "settings_error", &e.to_string())
        }
    }
}
