//! HTTP proxy server in front of the game backend
//!
//! Routes:
//! - `/p/{url}`: dynamic passthrough to an allowlisted origin
//! - anything else: forwarded to the configured `upstream_url`
//! - `/health`, `/_paxhook/*`: local status and provider probes
//!
//! Requests whose target contains the chat path are offered to the
//! [`Gateway`] first and only forwarded if it declines.

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, RawQuery, Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use url::Url;

use crate::admin::handlers::{models_handler, providers_handler};
use crate::config::{Config, ProxyConfig};
use crate::error::{HookError, Result};
use crate::providers::ProviderRegistry;
use crate::retry::RetryPolicy;
use crate::settings::SettingsStore;

use super::error::{PassthroughDecision, ProxyError, error_response};
use super::gateway::Gateway;
use super::passthrough::UpstreamTarget;

/// Hop-by-hop headers that must not be forwarded
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "host",
    "connection",
    "keep-alive",
    "transfer-encoding",
    "proxy-connection",
    "te",
    "upgrade",
];

/// Shared state for all handlers
pub struct AppState {
    pub config: ProxyConfig,
    /// Client for passthrough requests
    pub client: reqwest::Client,
    pub gateway: Arc<Gateway>,
}

/// The proxy daemon
pub struct ProxyServer {
    config: Config,
    settings: Arc<dyn SettingsStore>,
}

impl ProxyServer {
    pub fn new(config: Config, settings: Arc<dyn SettingsStore>) -> Self {
        Self { config, settings }
    }

    /// Bind and serve until Ctrl+C or SIGTERM
    pub async fn serve(&self) -> Result<()> {
        let proxy = &self.config.proxy;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(proxy.timeout_secs))
            .build()
            .map_err(|e| HookError::Proxy(format!("Failed to create HTTP client: {e}")))?;

        // Provider calls get their own per-attempt deadline
        let provider_client = reqwest::Client::builder()
            .timeout(self.config.retry.attempt_timeout())
            .build()
            .map_err(|e| HookError::Proxy(format!("Failed to create provider client: {e}")))?;

        let gateway = Gateway::new(
            self.settings.clone(),
            ProviderRegistry::new(provider_client),
            RetryPolicy::from(&self.config.retry),
            proxy.chat_path.clone(),
        );

        let state = Arc::new(AppState {
            config: proxy.clone(),
            client,
            gateway: Arc::new(gateway),
        });

        let app = create_router(state);

        let addr: SocketAddr = proxy
            .listen_addr
            .parse()
            .map_err(|e| HookError::Config(format!("Invalid listen address: {e}")))?;

        tracing::info!("Starting proxy server on {addr}");
        tracing::info!("Intercepting requests matching '{}'", proxy.chat_path);
        if proxy.allowed_hosts.is_empty() {
            tracing::info!("Host allowlist: disabled (all hosts allowed)");
        } else {
            tracing::info!("Host allowlist: {} hosts configured", proxy.allowed_hosts.len());
        }
        match &proxy.upstream_url {
            Some(upstream) => tracing::info!("Configured upstream URL: {upstream}"),
            None => tracing::info!("No configured upstream URL (dynamic passthrough only)"),
        }

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HookError::Proxy(format!("Failed to bind to {addr}: {e}")))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| HookError::Proxy(format!("Server error: {e}")))?;

        tracing::info!("Proxy server shut down gracefully");
        Ok(())
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/_paxhook/providers", get(providers_handler))
        .route("/_paxhook/models", get(models_handler))
        .route("/p/{*upstream_url}", any(dynamic_proxy_handler))
        .fallback(configured_proxy_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn dynamic_proxy_handler(
    State(state): State<Arc<AppState>>,
    Path(upstream_url): Path<String>,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Response<Body> {
    let path = format!("/p/{upstream_url}");

    let target = match UpstreamTarget::from_path(&path, query.as_deref()) {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!("Invalid passthrough URL: {e}");
            return error_response(
                StatusCode::BAD_REQUEST,
                "invalid_url",
                &format!("Invalid upstream URL: {e}"),
            );
        }
    };

    if !target.is_allowed(&state.config) {
        tracing::warn!("Blocked request to disallowed host: {}", target.host);
        return error_response(
            StatusCode::FORBIDDEN,
            "host_not_allowed",
            &format!("Host '{}' is not in the allowlist", target.host),
        );
    }

    handle(&state, &target.url, method, headers, body).await
}

async fn configured_proxy_handler(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
) -> Response<Body> {
    let Some(upstream_base) = &state.config.upstream_url else {
        return error_response(
            StatusCode::NOT_FOUND,
            "no_upstream_configured",
            "No upstream URL configured. Use /p/{url} for dynamic passthrough or configure an upstream_url.",
        );
    };

    let base_url = match Url::parse(upstream_base) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!("Invalid configured upstream URL: {e}");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "invalid_upstream_config",
                "The configured upstream URL is invalid",
            );
        }
    };

    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let target_url = match base_url.join(path_and_query) {
        Ok(url) => url,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "invalid_path",
                &format!("Invalid request path: {e}"),
            );
        }
    };

    let (parts, body) = request.into_parts();
    handle(&state, &target_url, parts.method, parts.headers, body).await
}

/// Offer the request to the gateway, forwarding it if declined
async fn handle(
    state: &AppState,
    target_url: &Url,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Response<Body> {
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return ProxyError::Request(format!("Failed to read request body: {e}"))
                .into_response();
        }
    };

    if method == Method::POST {
        if let PassthroughDecision::Respond(body) =
            state.gateway.decide(target_url.as_str(), &body_bytes).await
        {
            return synthesized_response(body);
        }
    }

    tracing::debug!("Forwarding request to: {target_url}");
    match forward_request(state, target_url, method, headers, body_bytes).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error_type = e.category(), error_message = %e, "Passthrough failed");
            e.into_response()
        }
    }
}

/// 200 JSON response standing in for the game backend's
fn synthesized_response(body: String) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// Copy of `headers` without hop-by-hop entries
fn end_to_end_headers(headers: &HeaderMap) -> HeaderMap {
    let mut kept = headers.clone();
    for name in HOP_BY_HOP_HEADERS {
        kept.remove(*name);
    }
    kept
}

/// Relay a request to the upstream unchanged (minus hop-by-hop headers)
async fn forward_request(
    state: &AppState,
    target_url: &Url,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Response<Body>, ProxyError> {
    let upstream = state
        .client
        .request(method, target_url.clone())
        .headers(end_to_end_headers(&headers))
        .body(body)
        .send()
        .await
        .map_err(|e| {
            let e = e.without_url();
            if e.is_timeout() {
                ProxyError::Network(format!("Game backend timed out: {e}"))
            } else if e.is_connect() {
                ProxyError::Network(format!("Game backend unreachable: {e}"))
            } else {
                ProxyError::Network(format!("Passthrough failed: {e}"))
            }
        })?;

    let status = upstream.status();
    let headers = end_to_end_headers(upstream.headers());
    let payload = upstream
        .bytes()
        .await
        .map_err(|e| ProxyError::Network(format!("Failed to read backend response: {e}")))?;

    let mut relayed = Response::new(Body::from(payload));
    *relayed.status_mut() = status;
    *relayed.headers_mut() = headers;
    Ok(relayed)
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::testing::test_state;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn body_string(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = create_router(test_state(ProxyConfig::default(), Settings::default()));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("\"status\":\"ok\""));
    }

    #[tokio::test]
    async fn test_fallback_without_upstream_returns_not_found() {
        let app = create_router(test_state(ProxyConfig::default(), Settings::default()));

        let response = app
            .oneshot(Request::builder().uri("/any/path").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_string(response).await.contains("no_upstream_configured"));
    }

    #[tokio::test]
    async fn test_dynamic_passthrough_invalid_url() {
        let app = create_router(test_state(ProxyConfig::default(), Settings::default()));

        let response = app
            .oneshot(Request::builder().uri("/p/not-a-valid-url").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("invalid_url"));
    }

    #[tokio::test]
    async fn test_dynamic_passthrough_blocked_host() {
        let config = ProxyConfig {
            allowed_hosts: vec!["paxhistoria.co".to_string()],
            ..ProxyConfig::default()
        };
        let app = create_router(test_state(config, Settings::default()));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/p/https://evil.example/api/simple-chat")
                    .body(Body::from("{\"prompt\":\"hi\"}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(body_string(response).await.contains("host_not_allowed"));
    }

    #[test]
    fn test_end_to_end_headers_drop_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("localhost:8787"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::COOKIE, HeaderValue::from_static("session=abc"));
        headers.append("x-game-version", HeaderValue::from_static("1.4"));

        let kept = end_to_end_headers(&headers);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept.get(header::COOKIE).unwrap(), "session=abc");
        assert_eq!(kept.get("x-game-version").unwrap(), "1.4");
    }
}
