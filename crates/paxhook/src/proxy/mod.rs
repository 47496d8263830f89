mod error;
mod gateway;
mod passthrough;
mod server;

pub use error::{
    PassthroughDecision, ProxyError, error_response, handle_credential_error,
    handle_intercept_error, handle_internal_error, handle_provider_error, handle_request_error,
};
pub use gateway::Gateway;
pub use passthrough::UpstreamTarget;
pub use server::{AppState, ProxyServer, create_router};
