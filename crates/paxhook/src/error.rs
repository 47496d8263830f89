//! Error types for paxhook

use thiserror::Error;

use crate::providers::{ProviderError, ProviderId};

/// Main error type for paxhook operations
#[derive(Error, Debug)]
pub enum HookError {
    /// Daemon configuration errors (config file, listen address, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider settings errors (unknown key, bad value, unreadable store)
    #[error("Settings error: {0}")]
    Settings(String),

    /// The active provider needs an API key and none is stored
    #[error("No API key configured for provider '{0}'")]
    MissingCredential(ProviderId),

    /// Malformed intercepted request body
    #[error("Parse error: {0}")]
    Parse(String),

    /// Provider call failed (after retries, if any applied)
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Proxy/HTTP errors
    #[error("Proxy error: {0}")]
    Proxy(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for paxhook operations
pub type Result<T> = std::result::Result<T, HookError>;
