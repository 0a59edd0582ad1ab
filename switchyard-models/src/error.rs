//! Error types for provider resolution and dispatch.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving or calling a provider.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid deployment configuration (e.g. duplicate provider registration).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Provider not found in registry.
    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    /// Model is not offered by the requested provider.
    #[error("model '{model}' is not offered by provider '{provider}'")]
    UnknownModel { provider: String, model: String },

    /// No API key could be resolved for a provider that requires one.
    #[error("no API key configured for provider: {0}")]
    MissingCredential(String),

    /// No base URL could be resolved for a provider without a default endpoint.
    #[error("no base URL configured for provider: {0}")]
    MissingBaseUrl(String),

    /// Network failure or vendor-reported failure while talking upstream.
    #[error("upstream transport error: {0}")]
    UpstreamTransport(String),

    /// Upstream answered with a non-success HTTP status.
    #[error("upstream returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    /// Upstream sent data that cannot be decoded into stream events.
    #[error("upstream protocol error: {0}")]
    UpstreamProtocol(String),

    /// Failed to access system keyring.
    #[error("keyring error: {0}")]
    Keyring(String),
}

/// Coarse classification of [`Error`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    NotFound,
    MissingCredential,
    UpstreamTransport,
    UpstreamProtocol,
}

impl Error {
    /// Returns the taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) | Error::Keyring(_) => ErrorKind::Configuration,
            Error::ProviderNotFound(_) | Error::UnknownModel { .. } => ErrorKind::NotFound,
            Error::MissingCredential(_) | Error::MissingBaseUrl(_) => {
                ErrorKind::MissingCredential
            }
            Error::UpstreamTransport(_) | Error::UpstreamStatus { .. } => {
                ErrorKind::UpstreamTransport
            }
            Error::UpstreamProtocol(_) => ErrorKind::UpstreamProtocol,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::UpstreamTransport(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::UpstreamProtocol(err.to_string())
    }
}
