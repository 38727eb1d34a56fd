//! Error types for session operations

/// Errors from session, storage and bootstrap operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The IdP redirected back without an authorization `code`; `params` is
    /// the raw query string it sent instead (usually `error=...`).
    #[error("unexpected response parameters: {params}")]
    FlowCancelled { params: String },

    #[error(transparent)]
    Idp(#[from] oidc_idp::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("API request failed: {0}")]
    Http(String),
}

impl From<common::Error> for Error {
    fn from(e: common::Error) -> Self {
        Error::Config(e.to_string())
    }
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
