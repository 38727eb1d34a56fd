//! Error types for identity provider operations

/// Errors from discovery and IdP endpoint calls.
///
/// A 400 from the token endpoint is not an error: exchange and refresh
/// report it as an absent token.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("OIDC configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("not ok response: {status}")]
    Api { status: u16 },

    #[error("unexpected content-type: {0}")]
    UnexpectedContentType(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Result alias for IdP operations.
pub type Result<T> = std::result::Result<T, Error>;
