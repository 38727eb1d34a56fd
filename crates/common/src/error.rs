//! Common error types

use thiserror::Error;

/// Configuration and environment resolution errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("environment document unavailable: {0}")]
    EnvFetch(String),
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_context() {
        let config_err = Error::Config("missing BASE_URL".into());
        assert_eq!(
            config_err.to_string(),
            "Configuration error: missing BASE_URL"
        );

        let io_err = Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        assert!(
            io_err.to_string().starts_with("I/O error:"),
            "got: {}",
            io_err
        );

        let fetch_err = Error::EnvFetch("unexpected response: 404".into());
        assert!(fetch_err.to_string().contains("404"));
    }

    #[test]
    fn json_errors_convert() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = parse.into();
        let debug = format!("{:?}", err);
        assert!(
            debug.contains("Json"),
            "Debug should include variant name, got: {debug}"
        );
    }
}
