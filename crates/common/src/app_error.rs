//! Uniform application error for setup-time failures

use std::error::Error as StdError;
use std::fmt;

type Cause = Box<dyn StdError + Send + Sync + 'static>;

/// A known application-level failure.
///
/// `scope` names the stage that failed (`env`, `session`, `bootstrap`, ...).
/// The original error, when there is one, is kept as the `source()` so the
/// full chain stays available for diagnostics.
pub struct AppError {
    scope: &'static str,
    message: String,
    cause: Option<Cause>,
}

impl AppError {
    /// Create an error without an underlying cause.
    pub fn new(scope: &'static str, message: impl Into<String>) -> Self {
        Self {
            scope,
            message: message.into(),
            cause: None,
        }
    }

    /// Wrap an underlying error.
    ///
    /// An `AppError` passed as the cause is returned unchanged so that an
    /// inner stage's scope and message are never buried under an outer one.
    pub fn wrap<E>(scope: &'static str, message: impl Into<String>, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let boxed: Cause = Box::new(cause);
        match boxed.downcast::<AppError>() {
            Ok(inner) => *inner,
            Err(other) => Self {
                scope,
                message: message.into(),
                cause: Some(other),
            },
        }
    }

    pub fn scope(&self) -> &'static str {
        self.scope
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.scope, self.message)
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppError")
            .field("scope", &self.scope)
            .field("message", &self.message)
            .field("cause", &self.cause)
            .finish()
    }
}

impl StdError for AppError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_scope_and_message() {
        let err = AppError::new("session", "unexpected response parameters: error=access_denied");
        assert_eq!(
            err.to_string(),
            "[session] unexpected response parameters: error=access_denied"
        );
        assert!(err.source().is_none());
    }

    #[test]
    fn wrap_preserves_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = AppError::wrap("bootstrap", "fail to setup core features", io);
        assert_eq!(err.scope(), "bootstrap");
        let source = err.source().expect("cause must be kept");
        assert_eq!(source.to_string(), "refused");
    }

    #[test]
    fn wrap_passes_app_error_through() {
        let inner = AppError::new("env", "missing argument: definition");
        let err = AppError::wrap("bootstrap", "fail to setup core features", inner);
        assert_eq!(err.scope(), "env");
        assert_eq!(err.message(), "missing argument: definition");
    }
}
