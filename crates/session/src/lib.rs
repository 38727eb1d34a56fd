//! Authentication session for single-page applications
//!
//! Defines the `Session` trait the application talks to, and two
//! implementations selected at bootstrap: `NoopSession` (always anonymous,
//! no network) and `OidcSession` (authorization-code flow with token
//! persistence and refresh).
//!
//! Lifecycle:
//! 1. `bootstrap()` resolves the environment and builds the configured session
//! 2. `check_authentication_proceeding()` runs exactly once, before anything else:
//!    it completes a login returning from the IdP, or resumes a persisted token
//! 3. The application calls `authenticate()`, `logout()` and `call_api()`
//! 4. The registered listener is invoked after each login/logout transition
//!
//! The redirect to the IdP ends the current run. The next run reconnects
//! to the flow only through the pending-authentication markers kept in
//! tab-scoped storage.

pub mod error;
pub mod factory;
pub mod fetch;
pub mod metrics;
pub mod noop;
pub mod oidc;
pub mod storage;
pub mod token_store;

pub use error::{Error, Result};
pub use factory::{App, CoreConf, Host, SessionConf, SessionModule, bootstrap, create_session};
pub use fetch::FetchOptions;
pub use noop::NoopSession;
pub use oidc::{AUTH_INITIAL_URL_KEY, AUTH_STATE_KEY, OidcSession, RefreshPolicy};
pub use oidc_idp::{AuthToken, User};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use token_store::{MemoryTokenStore, StorageScope, StorageTokenStore, TokenStore};

use std::future::Future;
use std::pin::Pin;

use tracing::debug;

/// Boxed future returned by the dyn-compatible traits of this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Callback invoked after a session state transition.
pub type StateListener = Box<dyn Fn() + Send + Sync>;

/// Application-facing authentication session.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Box<dyn Session>`). Mutating operations take `&mut self`: the
/// application owns exactly one session and drives it sequentially.
pub trait Session: Send + Sync {
    /// Identifier for logging (e.g. "noop", "oidc", "cognito")
    fn id(&self) -> &str;

    /// Register the state-change listener. At most one listener is active;
    /// a new registration replaces the previous one.
    fn set_listener(&mut self, listener: StateListener);

    /// Current user, if signed in.
    fn user(&self) -> Option<&User>;

    fn is_anonymous(&self) -> bool {
        self.user().is_none()
    }

    /// Complete or resume authentication at application start.
    ///
    /// Must be called exactly once, before any other operation. Returns
    /// `true` only when this call consumed a redirect callback from the IdP
    /// and completed a login.
    fn check_authentication_proceeding(&mut self) -> BoxFuture<'_, Result<bool>>;

    /// Begin an interactive login.
    fn authenticate(&mut self) -> BoxFuture<'_, Result<()>>;

    /// End the current session.
    fn logout(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Call the application API at `path` (appended to `API_ENDPOINT`).
    fn call_api<'a>(
        &'a mut self,
        path: &'a str,
        options: FetchOptions,
    ) -> BoxFuture<'a, Result<reqwest::Response>>;
}

/// Holder for the single registered listener.
#[derive(Default)]
pub(crate) struct ListenerSlot(Option<StateListener>);

impl ListenerSlot {
    pub(crate) fn set(&mut self, listener: StateListener) {
        self.0 = Some(listener);
    }

    pub(crate) fn notify(&self) {
        if let Some(listener) = &self.0 {
            debug!("execute state change listener");
            listener();
        }
    }
}
