//! User-agent navigation contract
//!
//! The redirect flow leaves the application twice: once to the IdP's
//! authorization endpoint, once to its end-session endpoint. Both are side
//! effects of the host (a browser tab, a terminal), not return values, so
//! they go through this trait.

use std::sync::Mutex;

use reqwest::Url;
use tracing::warn;

/// The user agent hosting the application.
pub trait Navigator: Send + Sync {
    /// Full URL currently loaded, including the query string.
    fn current_url(&self) -> Url;

    /// Navigate away to `url`. The current execution context is finished
    /// once the host follows the redirect.
    fn redirect(&self, url: Url);

    /// Rewrite the current history entry to `url` without reloading.
    fn replace_history(&self, url: &str);
}

/// In-memory navigator that records every redirect.
///
/// Useful as a host for tests and headless tools: `redirect` and
/// `replace_history` both move `current_url`.
pub struct MemoryNavigator {
    state: Mutex<NavigatorState>,
}

struct NavigatorState {
    location: Url,
    redirects: Vec<Url>,
}

impl MemoryNavigator {
    pub fn new(location: Url) -> Self {
        Self {
            state: Mutex::new(NavigatorState {
                location,
                redirects: Vec::new(),
            }),
        }
    }

    /// Simulate the user agent loading `url` (e.g. the IdP callback).
    pub fn set_location(&self, url: Url) {
        self.lock().location = url;
    }

    /// Redirects issued so far, oldest first.
    pub fn redirects(&self) -> Vec<Url> {
        self.lock().redirects.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NavigatorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Navigator for MemoryNavigator {
    fn current_url(&self) -> Url {
        self.lock().location.clone()
    }

    fn redirect(&self, url: Url) {
        let mut state = self.lock();
        state.location = url.clone();
        state.redirects.push(url);
    }

    fn replace_history(&self, url: &str) {
        let mut state = self.lock();
        match state.location.join(url) {
            Ok(parsed) => state.location = parsed,
            Err(e) => warn!(url, error = %e, "ignoring unparseable history url"),
        }
    }
}
