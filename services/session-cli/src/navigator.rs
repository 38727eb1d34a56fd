//! Terminal user agent
//!
//! Plays the browser tab for the CLI: redirects are printed on stdout for
//! the user to open, history rewrites only move the in-memory location.

use oidc_idp::{MemoryNavigator, Navigator, Url};
use tracing::info;

pub struct TerminalNavigator {
    inner: MemoryNavigator,
}

impl TerminalNavigator {
    pub fn new(location: Url) -> Self {
        Self {
            inner: MemoryNavigator::new(location),
        }
    }
}

impl Navigator for TerminalNavigator {
    fn current_url(&self) -> Url {
        self.inner.current_url()
    }

    fn redirect(&self, url: Url) {
        info!(host = url.host_str().unwrap_or_default(), "redirect");
        println!("open in a browser: {url}");
        self.inner.redirect(url);
    }

    fn replace_history(&self, url: &str) {
        info!(url, "history restored");
        self.inner.replace_history(url);
    }
}
