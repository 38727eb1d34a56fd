//! Session without an identity provider
//!
//! For development and deployments without authentication: never touches
//! the network for auth, `authenticate()` signs in a fixed dummy user, and
//! API calls go out without credentials.

use oidc_idp::User;
use tracing::info;

use crate::error::{Error, Result};
use crate::fetch::FetchOptions;
use crate::{BoxFuture, ListenerSlot, Session, StateListener};

/// Username of the development identity.
pub const DUMMY_USERNAME: &str = "dummy";

pub struct NoopSession {
    http: reqwest::Client,
    api_endpoint: String,
    user: Option<User>,
    listener: ListenerSlot,
}

impl NoopSession {
    pub fn new(http: reqwest::Client, api_endpoint: impl Into<String>) -> Self {
        Self {
            http,
            api_endpoint: api_endpoint.into(),
            user: None,
            listener: ListenerSlot::default(),
        }
    }
}

impl Session for NoopSession {
    fn id(&self) -> &str {
        "noop"
    }

    fn set_listener(&mut self, listener: StateListener) {
        self.listener.set(listener);
    }

    fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    fn check_authentication_proceeding(&mut self) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async { Ok(false) })
    }

    fn authenticate(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.user = Some(User::new(DUMMY_USERNAME, None));
            info!("signed in development user");
            self.listener.notify();
            Ok(())
        })
    }

    fn logout(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.user = None;
            self.listener.notify();
            Ok(())
        })
    }

    fn call_api<'a>(
        &'a mut self,
        path: &'a str,
        options: FetchOptions,
    ) -> BoxFuture<'a, Result<reqwest::Response>> {
        Box::pin(async move {
            let url = format!("{}{}", self.api_endpoint, path);
            options
                .into_request(&self.http, &url)
                .send()
                .await
                .map_err(|e| Error::Http(format!("{url}: {e}")))
        })
    }
}
