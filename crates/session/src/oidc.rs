//! OIDC-backed session
//!
//! States: NotStarted → PendingRedirect → Authenticated → (logout) NotStarted.
//!
//! `PendingRedirect` is not held in memory: `authenticate()` writes two
//! markers to tab-scoped storage and redirects away. The next run finds the
//! markers in `check_authentication_proceeding()`, consumes them, and
//! finishes the flow with the `code` from the callback URL.

use std::sync::Arc;
use std::time::{Duration, Instant};

use oidc_idp::{AuthToken, Navigator, OidcIdp, User};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::fetch::FetchOptions;
use crate::metrics;
use crate::storage::KeyValueStorage;
use crate::token_store::TokenStore;
use crate::{BoxFuture, ListenerSlot, Session, StateListener};

/// Tab-scoped key marking an authorization redirect in flight.
pub const AUTH_STATE_KEY: &str = "AUTH_STATE";

/// Tab-scoped key holding the URL to return to after login.
pub const AUTH_INITIAL_URL_KEY: &str = "AUTH_INITIAL_URL";

/// Margin subtracted from `expires_in` when deciding to refresh.
const EXPIRY_SKEW: Duration = Duration::from_secs(30);

/// When `call_api` refreshes the token first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Refresh before every call
    Always,
    /// Refresh once the access token is within `EXPIRY_SKEW` of expiring,
    /// or when its issue time is unknown
    #[default]
    BeforeExpiry,
}

impl RefreshPolicy {
    fn should_refresh(self, issued_at: Option<Instant>, expires_in: Option<u64>) -> bool {
        match self {
            RefreshPolicy::Always => true,
            RefreshPolicy::BeforeExpiry => match (issued_at, expires_in) {
                (Some(at), Some(secs)) => at.elapsed() + EXPIRY_SKEW >= Duration::from_secs(secs),
                _ => true,
            },
        }
    }
}

/// Session backed by an OIDC provider.
///
/// Invariant: `user` is set only while `token` is set.
pub struct OidcSession {
    idp: OidcIdp,
    token_store: Arc<dyn TokenStore>,
    pending: Arc<dyn KeyValueStorage>,
    navigator: Arc<dyn Navigator>,
    http: reqwest::Client,
    api_endpoint: String,
    refresh_policy: RefreshPolicy,
    token: Option<AuthToken>,
    issued_at: Option<Instant>,
    user: Option<User>,
    listener: ListenerSlot,
}

impl OidcSession {
    /// `pending` must be tab-scoped storage: the markers have to survive
    /// the redirect but not outlive the tab.
    pub fn new(
        idp: OidcIdp,
        token_store: Arc<dyn TokenStore>,
        pending: Arc<dyn KeyValueStorage>,
        navigator: Arc<dyn Navigator>,
        http: reqwest::Client,
        api_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            idp,
            token_store,
            pending,
            navigator,
            http,
            api_endpoint: api_endpoint.into(),
            refresh_policy: RefreshPolicy::default(),
            token: None,
            issued_at: None,
            user: None,
            listener: ListenerSlot::default(),
        }
    }

    pub fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }

    /// Token currently held in memory.
    pub fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }

    /// Hold `token`, resolve its user, and notify the listener.
    async fn complete_authentication(&mut self, token: AuthToken) -> Result<()> {
        let user = self.idp.fetch_userinfo(&token).await?;
        info!(username = user.username(), "complete authentication");
        self.token = Some(token);
        self.issued_at = Some(Instant::now());
        self.user = Some(user);
        self.listener.notify();
        Ok(())
    }

    /// Finish a login returning from the IdP. Markers are already consumed.
    async fn complete_redirect(&mut self, initial_url: Option<String>) -> Result<bool> {
        let location = self.navigator.current_url();
        let code = location
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned());

        let Some(code) = code else {
            let params = location.query().unwrap_or_default().to_string();
            warn!(%params, "authentication flow canceled");
            metrics::record_login("cancelled");
            return Err(Error::FlowCancelled { params });
        };

        let return_to = initial_url.unwrap_or_else(|| self.idp.settings().redirect_uri.clone());

        let Some(token) = self.idp.exchange_token(&code).await? else {
            warn!("authorization code rejected by token endpoint");
            metrics::record_login("rejected");
            self.navigator.replace_history(&return_to);
            return Ok(false);
        };

        let user = self.idp.fetch_userinfo(&token).await?;
        self.token_store.store(&token).await?;
        self.navigator.replace_history(&return_to);
        info!(url = %return_to, "exchanged, history restored");

        self.token = Some(token);
        self.issued_at = Some(Instant::now());
        self.user = Some(user);
        metrics::record_login("completed");
        self.listener.notify();
        Ok(true)
    }

    /// Resume from a persisted token, if any.
    async fn resume(&mut self) -> Result<()> {
        let Some(stored) = self.token_store.get().await? else {
            debug!("no persisted token");
            return Ok(());
        };

        let refreshed = self.idp.refresh_token(&stored).await?;
        match refreshed {
            None => {
                info!("session expired");
                metrics::record_refresh("expired");
                self.token_store.clear().await?;
            }
            Some(token) => {
                metrics::record_refresh("refreshed");
                self.token_store.store(&token).await?;
                self.complete_authentication(token).await?;
                info!("session recovery completed");
            }
        }
        Ok(())
    }

    /// Best-effort removal of both pending markers.
    async fn discard_markers(&self) {
        for key in [AUTH_STATE_KEY, AUTH_INITIAL_URL_KEY] {
            if let Err(e) = self.pending.remove(key).await {
                warn!(key, error = %e, "failed to discard pending marker");
            }
        }
    }

    /// Refresh ahead of an API call according to the refresh policy.
    async fn refresh_for_call(&mut self) -> Result<()> {
        let Some(token) = self.token.as_ref() else {
            return Ok(());
        };
        if !self
            .refresh_policy
            .should_refresh(self.issued_at, token.expires_in)
        {
            return Ok(());
        }

        let refreshed = self.idp.refresh_token(token).await?;
        match refreshed {
            Some(refreshed) => {
                metrics::record_refresh("refreshed");
                self.token_store.store(&refreshed).await?;
                self.token = Some(refreshed);
                self.issued_at = Some(Instant::now());
            }
            None => {
                // The API will answer with its own authentication error
                warn!("token refresh before api call failed, using current token");
                metrics::record_refresh("expired");
            }
        }
        Ok(())
    }
}

impl Session for OidcSession {
    fn id(&self) -> &str {
        self.idp.profile_id()
    }

    fn set_listener(&mut self, listener: StateListener) {
        self.listener.set(listener);
    }

    fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    fn check_authentication_proceeding(&mut self) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move {
            // Take both markers before anything can fail, so a callback is
            // never processed twice.
            let state = self.pending.take(AUTH_STATE_KEY).await?;
            let initial_url = self.pending.take(AUTH_INITIAL_URL_KEY).await?;

            if state.is_some() {
                debug!(initial_url = ?initial_url, "authorization redirect in progress");
                self.complete_redirect(initial_url).await
            } else {
                self.resume().await?;
                Ok(false)
            }
        })
    }

    fn authenticate(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.token_store.clear().await?;
            self.token = None;
            self.issued_at = None;
            self.user = None;

            let marker = uuid::Uuid::new_v4().to_string();
            let initial_url = self.navigator.current_url().to_string();
            self.pending.set(AUTH_STATE_KEY, marker).await?;
            let started = match self.pending.set(AUTH_INITIAL_URL_KEY, initial_url).await {
                Ok(()) => self.idp.authenticate().map_err(Error::from),
                Err(e) => Err(e),
            };

            if let Err(e) = started {
                // No redirect happened, so no callback will consume the markers
                self.discard_markers().await;
                return Err(e);
            }
            Ok(())
        })
    }

    fn logout(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let Some(token) = self.token.clone() else {
                debug!("logout without token, nothing to do");
                return Ok(());
            };

            // Keep the token until the store is cleared; a failed clear can be retried
            self.token_store.clear().await?;
            let signed_out = self.idp.sign_out(&token);
            self.token = None;
            self.issued_at = None;
            self.user = None;
            metrics::record_logout();
            self.listener.notify();
            signed_out.map_err(Error::from)
        })
    }

    fn call_api<'a>(
        &'a mut self,
        path: &'a str,
        options: FetchOptions,
    ) -> BoxFuture<'a, Result<reqwest::Response>> {
        Box::pin(async move {
            self.refresh_for_call().await?;

            let mut defaults = FetchOptions::new().method(reqwest::Method::GET);
            match &self.token {
                Some(token) => {
                    let bearer = HeaderValue::from_str(&format!("Bearer {}", token.access_token))
                        .map_err(|e| Error::Http(format!("invalid access token value: {e}")))?;
                    defaults = defaults.header(AUTHORIZATION, bearer);
                }
                None => debug!(path, "api call without token"),
            }

            let url = format!("{}{}", self.api_endpoint, path);
            options
                .merged_over(defaults)
                .into_request(&self.http, &url)
                .send()
                .await
                .map_err(|e| Error::Http(format!("{url}: {e}")))
        })
    }
}
