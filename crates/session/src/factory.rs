//! Session construction and application bootstrap
//!
//! `create_session` builds the configured `Session` variant; `bootstrap`
//! is the composition root: resolve the environment, build the session,
//! run `check_authentication_proceeding()` exactly once, and hand the ready
//! session to the caller. Setup failures surface as a single `AppError`.

use std::sync::Arc;

use common::{AppEnv, AppError, EnvSource, load_env};
use oidc_idp::{
    ClientSettings, CognitoProfile, GenericProfile, Navigator, OidcIdp, ProviderProfile, discovery,
};
use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::noop::NoopSession;
use crate::oidc::{OidcSession, RefreshPolicy};
use crate::storage::KeyValueStorage;
use crate::token_store::{StorageScope, StorageTokenStore};
use crate::{Session, StateListener};

/// Which session implementation to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionModule {
    Noop,
    #[default]
    Oidc,
    Cognito,
}

/// Session settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConf {
    #[serde(default)]
    pub module: SessionModule,
    #[serde(default)]
    pub token_store: StorageScope,
    #[serde(default)]
    pub refresh_policy: RefreshPolicy,
}

/// Capabilities supplied by the user agent hosting the application.
#[derive(Clone)]
pub struct Host {
    pub http: reqwest::Client,
    pub navigator: Arc<dyn Navigator>,
    /// Tab-scoped storage
    pub session_storage: Arc<dyn KeyValueStorage>,
    /// Durable storage
    pub local_storage: Arc<dyn KeyValueStorage>,
}

impl Host {
    fn storage(&self, scope: StorageScope) -> Arc<dyn KeyValueStorage> {
        match scope {
            StorageScope::Session => self.session_storage.clone(),
            StorageScope::Local => self.local_storage.clone(),
        }
    }
}

/// Build the session selected by `conf`.
///
/// OIDC variants perform discovery; a missing or unusable discovery
/// document fails here.
pub async fn create_session(
    env: &AppEnv,
    conf: &SessionConf,
    host: &Host,
) -> Result<Box<dyn Session>> {
    info!(module = ?conf.module, token_store = ?conf.token_store, "create session instance");

    if conf.module == SessionModule::Noop {
        return Ok(Box::new(NoopSession::new(
            host.http.clone(),
            env.api_endpoint(),
        )));
    }

    let metadata = discovery(&host.http, env.discovery_url()?).await?;
    let settings = ClientSettings {
        client_id: env.client_id()?.to_string(),
        redirect_uri: env.base_url.clone(),
        scopes: env.scopes()?.to_string(),
    };
    if settings.redirect_uri.is_empty() {
        return Err(Error::Config("BASE_URL is empty".into()));
    }

    let profile: Box<dyn ProviderProfile> = match conf.module {
        SessionModule::Cognito => Box::new(CognitoProfile),
        _ => Box::new(GenericProfile),
    };
    let idp = OidcIdp::new(metadata, settings, host.http.clone(), host.navigator.clone())
        .with_profile(profile);

    let scope = token_scope(env, conf)?;
    let token_store = Arc::new(StorageTokenStore::new(host.storage(scope)));
    let session = OidcSession::new(
        idp,
        token_store,
        host.session_storage.clone(),
        host.navigator.clone(),
        host.http.clone(),
        env.api_endpoint(),
    )
    .with_refresh_policy(conf.refresh_policy);
    Ok(Box::new(session))
}

/// `AUTH_SESSION_STORE` in the environment wins over the configured scope.
fn token_scope(env: &AppEnv, conf: &SessionConf) -> Result<StorageScope> {
    match env.auth_session_store.as_deref() {
        None | Some("") => Ok(conf.token_store),
        Some("session") => Ok(StorageScope::Session),
        Some("local") => Ok(StorageScope::Local),
        Some(other) => Err(Error::Config(format!(
            "invalid AUTH_SESSION_STORE value: {other}"
        ))),
    }
}

/// Core settings for `bootstrap`.
pub struct CoreConf {
    pub env: EnvSource,
    /// Used when a remote env document cannot be fetched
    pub env_defaults: Option<AppEnv>,
    /// Base URL of the hosting document, the fallback for `BASE_URL`
    pub document_base: String,
    pub session: SessionConf,
    /// Registered before the startup check so a completed login is observed
    pub listener: Option<StateListener>,
}

/// A bootstrapped application: resolved environment plus a session that
/// has already run its startup check.
pub struct App {
    pub env: AppEnv,
    pub session: Box<dyn Session>,
    /// Whether startup completed a login returning from the IdP
    pub authentication_completed: bool,
}

impl App {
    /// Base path for client-side routing.
    pub fn base_url(&self) -> &str {
        &self.env.base_url
    }
}

/// Resolve the environment, build the session and run the startup check.
pub async fn bootstrap(conf: CoreConf, host: &Host) -> std::result::Result<App, AppError> {
    info!("initialize");
    let env = load_env(&host.http, conf.env, &conf.document_base, conf.env_defaults)
        .await
        .map_err(|e| AppError::wrap("env", "fail to resolve environment", e))?;
    info!(base_url = %env.base_url, "environment vars fixed");

    let mut session = create_session(&env, &conf.session, host)
        .await
        .map_err(|e| AppError::wrap("bootstrap", "unexpected error at session module setup", e))?;
    if let Some(listener) = conf.listener {
        session.set_listener(listener);
    }

    let authentication_completed = session
        .check_authentication_proceeding()
        .await
        .map_err(|e| match e {
            Error::FlowCancelled { .. } => AppError::wrap("session", e.to_string(), e),
            other => AppError::wrap("bootstrap", "fail to setup core features", other),
        })?;
    info!(
        session = session.id(),
        authentication_completed,
        anonymous = session.is_anonymous(),
        "session ready"
    );

    Ok(App {
        env,
        session,
        authentication_completed,
    })
}
