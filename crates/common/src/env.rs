//! Application environment document
//!
//! The SPA reads its deployment settings from a small JSON document
//! (usually `env.json` next to the page) or from values supplied inline.
//! Once resolved, the environment is never mutated; consumers receive it
//! by reference or `Arc`.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Resolved environment values.
///
/// Field names serialize as the upper-case keys used by the JSON document
/// (`BASE_URL`, `AUTH_CLIENT_ID`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppEnv {
    /// SPA base URL, without a trailing slash once resolved
    #[serde(default)]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_oidc_discovery_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_oidc_scopes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_session_store: Option<String>,
}

impl AppEnv {
    /// Normalize `BASE_URL`: fall back to the document base when empty and
    /// drop one trailing slash.
    pub fn resolve(mut self, document_base: &str) -> Self {
        if self.base_url.is_empty() {
            self.base_url = document_base.to_string();
        }
        if let Some(stripped) = self.base_url.strip_suffix('/') {
            self.base_url = stripped.to_string();
        }
        self
    }

    /// API endpoint prefix; an unset endpoint means "same origin, no prefix".
    pub fn api_endpoint(&self) -> &str {
        self.api_endpoint.as_deref().unwrap_or_default()
    }

    pub fn discovery_url(&self) -> Result<&str> {
        required(&self.auth_oidc_discovery_url, "AUTH_OIDC_DISCOVERY_URL")
    }

    pub fn client_id(&self) -> Result<&str> {
        required(&self.auth_client_id, "AUTH_CLIENT_ID")
    }

    pub fn scopes(&self) -> Result<&str> {
        required(&self.auth_oidc_scopes, "AUTH_OIDC_SCOPES")
    }
}

fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::Config(format!("missing environment value {key}"))),
    }
}

/// Where the environment comes from.
#[derive(Debug, Clone)]
pub enum EnvSource {
    /// Values supplied directly by the host application
    Inline(AppEnv),
    /// URL of a JSON document to fetch
    Url(String),
}

/// Resolve the environment from `source`.
///
/// A remote document must answer 2xx with `Content-Type: application/json`.
/// If fetching or parsing fails and `defaults` is given, the defaults are
/// used instead; without defaults the failure is returned.
pub async fn load_env(
    client: &reqwest::Client,
    source: EnvSource,
    document_base: &str,
    defaults: Option<AppEnv>,
) -> Result<AppEnv> {
    match source {
        EnvSource::Inline(values) => Ok(values.resolve(document_base)),
        EnvSource::Url(url) => match fetch_env(client, &url).await {
            Ok(values) => {
                info!(url = %url, "environment document loaded");
                Ok(values.resolve(document_base))
            }
            Err(e) => {
                warn!(url = %url, error = %e, "failed to fetch environment document");
                match defaults {
                    Some(values) => {
                        info!("using default environment values");
                        Ok(values.resolve(document_base))
                    }
                    None => Err(e),
                }
            }
        },
    }
}

async fn fetch_env(client: &reqwest::Client, url: &str) -> Result<AppEnv> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::EnvFetch(format!("request failed: {e}")))?;

    let status = response.status();
    let is_json = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if !status.is_success() || !is_json {
        return Err(Error::EnvFetch(format!("unexpected response: {status}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| Error::EnvFetch(format!("reading body: {e}")))?;
    Ok(serde_json::from_str(&body)?)
}
