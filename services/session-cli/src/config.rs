//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Process environment variables named like the environment document keys
//! (`BASE_URL`, `AUTH_CLIENT_ID`, ...) override the `[env]` table.

use common::{AppEnv, EnvSource};
use serde::Deserialize;
use session::SessionConf;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub env: EnvConfig,
    #[serde(default)]
    pub session: SessionConf,
    pub storage: StorageConfig,
}

/// Environment document source
#[derive(Debug, Default, Deserialize)]
pub struct EnvConfig {
    /// Remote environment document. Inline values become its fallback.
    #[serde(default)]
    pub url: Option<String>,
    /// Location the terminal "tab" starts at; defaults to `BASE_URL`
    #[serde(default)]
    pub document_url: Option<String>,
    #[serde(flatten)]
    pub values: AppEnv,
}

/// Where the tab-scoped and durable stores live
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub state_dir: PathBuf,
}

impl StorageConfig {
    pub fn session_file(&self) -> PathBuf {
        self.state_dir.join("session.json")
    }

    pub fn local_file(&self) -> PathBuf {
        self.state_dir.join("local.json")
    }
}

/// Keys overlaid from the process environment.
const ENV_KEYS: [&str; 6] = [
    "BASE_URL",
    "API_ENDPOINT",
    "AUTH_OIDC_DISCOVERY_URL",
    "AUTH_OIDC_SCOPES",
    "AUTH_CLIENT_ID",
    "AUTH_SESSION_STORE",
];

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        for key in ENV_KEYS {
            if let Ok(value) = std::env::var(key) {
                config.env.set(key, value);
            }
        }

        // Validate env.url is a valid URL with http(s) scheme
        if let Some(url) = &config.env.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "env.url must start with http:// or https://, got: {url}"
                )));
            }
        }

        if config.document_url().is_empty() {
            return Err(common::Error::Config(
                "either env.document_url or BASE_URL must be set".into(),
            ));
        }

        if config.storage.state_dir.as_os_str().is_empty() {
            return Err(common::Error::Config(
                "storage.state_dir must not be empty".into(),
            ));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("spa-session.toml")
    }

    pub fn document_url(&self) -> &str {
        self.env
            .document_url
            .as_deref()
            .unwrap_or(&self.env.values.base_url)
    }

    /// Source for `load_env`, plus the defaults used when a remote fetch fails.
    pub fn env_source(&self) -> (EnvSource, Option<AppEnv>) {
        match &self.env.url {
            Some(url) => (
                EnvSource::Url(url.clone()),
                Some(self.env.values.clone()),
            ),
            None => (EnvSource::Inline(self.env.values.clone()), None),
        }
    }
}

impl EnvConfig {
    fn set(&mut self, key: &str, value: String) {
        let values = &mut self.values;
        match key {
            "BASE_URL" => values.base_url = value,
            "API_ENDPOINT" => values.api_endpoint = Some(value),
            "AUTH_OIDC_DISCOVERY_URL" => values.auth_oidc_discovery_url = Some(value),
            "AUTH_OIDC_SCOPES" => values.auth_oidc_scopes = Some(value),
            "AUTH_CLIENT_ID" => values.auth_client_id = Some(value),
            "AUTH_SESSION_STORE" => values.auth_session_store = Some(value),
            _ => {}
        }
    }
}
