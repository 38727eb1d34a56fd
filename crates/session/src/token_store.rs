//! Token persistence
//!
//! A `TokenStore` holds at most one `AuthToken`. The storage-backed store
//! serializes it as JSON under `AUTH_TOKEN` in a [`KeyValueStorage`];
//! which storage (tab-scoped or durable) is picked by configuration.

use std::sync::Arc;

use oidc_idp::AuthToken;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::BoxFuture;
use crate::error::{Error, Result};
use crate::storage::KeyValueStorage;

/// Storage key of the persisted token.
pub const AUTH_TOKEN_KEY: &str = "AUTH_TOKEN";

/// Persistence contract for the session's token.
pub trait TokenStore: Send + Sync {
    /// Persist `token`, replacing any previous one. Either the whole token
    /// is written or nothing is.
    fn store<'a>(&'a self, token: &'a AuthToken) -> BoxFuture<'a, Result<()>>;

    /// Last persisted token. Malformed data reads as `None`.
    fn get(&self) -> BoxFuture<'_, Result<Option<AuthToken>>>;

    /// Delete the persisted token. Idempotent.
    fn clear(&self) -> BoxFuture<'_, Result<()>>;
}

/// Which storage backs the token store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageScope {
    /// Tab-scoped: the token is forgotten with the tab
    #[default]
    Session,
    /// Durable across restarts
    Local,
}

/// Token store over a [`KeyValueStorage`].
pub struct StorageTokenStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl StorageTokenStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }
}

impl TokenStore for StorageTokenStore {
    fn store<'a>(&'a self, token: &'a AuthToken) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let json = serde_json::to_string(token)
                .map_err(|e| Error::Storage(format!("serializing token: {e}")))?;
            self.storage.set(AUTH_TOKEN_KEY, json).await?;
            debug!("token stored");
            Ok(())
        })
    }

    fn get(&self) -> BoxFuture<'_, Result<Option<AuthToken>>> {
        Box::pin(async move {
            let Some(raw) = self.storage.get(AUTH_TOKEN_KEY).await? else {
                return Ok(None);
            };
            if raw.trim().is_empty() {
                return Ok(None);
            }
            match serde_json::from_str::<AuthToken>(&raw) {
                Ok(token) => Ok(Some(token)),
                Err(e) => {
                    warn!(error = %e, "ignoring malformed persisted token");
                    Ok(None)
                }
            }
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.storage.remove(AUTH_TOKEN_KEY).await?;
            debug!("token cleared");
            Ok(())
        })
    }
}

/// Token store that lives only as long as the process.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<AuthToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn store<'a>(&'a self, token: &'a AuthToken) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            *self.token.lock().await = Some(token.clone());
            Ok(())
        })
    }

    fn get(&self) -> BoxFuture<'_, Result<Option<AuthToken>>> {
        Box::pin(async move { Ok(self.token.lock().await.clone()) })
    }

    fn clear(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            *self.token.lock().await = None;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};

    fn token() -> AuthToken {
        AuthToken {
            access_token: "AT".into(),
            id_token: Some("IT".into()),
            refresh_token: Some("RT".into()),
            token_type: "Bearer".into(),
            expires_in: Some(3600),
        }
    }

    fn stores() -> Vec<Box<dyn TokenStore>> {
        vec![
            Box::new(StorageTokenStore::new(Arc::new(MemoryStorage::new()))),
            Box::new(MemoryTokenStore::new()),
        ]
    }

    #[tokio::test]
    async fn store_then_get_returns_equal_token() {
        for store in stores() {
            store.store(&token()).await.unwrap();
            assert_eq!(store.get().await.unwrap(), Some(token()));
        }
    }

    #[tokio::test]
    async fn store_overwrites_previous_token() {
        for store in stores() {
            store.store(&token()).await.unwrap();
            let newer = AuthToken {
                access_token: "AT2".into(),
                ..token()
            };
            store.store(&newer).await.unwrap();
            assert_eq!(store.get().await.unwrap(), Some(newer));
        }
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        for store in stores() {
            store.store(&token()).await.unwrap();
            store.clear().await.unwrap();
            assert_eq!(store.get().await.unwrap(), None);
            store.clear().await.unwrap();
            assert_eq!(store.get().await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn malformed_token_reads_as_none() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set(AUTH_TOKEN_KEY, r#"{"access_token": 42"#.into())
            .await
            .unwrap();
        let store = StorageTokenStore::new(storage.clone());
        assert_eq!(store.get().await.unwrap(), None);

        storage.set(AUTH_TOKEN_KEY, String::new()).await.unwrap();
        assert_eq!(store.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn token_is_persisted_as_json_under_auth_token() {
        let storage = Arc::new(MemoryStorage::new());
        let store = StorageTokenStore::new(storage.clone());
        store.store(&token()).await.unwrap();

        let raw = storage.get(AUTH_TOKEN_KEY).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["access_token"], "AT");
        assert_eq!(value["refresh_token"], "RT");
        assert_eq!(value["expires_in"], 3600);
    }

    #[tokio::test]
    async fn durable_store_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.json");

        let store = StorageTokenStore::new(Arc::new(FileStorage::load(path.clone()).await.unwrap()));
        store.store(&token()).await.unwrap();

        let reloaded =
            StorageTokenStore::new(Arc::new(FileStorage::load(path).await.unwrap()));
        assert_eq!(reloaded.get().await.unwrap(), Some(token()));
    }

    #[test]
    fn storage_scope_parses_from_config() {
        #[derive(Deserialize)]
        struct Conf {
            token_store: StorageScope,
        }
        let conf: Conf = serde_json::from_str(r#"{"token_store":"local"}"#).unwrap();
        assert_eq!(conf.token_store, StorageScope::Local);
        assert_eq!(StorageScope::default(), StorageScope::Session);
    }
}
