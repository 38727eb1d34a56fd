//! OIDC discovery
//!
//! Fetches the provider's `.well-known/openid-configuration` document and
//! keeps the five endpoints this client uses. The metadata is read-only
//! after discovery: fields are private and only exposed by shared reference.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::json_api::json_api;

/// Endpoints advertised by an OIDC provider.
///
/// Each field is optional at parse time; a missing endpoint only becomes an
/// error when an operation needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcProviderMetadata {
    #[serde(default)]
    authorization_endpoint: Option<String>,
    #[serde(default)]
    token_endpoint: Option<String>,
    #[serde(default)]
    userinfo_endpoint: Option<String>,
    #[serde(default)]
    revocation_endpoint: Option<String>,
    #[serde(default)]
    end_session_endpoint: Option<String>,
}

/// The endpoints an `OidcIdp` may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Authorization,
    Token,
    Userinfo,
    Revocation,
    EndSession,
}

impl Endpoint {
    /// Metadata key of this endpoint.
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::Authorization => "authorization_endpoint",
            Endpoint::Token => "token_endpoint",
            Endpoint::Userinfo => "userinfo_endpoint",
            Endpoint::Revocation => "revocation_endpoint",
            Endpoint::EndSession => "end_session_endpoint",
        }
    }
}

impl OidcProviderMetadata {
    /// Build metadata from explicit endpoint URLs.
    pub fn new(
        authorization_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
        userinfo_endpoint: impl Into<String>,
        revocation_endpoint: Option<String>,
        end_session_endpoint: Option<String>,
    ) -> Self {
        Self {
            authorization_endpoint: Some(authorization_endpoint.into()),
            token_endpoint: Some(token_endpoint.into()),
            userinfo_endpoint: Some(userinfo_endpoint.into()),
            revocation_endpoint,
            end_session_endpoint,
        }
    }

    /// Raw value advertised for `endpoint`, untransformed.
    pub fn get(&self, endpoint: Endpoint) -> Option<&str> {
        match endpoint {
            Endpoint::Authorization => self.authorization_endpoint.as_deref(),
            Endpoint::Token => self.token_endpoint.as_deref(),
            Endpoint::Userinfo => self.userinfo_endpoint.as_deref(),
            Endpoint::Revocation => self.revocation_endpoint.as_deref(),
            Endpoint::EndSession => self.end_session_endpoint.as_deref(),
        }
    }

    /// Parsed URL of `endpoint`.
    ///
    /// Fails with `Error::Config` if the provider did not advertise the
    /// endpoint or the value is not an absolute URL.
    pub fn url(&self, endpoint: Endpoint) -> Result<Url> {
        let raw = self.get(endpoint).ok_or_else(|| {
            error!(endpoint = endpoint.name(), "endpoint missing from provider metadata");
            Error::Config(format!("invalid endpoint type. {}", endpoint.name()))
        })?;
        Url::parse(raw).map_err(|e| {
            error!(endpoint = endpoint.name(), error = %e, "endpoint is not a URL");
            Error::Config(format!("invalid endpoint url for {}: {e}", endpoint.name()))
        })
    }
}

/// Fetch and parse the discovery document at `url`.
///
/// Any transport failure, non-2xx status, or non-JSON answer is a
/// configuration error: without metadata no session can be built.
pub async fn discovery(client: &reqwest::Client, url: &str) -> Result<OidcProviderMetadata> {
    info!(url, "fetch well-known openid-configuration");
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::Config(format!("discovery request failed: {e}")))?;

    let metadata = json_api::<OidcProviderMetadata>(response, &[])
        .await
        .map_err(|e| Error::Config(format!("discovery document unusable: {e}")))?
        .ok_or_else(|| Error::Config("discovery document is empty".into()))?;
    debug!(?metadata, "oidc configuration");
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use tokio::net::TcpListener;

    async fn serve(router: axum::Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn discovery_returns_endpoints_untransformed() {
        let router = axum::Router::new().route(
            "/.well-known/openid-configuration",
            get(|| async {
                axum::Json(serde_json::json!({
                    "issuer": "https://idp.example.com",
                    "authorization_endpoint": "https://idp.example.com/authorize",
                    "token_endpoint": "https://idp.example.com/token",
                    "userinfo_endpoint": "https://idp.example.com/userinfo",
                    "revocation_endpoint": "https://idp.example.com/revoke",
                    "end_session_endpoint": "https://idp.example.com/logout?x=1",
                    "scopes_supported": ["openid"]
                }))
            }),
        );
        let base = serve(router).await;

        let metadata = discovery(
            &reqwest::Client::new(),
            &format!("{base}/.well-known/openid-configuration"),
        )
        .await
        .unwrap();

        assert_eq!(
            metadata.get(Endpoint::Authorization),
            Some("https://idp.example.com/authorize")
        );
        assert_eq!(metadata.get(Endpoint::Token), Some("https://idp.example.com/token"));
        assert_eq!(
            metadata.get(Endpoint::Userinfo),
            Some("https://idp.example.com/userinfo")
        );
        assert_eq!(
            metadata.get(Endpoint::Revocation),
            Some("https://idp.example.com/revoke")
        );
        assert_eq!(
            metadata.get(Endpoint::EndSession),
            Some("https://idp.example.com/logout?x=1")
        );

        // Only the five endpoint fields survive a round trip through the type
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn non_json_document_is_config_error() {
        let router = axum::Router::new().route(
            "/.well-known/openid-configuration",
            get(|| async { "not a discovery document" }),
        );
        let base = serve(router).await;

        let result = discovery(
            &reqwest::Client::new(),
            &format!("{base}/.well-known/openid-configuration"),
        )
        .await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn empty_document_is_config_error() {
        let router = axum::Router::new().route(
            "/.well-known/openid-configuration",
            get(|| async {
                axum::response::Response::builder()
                    .header(axum::http::header::CONTENT_TYPE, "application/json")
                    .header(axum::http::header::CONTENT_LENGTH, "0")
                    .body(axum::body::Body::empty())
                    .unwrap()
            }),
        );
        let base = serve(router).await;

        let result = discovery(
            &reqwest::Client::new(),
            &format!("{base}/.well-known/openid-configuration"),
        )
        .await;
        match result {
            Err(Error::Config(message)) => assert!(message.contains("empty"), "got: {message}"),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_provider_is_config_error() {
        // Port 9 (discard) on loopback is not listening in test environments
        let result = discovery(&reqwest::Client::new(), "http://127.0.0.1:9/.well-known").await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn missing_endpoint_is_config_error() {
        let metadata: OidcProviderMetadata = serde_json::from_str(
            r#"{"authorization_endpoint":"https://idp.example.com/authorize"}"#,
        )
        .unwrap();
        let err = metadata.url(Endpoint::EndSession).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("end_session_endpoint"));
    }

    #[test]
    fn relative_endpoint_is_config_error() {
        let metadata = OidcProviderMetadata::new("/authorize", "/token", "/userinfo", None, None);
        assert!(matches!(
            metadata.url(Endpoint::Token),
            Err(Error::Config(_))
        ));
    }
}
