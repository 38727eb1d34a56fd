//! Identity provider client
//!
//! `OidcIdp` wraps one provider's discovered metadata and implements the
//! redirect, token, userinfo and sign-out operations. Provider differences
//! are injected through a [`ProviderProfile`].

use std::sync::Arc;

use reqwest::Url;
use tracing::{debug, info};

use crate::constants::RESPONSE_TYPE_CODE;
use crate::discovery::{Endpoint, OidcProviderMetadata};
use crate::error::{Error, Result};
use crate::json_api::json_api;
use crate::navigator::Navigator;
use crate::profile::{GenericProfile, ProviderProfile};
use crate::token::AuthToken;
use crate::user::{User, UserinfoClaims};

/// Registered client parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub client_id: String,
    /// Application base URL; used as redirect and post-logout target
    pub redirect_uri: String,
    /// Space-separated scopes requested at authorization
    pub scopes: String,
}

/// Client for one OIDC provider.
///
/// Metadata and settings are fixed at construction and only exposed by
/// shared reference.
pub struct OidcIdp {
    metadata: OidcProviderMetadata,
    settings: ClientSettings,
    http: reqwest::Client,
    navigator: Arc<dyn Navigator>,
    profile: Box<dyn ProviderProfile>,
}

impl OidcIdp {
    /// Create a client using the standard OIDC profile.
    pub fn new(
        metadata: OidcProviderMetadata,
        settings: ClientSettings,
        http: reqwest::Client,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            metadata,
            settings,
            http,
            navigator,
            profile: Box::new(GenericProfile),
        }
    }

    /// Replace the provider profile.
    pub fn with_profile(mut self, profile: Box<dyn ProviderProfile>) -> Self {
        self.profile = profile;
        self
    }

    pub fn metadata(&self) -> &OidcProviderMetadata {
        &self.metadata
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn profile_id(&self) -> &str {
        self.profile.id()
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Authorization endpoint URL for the code flow.
    pub fn authorization_url(&self) -> Result<Url> {
        let mut url = self.metadata.url(Endpoint::Authorization)?;
        url.query_pairs_mut()
            .append_pair("response_type", RESPONSE_TYPE_CODE)
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("redirect_uri", &self.settings.redirect_uri)
            .append_pair("scope", &self.settings.scopes);
        Ok(url)
    }

    /// Send the user agent to the authorization endpoint.
    ///
    /// Returns only if the redirect could not be built; otherwise the
    /// host navigates away.
    pub fn authenticate(&self) -> Result<()> {
        let url = self.authorization_url()?;
        info!(profile = self.profile.id(), "redirect to authorization endpoint");
        self.navigator.redirect(url);
        Ok(())
    }

    /// Fetch the signed-in user with `token`'s access token.
    pub async fn fetch_userinfo(&self, token: &AuthToken) -> Result<User> {
        let url = self.metadata.url(Endpoint::Userinfo)?;
        debug!(endpoint = Endpoint::Userinfo.name(), %url, "call oidc endpoint");

        let response = self
            .http
            .get(url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| Error::Http(format!("userinfo request failed: {e}")))?;

        let claims = json_api::<UserinfoClaims>(response, &[])
            .await?
            .ok_or_else(|| Error::InvalidResponse("userinfo response without data".into()))?;
        User::try_from(claims)
    }

    /// End-session URL with the profile's sign-out parameters.
    pub fn sign_out_url(&self, token: &AuthToken) -> Result<Url> {
        let mut url = self.metadata.url(Endpoint::EndSession)?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in self.profile.sign_out_params(&self.settings, token) {
                query.append_pair(key, &value);
            }
        }
        Ok(url)
    }

    /// Send the user agent to the end-session endpoint.
    pub fn sign_out(&self, token: &AuthToken) -> Result<()> {
        let url = self.sign_out_url(token)?;
        info!(profile = self.profile.id(), "redirect to end-session endpoint");
        self.navigator.redirect(url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigator::MemoryNavigator;
    use crate::profile::CognitoProfile;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    async fn serve(router: axum::Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn settings() -> ClientSettings {
        ClientSettings {
            client_id: "spa-client".into(),
            redirect_uri: "https://spa.example.com".into(),
            scopes: "openid email".into(),
        }
    }

    fn metadata(base: &str) -> OidcProviderMetadata {
        OidcProviderMetadata::new(
            format!("{base}/authorize"),
            format!("{base}/token"),
            format!("{base}/userinfo"),
            Some(format!("{base}/revoke")),
            Some(format!("{base}/logout")),
        )
    }

    fn idp(base: &str) -> (OidcIdp, Arc<MemoryNavigator>) {
        let nav = Arc::new(MemoryNavigator::new(
            Url::parse("https://spa.example.com/orders").unwrap(),
        ));
        let idp = OidcIdp::new(metadata(base), settings(), reqwest::Client::new(), nav.clone());
        (idp, nav)
    }

    fn token() -> AuthToken {
        AuthToken {
            access_token: "AT".into(),
            id_token: Some("IT".into()),
            refresh_token: Some("RT".into()),
            token_type: "Bearer".into(),
            expires_in: Some(3600),
        }
    }

    /// Token endpoint: accepts code "abc123" and refresh token "RT",
    /// answers 400 for anything else.
    async fn token_endpoint(
        axum::Form(form): axum::Form<HashMap<String, String>>,
    ) -> (StatusCode, axum::Json<serde_json::Value>) {
        assert_eq!(form.get("client_id").map(String::as_str), Some("spa-client"));
        match form.get("grant_type").map(String::as_str) {
            Some("authorization_code") if form.get("code").map(String::as_str) == Some("abc123") => {
                assert_eq!(
                    form.get("redirect_uri").map(String::as_str),
                    Some("https://spa.example.com")
                );
                (
                    StatusCode::OK,
                    axum::Json(serde_json::json!({
                        "access_token": "AT",
                        "refresh_token": "RT",
                        "id_token": "IT",
                        "token_type": "Bearer",
                        "expires_in": 3600
                    })),
                )
            }
            Some("refresh_token") if form.get("refresh_token").map(String::as_str) == Some("RT") => (
                StatusCode::OK,
                axum::Json(serde_json::json!({
                    "access_token": "AT2",
                    "token_type": "Bearer",
                    "expires_in": 1800
                })),
            ),
            _ => (
                StatusCode::BAD_REQUEST,
                axum::Json(serde_json::json!({"error": "invalid_grant"})),
            ),
        }
    }

    async fn userinfo_endpoint(headers: HeaderMap) -> (StatusCode, axum::Json<serde_json::Value>) {
        match headers.get("authorization").and_then(|v| v.to_str().ok()) {
            Some("Bearer AT") => (
                StatusCode::OK,
                axum::Json(serde_json::json!({"sub": "u1", "email": "u1@x.com"})),
            ),
            _ => (
                StatusCode::UNAUTHORIZED,
                axum::Json(serde_json::json!({"error": "invalid_token"})),
            ),
        }
    }

    async fn mock_idp() -> String {
        serve(
            axum::Router::new()
                .route("/token", post(token_endpoint))
                .route("/userinfo", get(userinfo_endpoint)),
        )
        .await
    }

    #[test]
    fn authorization_url_contains_required_params() {
        let (idp, _) = idp("https://idp.example.com");
        let url = idp.authorization_url().unwrap();
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert!(url.as_str().starts_with("https://idp.example.com/authorize?"));
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "spa-client");
        assert_eq!(params["redirect_uri"], "https://spa.example.com");
        assert_eq!(params["scope"], "openid email");
    }

    #[test]
    fn authenticate_redirects_user_agent() {
        let (idp, nav) = idp("https://idp.example.com");
        idp.authenticate().unwrap();
        let redirects = nav.redirects();
        assert_eq!(redirects.len(), 1);
        assert_eq!(redirects[0].path(), "/authorize");
    }

    #[test]
    fn authenticate_without_endpoint_fails_without_redirect() {
        let nav = Arc::new(MemoryNavigator::new(
            Url::parse("https://spa.example.com/").unwrap(),
        ));
        let metadata: OidcProviderMetadata = serde_json::from_str("{}").unwrap();
        let idp = OidcIdp::new(metadata, settings(), reqwest::Client::new(), nav.clone());

        assert!(matches!(idp.authenticate(), Err(Error::Config(_))));
        assert!(nav.redirects().is_empty());
    }

    #[tokio::test]
    async fn exchange_token_returns_token() {
        let base = mock_idp().await;
        let (idp, _) = idp(&base);
        let exchanged = idp.exchange_token("abc123").await.unwrap();
        assert_eq!(exchanged, Some(token()));
    }

    #[tokio::test]
    async fn exchange_token_bad_request_is_absent() {
        let base = mock_idp().await;
        let (idp, _) = idp(&base);
        assert_eq!(idp.exchange_token("stale").await.unwrap(), None);
    }

    #[tokio::test]
    async fn exchange_token_server_error_propagates() {
        let base = serve(axum::Router::new().route(
            "/token",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(serde_json::json!({"error": "server_error"})),
                )
            }),
        ))
        .await;
        let (idp, _) = idp(&base);
        let result = idp.exchange_token("abc123").await;
        assert!(matches!(result, Err(Error::Api { status: 500 })));
    }

    #[tokio::test]
    async fn refresh_token_merges_partial_response() {
        let base = mock_idp().await;
        let (idp, _) = idp(&base);
        let refreshed = idp.refresh_token(&token()).await.unwrap().unwrap();

        assert_eq!(refreshed.access_token, "AT2");
        assert_eq!(refreshed.expires_in, Some(1800));
        // Fields the IdP did not return keep their previous values
        assert_eq!(refreshed.refresh_token.as_deref(), Some("RT"));
        assert_eq!(refreshed.id_token.as_deref(), Some("IT"));
    }

    #[tokio::test]
    async fn refresh_token_bad_request_is_expiry() {
        let base = mock_idp().await;
        let (idp, _) = idp(&base);
        let stale = AuthToken {
            refresh_token: Some("revoked".into()),
            ..token()
        };
        assert_eq!(idp.refresh_token(&stale).await.unwrap(), None);
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_is_expiry() {
        let (idp, _) = idp("http://127.0.0.1:9");
        let token = AuthToken {
            refresh_token: None,
            ..token()
        };
        assert_eq!(idp.refresh_token(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn fetch_userinfo_maps_sub_to_username() {
        let base = mock_idp().await;
        let (idp, _) = idp(&base);
        let user = idp.fetch_userinfo(&token()).await.unwrap();
        assert_eq!(user.username(), "u1");
        assert_eq!(user.email(), Some("u1@x.com"));
    }

    #[tokio::test]
    async fn fetch_userinfo_rejected_token_is_api_error() {
        let base = mock_idp().await;
        let (idp, _) = idp(&base);
        let bad = AuthToken {
            access_token: "nope".into(),
            ..token()
        };
        assert!(matches!(
            idp.fetch_userinfo(&bad).await,
            Err(Error::Api { status: 401 })
        ));
    }

    #[test]
    fn sign_out_redirects_with_id_token_hint() {
        let (idp, nav) = idp("https://idp.example.com");
        idp.sign_out(&token()).unwrap();

        let url = nav.redirects().pop().unwrap();
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(url.path(), "/logout");
        assert_eq!(params["client_id"], "spa-client");
        assert_eq!(params["id_token_hint"], "IT");
        assert_eq!(params["post_logout_redirect_uri"], "https://spa.example.com");
    }

    #[test]
    fn cognito_sign_out_uses_logout_uri() {
        let (idp, nav) = idp("https://idp.example.com");
        let idp = idp.with_profile(Box::new(CognitoProfile));
        assert_eq!(idp.profile_id(), "cognito");
        idp.sign_out(&token()).unwrap();

        let url = nav.redirects().pop().unwrap();
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["logout_uri"], "https://spa.example.com");
        assert!(!params.contains_key("id_token_hint"));
        assert!(!params.contains_key("post_logout_redirect_uri"));
    }
}
