//! Token endpoint interactions
//!
//! Handles the two grants this client uses:
//! 1. Authorization code exchange (completion of the redirect flow)
//! 2. Token refresh (session resume and before API calls)
//!
//! Both POST a form-encoded body to the discovered `token_endpoint`. A 400
//! answer means the code or refresh token is no longer usable; it is
//! reported as `Ok(None)` so the session can treat it as expiry.

use std::fmt;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::{GRANT_AUTHORIZATION_CODE, GRANT_REFRESH_TOKEN};
use crate::discovery::Endpoint;
use crate::error::{Error, Result};
use crate::idp::OidcIdp;
use crate::json_api::json_api;

/// Token set issued by the token endpoint.
///
/// Only replaced wholesale: a refresh produces a new value via [`AuthToken::merge`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: String,
    /// Seconds until the access token expires (delta, not absolute)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

impl AuthToken {
    /// Overlay the fields present in `refreshed` onto this token.
    ///
    /// Refresh responses commonly omit fields that did not change (most
    /// providers do not rotate `refresh_token`); those keep their old value.
    pub fn merge(self, refreshed: TokenResponse) -> AuthToken {
        AuthToken {
            access_token: refreshed.access_token.unwrap_or(self.access_token),
            id_token: refreshed.id_token.or(self.id_token),
            refresh_token: refreshed.refresh_token.or(self.refresh_token),
            token_type: refreshed.token_type.unwrap_or(self.token_type),
            expires_in: refreshed.expires_in.or(self.expires_in),
        }
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("access_token", &"[REDACTED]")
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Raw token endpoint response. Every field may be absent on refresh.
#[derive(Default, Deserialize, Serialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TryFrom<TokenResponse> for AuthToken {
    type Error = Error;

    fn try_from(response: TokenResponse) -> Result<Self> {
        let access_token = response
            .access_token
            .ok_or_else(|| Error::InvalidResponse("token response without access_token".into()))?;
        let token_type = response
            .token_type
            .ok_or_else(|| Error::InvalidResponse("token response without token_type".into()))?;
        Ok(AuthToken {
            access_token,
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            token_type,
            expires_in: response.expires_in,
        })
    }
}

impl OidcIdp {
    /// POST to the token endpoint with `client_id` plus `params`.
    async fn issue_token(&self, params: &[(&str, &str)]) -> Result<Option<TokenResponse>> {
        let url = self.metadata().url(Endpoint::Token)?;
        debug!(endpoint = Endpoint::Token.name(), %url, "call oidc endpoint");

        let mut form = vec![("client_id", self.settings().client_id.as_str())];
        form.extend_from_slice(params);

        let response = self
            .http()
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Http(format!("token request failed: {e}")))?;

        json_api(response, &[StatusCode::BAD_REQUEST]).await
    }

    /// Exchange an authorization code for a token set.
    ///
    /// Returns `Ok(None)` when the token endpoint rejects the code with 400.
    pub async fn exchange_token(&self, code: &str) -> Result<Option<AuthToken>> {
        info!("exchange authorization code for token");
        let issued = self
            .issue_token(&[
                ("grant_type", GRANT_AUTHORIZATION_CODE),
                ("code", code),
                ("redirect_uri", self.settings().redirect_uri.as_str()),
            ])
            .await?;
        issued.map(AuthToken::try_from).transpose()
    }

    /// Refresh `token`, returning it merged with the refreshed fields.
    ///
    /// `Ok(None)` means the session is over: the refresh token was rejected
    /// with 400, or the token never carried one.
    pub async fn refresh_token(&self, token: &AuthToken) -> Result<Option<AuthToken>> {
        let Some(refresh) = token.refresh_token.as_deref() else {
            debug!("token has no refresh_token, cannot refresh");
            return Ok(None);
        };
        debug!(?token, "refresh token");

        match self
            .issue_token(&[("grant_type", GRANT_REFRESH_TOKEN), ("refresh_token", refresh)])
            .await?
        {
            Some(refreshed) => {
                debug!("token refreshed");
                Ok(Some(token.clone().merge(refreshed)))
            }
            None => {
                info!("token expired");
                Ok(None)
            }
        }
    }
}
