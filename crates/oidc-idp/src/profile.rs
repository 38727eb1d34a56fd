//! Provider-specific behavior
//!
//! Most providers follow OIDC RP-initiated logout. Some do not: Cognito's
//! `/logout` ignores `id_token_hint` and wants `logout_uri` instead. A
//! `ProviderProfile` is the one override point for such differences; the
//! rest of `OidcIdp` is shared.

use crate::idp::ClientSettings;
use crate::token::AuthToken;

/// Override point for provider-specific parameters.
pub trait ProviderProfile: Send + Sync {
    /// Identifier for logging (e.g. "oidc", "cognito")
    fn id(&self) -> &str;

    /// Query parameters appended to the end-session endpoint.
    fn sign_out_params(
        &self,
        settings: &ClientSettings,
        token: &AuthToken,
    ) -> Vec<(&'static str, String)>;
}

/// Standard OIDC RP-initiated logout.
pub struct GenericProfile;

impl ProviderProfile for GenericProfile {
    fn id(&self) -> &str {
        "oidc"
    }

    fn sign_out_params(
        &self,
        settings: &ClientSettings,
        token: &AuthToken,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![("client_id", settings.client_id.clone())];
        if let Some(id_token) = &token.id_token {
            params.push(("id_token_hint", id_token.clone()));
        }
        params.push(("post_logout_redirect_uri", settings.redirect_uri.clone()));
        params
    }
}

/// Amazon Cognito user pools.
pub struct CognitoProfile;

impl ProviderProfile for CognitoProfile {
    fn id(&self) -> &str {
        "cognito"
    }

    fn sign_out_params(
        &self,
        settings: &ClientSettings,
        _token: &AuthToken,
    ) -> Vec<(&'static str, String)> {
        vec![
            ("client_id", settings.client_id.clone()),
            ("logout_uri", settings.redirect_uri.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ClientSettings {
        ClientSettings {
            client_id: "spa-client".into(),
            redirect_uri: "https://spa.example.com".into(),
            scopes: "openid".into(),
        }
    }

    fn token(id_token: Option<&str>) -> AuthToken {
        AuthToken {
            access_token: "AT".into(),
            id_token: id_token.map(String::from),
            refresh_token: None,
            token_type: "Bearer".into(),
            expires_in: None,
        }
    }

    #[test]
    fn generic_sends_id_token_hint() {
        let params = GenericProfile.sign_out_params(&settings(), &token(Some("IT")));
        assert_eq!(
            params,
            vec![
                ("client_id", "spa-client".to_string()),
                ("id_token_hint", "IT".to_string()),
                ("post_logout_redirect_uri", "https://spa.example.com".to_string()),
            ]
        );
    }

    #[test]
    fn generic_without_id_token_omits_hint() {
        let params = GenericProfile.sign_out_params(&settings(), &token(None));
        assert!(params.iter().all(|(k, _)| *k != "id_token_hint"));
    }

    #[test]
    fn cognito_uses_logout_uri() {
        let params = CognitoProfile.sign_out_params(&settings(), &token(Some("IT")));
        assert_eq!(
            params,
            vec![
                ("client_id", "spa-client".to_string()),
                ("logout_uri", "https://spa.example.com".to_string()),
            ]
        );
    }
}
