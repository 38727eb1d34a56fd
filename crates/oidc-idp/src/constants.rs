//! OAuth2 / OIDC protocol constants

/// `response_type` for the authorization-code flow
pub const RESPONSE_TYPE_CODE: &str = "code";

/// Grant type for exchanging an authorization code
pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";

/// Grant type for refreshing an access token
pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";
