//! OpenID Connect identity provider client
//!
//! Provides discovery, the authorization-code redirect, token exchange and
//! refresh, userinfo, and sign-out for a single OIDC provider. Browser-side
//! effects (navigation) go through the [`Navigator`] trait so the same
//! client runs in a tab, a terminal, or a test.
//!
//! Flow:
//! 1. `discovery()` fetches the provider's endpoint metadata
//! 2. `OidcIdp::authenticate()` redirects to the authorization endpoint
//! 3. On return, `OidcIdp::exchange_token()` trades the `code` for an `AuthToken`
//! 4. `OidcIdp::fetch_userinfo()` resolves the `User`
//! 5. `OidcIdp::refresh_token()` renews the token; `Ok(None)` means expired
//! 6. `OidcIdp::sign_out()` redirects to the end-session endpoint

pub mod constants;
pub mod discovery;
pub mod error;
pub mod idp;
pub mod json_api;
pub mod navigator;
pub mod profile;
pub mod token;
pub mod user;

pub use discovery::{Endpoint, OidcProviderMetadata, discovery};
pub use error::{Error, Result};
pub use idp::{ClientSettings, OidcIdp};
pub use json_api::json_api;
pub use navigator::{MemoryNavigator, Navigator};
pub use profile::{CognitoProfile, GenericProfile, ProviderProfile};
pub use reqwest::Url;
pub use token::{AuthToken, TokenResponse};
pub use user::User;
