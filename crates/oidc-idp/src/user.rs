//! Authenticated user projection of the userinfo response

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The signed-in user.
///
/// Immutable; a new value replaces the old one on each completed login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

impl User {
    pub fn new(username: impl Into<String>, email: Option<String>) -> Self {
        Self {
            username: username.into(),
            email,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

/// Claims read from the userinfo endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct UserinfoClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl TryFrom<UserinfoClaims> for User {
    type Error = Error;

    /// `username` falls back to the `sub` claim.
    fn try_from(claims: UserinfoClaims) -> Result<Self> {
        let username = claims
            .username
            .filter(|u| !u.is_empty())
            .or(claims.sub)
            .ok_or_else(|| Error::InvalidResponse("userinfo without username or sub".into()))?;
        Ok(User::new(username, claims.email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(json: &str) -> UserinfoClaims {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn username_falls_back_to_sub() {
        let user = User::try_from(claims(r#"{"sub":"u1","email":"u1@x.com"}"#)).unwrap();
        assert_eq!(user.username(), "u1");
        assert_eq!(user.email(), Some("u1@x.com"));
    }

    #[test]
    fn username_claim_wins_over_sub() {
        let user = User::try_from(claims(r#"{"sub":"8f2c","username":"alice"}"#)).unwrap();
        assert_eq!(user.username(), "alice");
        assert_eq!(user.email(), None);
    }

    #[test]
    fn missing_identity_is_invalid() {
        let result = User::try_from(claims(r#"{"email":"nobody@x.com"}"#));
        assert!(matches!(result, Err(Error::InvalidResponse(_))));
    }
}
