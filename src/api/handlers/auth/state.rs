//! Auth configuration and the shared state handlers read it from.

use chrono::Utc;
use secrecy::SecretString;

use crate::auth::{TokenError, TokenKeys, DEFAULT_TOKEN_TTL_SECONDS};
use crate::store::User;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    token_ttl_seconds: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }
}

/// Signing keys built from [`AuthConfig`], shared behind an `Arc` extension.
#[derive(Debug)]
pub struct AuthState {
    keys: TokenKeys,
}

impl AuthState {
    /// # Errors
    /// Returns an error if the secret is empty or the configured TTL is out of range.
    pub fn new(config: AuthConfig, secret: SecretString) -> Result<Self, TokenError> {
        let keys = TokenKeys::new(secret, config.token_ttl_seconds())?;
        Ok(Self { keys })
    }

    #[must_use]
    pub fn keys(&self) -> &TokenKeys {
        &self.keys
    }

    /// Issue a session token for `user` valid from now.
    ///
    /// # Errors
    /// Returns an error if the claims cannot be encoded.
    pub fn issue_for(&self, user: &User) -> Result<String, TokenError> {
        self.keys
            .issue(user.id, &user.email, Utc::now().timestamp())
    }
}
