//! Signed session tokens (HS256 JWT).
//!
//! Tokens are self-contained: `header.claims.signature`, each segment
//! base64url without padding. Verification is a pure function of the token,
//! the process-wide secret and the current time, so no session table exists
//! and a token stays valid until `exp`.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_ALG: &str = "HS256";
pub const TOKEN_TYP: &str = "JWT";
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;
/// Longest accepted token lifetime (one year).
pub const MAX_TOKEN_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: TOKEN_ALG.to_string(),
            typ: TOKEN_TYP.to_string(),
        }
    }
}

/// Identity carried by a token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("signing secret must not be empty")]
    EmptySecret,
    #[error("token ttl must be between one second and one year")]
    InvalidTtl,
    #[error("token expiry overflows")]
    ExpiryOverflow,
}

impl TokenError {
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Signing secret and lifetime used to mint and check tokens.
///
/// Built once at startup and shared read-only by every request.
#[derive(Debug)]
pub struct TokenKeys {
    secret: SecretString,
    ttl_seconds: i64,
}

impl TokenKeys {
    /// # Errors
    /// Returns an error if the secret is empty or the ttl is outside
    /// `1..=MAX_TOKEN_TTL_SECONDS`.
    pub fn new(secret: SecretString, ttl_seconds: i64) -> Result<Self, TokenError> {
        if secret.expose_secret().is_empty() {
            return Err(TokenError::EmptySecret);
        }
        if !(1..=MAX_TOKEN_TTL_SECONDS).contains(&ttl_seconds) {
            return Err(TokenError::InvalidTtl);
        }
        Ok(Self {
            secret,
            ttl_seconds,
        })
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| TokenError::EmptySecret)
    }

    /// Mint a token for `user_id`/`email`, issued at `now_unix_seconds`.
    ///
    /// # Errors
    /// Returns an error if the expiry does not fit in an `i64` or the header
    /// or claims cannot be encoded.
    pub fn issue(
        &self,
        user_id: Uuid,
        email: &str,
        now_unix_seconds: i64,
    ) -> Result<String, TokenError> {
        let exp = now_unix_seconds
            .checked_add(self.ttl_seconds)
            .ok_or(TokenError::ExpiryOverflow)?;
        let claims = Claims {
            user_id,
            email: email.to_string(),
            iat: now_unix_seconds,
            exp,
        };
        let header_b64 = b64e_json(&TokenHeader::hs256())?;
        let claims_b64 = b64e_json(&claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Check the signature and expiry of `token` and return its claims.
    ///
    /// # Errors
    /// Returns [`TokenError::Expired`] once `now_unix_seconds >= exp`, and
    /// another variant for any malformed or tampered token.
    pub fn verify(&self, token: &str, now_unix_seconds: i64) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let claims_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let sig_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        if parts.next().is_some() {
            return Err(TokenError::TokenFormat);
        }

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != TOKEN_ALG {
            return Err(TokenError::UnsupportedAlg(header.alg));
        }

        let signature =
            Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::Base64)?;
        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: Claims = b64d_json(claims_b64)?;
        if now_unix_seconds >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const T: i64 = 1_763_164_800;

    fn keys(secret: &str) -> TokenKeys {
        TokenKeys::new(SecretString::from(secret.to_string()), DEFAULT_TOKEN_TTL_SECONDS).unwrap()
    }

    #[test]
    fn token_has_three_segments() {
        let token = keys("secret").issue(Uuid::new_v4(), "a@x.com", T).unwrap();
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn verify_returns_issued_identity() {
        let keys = keys("secret");
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id, "a@x.com", T).unwrap();
        let claims = keys.verify(&token, T).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.iat, T);
        assert_eq!(claims.exp, T + 24 * 60 * 60);
    }

    #[test]
    fn accepted_after_one_hour_rejected_after_a_day() {
        let keys = keys("secret");
        let token = keys.issue(Uuid::new_v4(), "a@x.com", T).unwrap();
        assert!(keys.verify(&token, T + 60 * 60).is_ok());
        assert!(matches!(
            keys.verify(&token, T + 24 * 60 * 60 + 1),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn expired_exactly_at_exp() {
        let keys = keys("secret");
        let token = keys.issue(Uuid::new_v4(), "a@x.com", T).unwrap();
        assert!(keys.verify(&token, T + 24 * 60 * 60 - 1).is_ok());
        let err = keys.verify(&token, T + 24 * 60 * 60).unwrap_err();
        assert!(err.is_expired());
    }

    #[test]
    fn other_secret_is_invalid_signature() {
        let token = keys("secret-a").issue(Uuid::new_v4(), "a@x.com", T).unwrap();
        let err = keys("secret-b").verify(&token, T).unwrap_err();
        assert!(matches!(err, TokenError::InvalidSignature));
        assert!(!err.is_expired());
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let keys = keys("secret");
        let token = keys.issue(Uuid::new_v4(), "a@x.com", T).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = b64e_json(&Claims {
            user_id: Uuid::new_v4(),
            email: "mallory@x.com".to_string(),
            iat: T,
            exp: T + 10 * DEFAULT_TOKEN_TTL_SECONDS,
        })
        .unwrap();
        parts[1] = &forged;
        let forged_token = parts.join(".");
        assert!(matches!(
            keys.verify(&forged_token, T),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let keys = keys("secret");
        assert!(matches!(
            keys.verify("only.two", T),
            Err(TokenError::TokenFormat)
        ));
        assert!(matches!(
            keys.verify("a.b.c.d", T),
            Err(TokenError::TokenFormat)
        ));
        assert!(keys.verify("!!!.???.***", T).is_err());
        assert!(keys.verify("", T).is_err());
    }

    #[test]
    fn unsigned_alg_none_is_rejected() {
        let keys = keys("secret");
        let header = b64e_json(&TokenHeader {
            alg: "none".to_string(),
            typ: TOKEN_TYP.to_string(),
        })
        .unwrap();
        let claims = b64e_json(&Claims {
            user_id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            iat: T,
            exp: T + 60,
        })
        .unwrap();
        let token = format!("{header}.{claims}.");
        assert!(matches!(
            keys.verify(&token, T),
            Err(TokenError::UnsupportedAlg(alg)) if alg == "none"
        ));
    }

    #[test]
    fn claims_use_user_id_camel_case() {
        let claims = Claims {
            user_id: Uuid::nil(),
            email: "a@x.com".to_string(),
            iat: 1,
            exp: 2,
        };
        let value = serde_json::to_value(&claims).unwrap();
        assert!(value.get("userId").is_some());
        assert!(value.get("user_id").is_none());
    }

    #[test]
    fn empty_secret_and_bad_ttl_are_rejected() {
        assert!(matches!(
            TokenKeys::new(SecretString::from(String::new()), DEFAULT_TOKEN_TTL_SECONDS),
            Err(TokenError::EmptySecret)
        ));
        assert!(matches!(
            TokenKeys::new(SecretString::from("secret".to_string()), 0),
            Err(TokenError::InvalidTtl)
        ));
    }

    #[test]
    fn oversized_ttl_is_rejected() {
        let secret = || SecretString::from("secret".to_string());
        assert!(matches!(
            TokenKeys::new(secret(), i64::MAX),
            Err(TokenError::InvalidTtl)
        ));
        assert!(matches!(
            TokenKeys::new(secret(), MAX_TOKEN_TTL_SECONDS + 1),
            Err(TokenError::InvalidTtl)
        ));
        assert!(TokenKeys::new(secret(), MAX_TOKEN_TTL_SECONDS).is_ok());
    }

    #[test]
    fn expiry_overflow_is_an_error() {
        let keys = keys("secret");
        let result = keys.issue(Uuid::new_v4(), "a@x.com", i64::MAX - 10);
        assert!(matches!(result, Err(TokenError::ExpiryOverflow)));
    }
}
