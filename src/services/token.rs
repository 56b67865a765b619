//! Bearer token codec
//!
//! Tokens are HS256 JWTs signed with the server secret. `exp` is carried in
//! Unix milliseconds, so the library's own expiry check is off and
//! [`TokenCodec::decode_at`] compares it instead.

use chrono::{Duration, Utc};
use data_encoding::BASE64URL_NOPAD;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::User;

/// Identity asserted by a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub user_id: i64,
    pub email: String,
    pub is_admin: bool,
    /// Expiry as Unix milliseconds
    pub exp: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid token")]
    Invalid,

    #[error("Token expired")]
    Expired,

    #[error("Failed to encode token: {0}")]
    Encoding(String),
}

/// Issues and verifies signed bearer tokens.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &"[redacted]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenCodec {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        let secret = secret.as_ref();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Issue a token for `user`, expiring one TTL from now.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        let claims = TokenClaims {
            user_id: user.id,
            email: user.email.clone(),
            is_admin: user.is_admin,
            exp: (Utc::now() + self.ttl).timestamp_millis(),
        };
        self.encode(&claims)
    }

    /// Sign and encode arbitrary claims.
    pub fn encode(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify and decode a token against the current time.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.decode_at(token, Utc::now().timestamp_millis())
    }

    /// Verify and decode a token, treating `now_ms` as the current time.
    pub fn decode_at(&self, token: &str, now_ms: i64) -> Result<TokenClaims, TokenError> {
        let claims = decode::<TokenClaims>(token.trim(), &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::Invalid)?;

        if claims.exp < now_ms {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

/// Generate a random 32-byte secret, base64url encoded.
pub fn generate_secret() -> String {
    use argon2::password_hash::rand_core::{OsRng, RngCore};

    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    BASE64URL_NOPAD.encode(&bytes)
}
