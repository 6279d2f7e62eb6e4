//! Signed bearer tokens (HS256 JWT).
//!
//! Claims are kept minimal: subject, derived roles, purpose, issue/expiry
//! times and the account's token version. Nothing from the stored user row
//! beyond that ever goes into a token.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;
use crate::models::enums::Role;

pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Session,
    Confirm,
    Reset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub roles: Vec<Role>,
    pub purpose: TokenPurpose,
    pub iat: i64,
    pub exp: i64,
    /// `users.token_version` at issue time.
    pub ver: i64,
}

pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &[u8]) -> Self {
        Self::with_ttl(secret, Duration::hours(TOKEN_TTL_HOURS))
    }

    pub fn with_ttl(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn issue(
        &self,
        user_id: Uuid,
        roles: Vec<Role>,
        purpose: TokenPurpose,
        version: i64,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            roles,
            purpose,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            ver: version,
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Check signature, expiry and purpose.
    pub fn verify(&self, token: &str, purpose: TokenPurpose) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            AuthError::InvalidToken
        })?;
        if data.claims.purpose != purpose {
            return Err(AuthError::WrongPurpose);
        }
        Ok(data.claims)
    }
}
