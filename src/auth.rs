//! Token verification at the gateway boundary
//!
//! The core never sees tokens; the gateway resolves a submitted token to a
//! principal before calling into the feed service, and the principal's
//! username becomes the message author.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{Result, RoomcastError};

/// The identity a verified token resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
}

/// Verifies a submitted credential and resolves it to a principal
pub trait AuthVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Principal>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    username: String,
    /// Expiration time (as UTC timestamp)
    exp: usize,
}

/// HS256 JWT verifier
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }
}

impl AuthVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<Principal> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| RoomcastError::AuthError(format!("Invalid token: {}", e)))?;
        Ok(Principal {
            username: data.claims.username,
        })
    }
}

/// Mint an HS256 token for `username`, valid for `ttl`.
///
/// Used by the boundary that issues session tokens, and by tests.
pub fn issue_token(secret: &str, username: &str, ttl: Duration) -> Result<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| RoomcastError::AuthError(format!("System clock error: {}", e)))?
        .as_secs() as usize;

    let claims = Claims {
        username: username.to_string(),
        exp: now + ttl.as_secs() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| RoomcastError::AuthError(format!("Failed to generate token: {}", e)))
}
