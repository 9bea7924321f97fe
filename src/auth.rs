//! Password hashing and bearer-token issuance.
//!
//! Argon2id for credentials at rest, HS256 tokens for sessions. Constructed
//! once at startup from [`AuthConfig`] and shared behind the app state.

use std::time::{SystemTime, UNIX_EPOCH};

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tokio::task;

use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::validation;

/// `iss` claim pinned on every token we mint.
pub const TOKEN_ISSUER: &str = "podlog";
/// `aud` claim pinned on every token we mint.
pub const TOKEN_AUDIENCE: &str = "podlog-session";

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the user id, stored as a string.
    pub sub: String,
    /// Username at issuance time, for log lines and display.
    pub username: String,
    pub iss: String,
    pub aud: String,
    /// Issued-at as Unix timestamp.
    pub iat: usize,
    /// Expiration as Unix timestamp.
    pub exp: usize,
    /// Hard ceiling no refresh may extend past. Fixed at first issuance so a
    /// stolen token cannot be kept alive forever by refreshing it.
    pub ceil: usize,
}

impl Claims {
    /// The user id from the `sub` claim. A non-numeric subject means the
    /// token was not minted by us.
    pub fn user_id(&self) -> Result<i32> {
        self.sub.parse().map_err(|_| Error::Unauthenticated)
    }
}

/// Hashes passwords and mints/verifies session tokens.
pub struct CredentialService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    params: Params,
    session_ttl_secs: usize,
    remember_ttl_secs: usize,
}

impl CredentialService {
    pub fn new(config: &AuthConfig) -> anyhow::Result<Self> {
        if config.token_secret.len() < 32 {
            anyhow::bail!("auth.token_secret must be at least 32 bytes");
        }

        let params = Params::new(
            config.argon2_memory_cost_kib,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

        // HS256 with issuer and audience pinned; exp is checked by default.
        let mut validation = Validation::default();
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_audience(&[TOKEN_AUDIENCE]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.token_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.token_secret.as_bytes()),
            validation,
            params,
            session_ttl_secs: config.session_ttl_minutes as usize * 60,
            remember_ttl_secs: config.remember_ttl_days as usize * 24 * 60 * 60,
        })
    }

    /// Hash a password with Argon2id using the configured cost params.
    ///
    /// Note: This uses `spawn_blocking` because Argon2 hashing is
    /// CPU-intensive and would block the async runtime if run directly.
    pub async fn hash_password(&self, password: &str) -> Result<String> {
        validation::validate_password(password)?;

        let password = password.to_string();
        let params = self.params.clone();

        task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| Error::Storage(format!("password hashing failed: {e}")))
        })
        .await
        .map_err(|e| Error::Storage(format!("password hashing task panicked: {e}")))?
    }

    /// Check a password against a stored hash.
    ///
    /// A hash that does not parse counts as a failed match, not an error;
    /// callers must not be able to distinguish the two.
    pub async fn verify_password(&self, password: &str, password_hash: &str) -> Result<bool> {
        let password = password.to_string();
        let password_hash = password_hash.to_string();

        task::spawn_blocking(move || {
            let Ok(parsed_hash) = PasswordHash::new(&password_hash) else {
                return false;
            };
            // Cost params come from the hash string itself, so older hashes
            // keep verifying after a config change.
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok()
        })
        .await
        .map_err(|e| Error::Storage(format!("password verification task panicked: {e}")))
    }

    /// Mint a token for a freshly authenticated user.
    ///
    /// `remember` picks the long TTL for the first expiry; either way the
    /// refresh ceiling is set `remember_ttl` from now.
    pub fn issue_token(&self, user_id: i32, username: &str, remember: bool) -> Result<String> {
        let now = unix_now();
        let ttl = if remember {
            self.remember_ttl_secs
        } else {
            self.session_ttl_secs
        };

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
            iat: now,
            exp: now + ttl,
            ceil: now + self.remember_ttl_secs,
        };
        self.sign(&claims)
    }

    /// Decode and validate a token. Any failure, from a bad signature to an
    /// expired or foreign token, collapses into [`Error::Unauthenticated`].
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| Error::Unauthenticated)
    }

    /// Re-issue a token with a fresh session expiry, capped at the ceiling
    /// fixed when the session began. Once the ceiling has passed the session
    /// cannot be extended and the user must log in again.
    pub fn refresh_token(&self, claims: &Claims) -> Result<String> {
        let now = unix_now();
        let exp = (now + self.session_ttl_secs).min(claims.ceil);
        if exp <= now {
            return Err(Error::Unauthenticated);
        }

        let refreshed = Claims {
            iat: now,
            exp,
            ..claims.clone()
        };
        self.sign(&refreshed)
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| Error::Storage(format!("token signing failed: {e}")))
    }
}

fn unix_now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or(0)
}
