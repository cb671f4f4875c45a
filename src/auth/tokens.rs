use chrono::{DateTime, Duration, Utc};
use data_encoding::BASE32_NOPAD;
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;

use crate::database::models::{Scope, TokenRecord, User};
use crate::database::{StoreError, TokenStore, UserStore};
use crate::validator::Validator;

/// Length of a plaintext token: 16 random bytes in unpadded base32.
pub const TOKEN_LEN: usize = 26;

const ENTROPY_BYTES: usize = 16;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is not 26 characters long")]
    Malformed,

    /// No stored token matches, or the match has expired.
    #[error("token not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to gather entropy: {0}")]
    Entropy(#[from] rand::Error),
}

/// A freshly issued token. This is the only place the plaintext ever exists
/// server-side; it serializes as `{"token": ..., "expiry": ...}`.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    #[serde(rename = "token")]
    pub plaintext: String,
    #[serde(skip)]
    pub hash: [u8; 32],
    #[serde(skip)]
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
    #[serde(skip)]
    pub scope: Scope,
}

impl Token {
    fn generate(user_id: i64, ttl: Duration, scope: Scope) -> Result<Self, TokenError> {
        let mut bytes = [0u8; ENTROPY_BYTES];
        OsRng.try_fill_bytes(&mut bytes)?;

        let plaintext = BASE32_NOPAD.encode(&bytes);
        Ok(Self {
            hash: hash_plaintext(&plaintext),
            plaintext,
            user_id,
            expiry: Utc::now() + ttl,
            scope,
        })
    }

    fn record(&self) -> TokenRecord {
        TokenRecord {
            hash: self.hash.to_vec(),
            user_id: self.user_id,
            expiry: self.expiry,
            scope: self.scope,
        }
    }
}

pub fn hash_plaintext(plaintext: &str) -> [u8; 32] {
    Sha256::digest(plaintext.as_bytes()).into()
}

/// Field checks for a token supplied in a request body.
pub fn validate_plaintext(v: &mut Validator, plaintext: &str) {
    v.check(!plaintext.is_empty(), "token", "must be provided");
    v.check(plaintext.len() == TOKEN_LEN, "token", "must be 26 bytes long");
}

/// Issues, resolves and revokes scoped bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    tokens: Arc<dyn TokenStore>,
    users: Arc<dyn UserStore>,
}

impl TokenService {
    pub fn new(tokens: Arc<dyn TokenStore>, users: Arc<dyn UserStore>) -> Self {
        Self { tokens, users }
    }

    pub async fn issue(&self, user_id: i64, ttl: Duration, scope: Scope) -> Result<Token, TokenError> {
        let token = Token::generate(user_id, ttl, scope)?;
        self.tokens.insert(&token.record()).await?;
        tracing::debug!(user_id, %scope, expiry = %token.expiry, "issued token");
        Ok(token)
    }

    /// The user a plaintext token belongs to. Missing, expired and
    /// wrong-scope tokens all come back as `NotFound`.
    pub async fn resolve(&self, plaintext: &str, scope: Scope) -> Result<User, TokenError> {
        if plaintext.len() != TOKEN_LEN {
            return Err(TokenError::Malformed);
        }

        let hash = hash_plaintext(plaintext);
        let record = self
            .tokens
            .find(&hash, scope)
            .await?
            .ok_or(TokenError::NotFound)?;

        if record.is_expired_at(Utc::now()) {
            return Err(TokenError::NotFound);
        }

        match self.users.get(record.user_id).await {
            Ok(user) => Ok(user),
            Err(StoreError::NotFound) => Err(TokenError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn revoke_all(&self, user_id: i64, scope: Scope) -> Result<(), TokenError> {
        self.tokens.delete_all_for_user(user_id, scope).await?;
        tracing::debug!(user_id, %scope, "revoked tokens");
        Ok(())
    }
}
