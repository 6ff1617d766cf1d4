//! Single-use impersonation tokens
//!
//! Raw tokens are minted by operator tooling; this service stores only the
//! SHA-256 hash and consumes tokens atomically: validation and
//! invalidation happen in one statement, so a token activates at most
//! once.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

/// Session key the activation payload is staged under for the downstream
/// authentication step.
pub const IMPERSONATION_SESSION_KEY: &str = "tenancy.impersonation";

/// Payload returned by a successful token consumption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub principal_id: Uuid,
    /// Name of the auth guard the downstream step should authenticate with
    pub auth_guard: String,
}

/// Token storage errors
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("database error")]
    Database,
}

/// Consumer of single-use impersonation tokens.
///
/// `Ok(None)` covers unknown, expired, and already-used tokens alike; the
/// middleware treats all of them as a no-op.
#[async_trait]
pub trait ImpersonationTokens: Send + Sync {
    async fn consume(&self, raw_token: &str) -> Result<Option<Activation>, TokenError>;
}

// =============================================================================
// Postgres adapter
// =============================================================================

/// Postgres-backed token consumer
pub struct PgImpersonationTokens {
    pool: PgPool,
}

impl PgImpersonationTokens {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Hash a token using SHA-256
    fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl ImpersonationTokens for PgImpersonationTokens {
    async fn consume(&self, raw_token: &str) -> Result<Option<Activation>, TokenError> {
        let token_hash = Self::hash_token(raw_token);

        #[derive(sqlx::FromRow)]
        struct ActivationRow {
            principal_id: Uuid,
            auth_guard: String,
        }

        // Validate-and-invalidate in one statement: the WHERE clause only
        // matches unused, unexpired tokens, so a second consume finds nothing
        let row: Option<ActivationRow> = sqlx::query_as(
            r#"
            UPDATE impersonation_tokens
            SET used_at = now()
            WHERE token_hash = $1
              AND used_at IS NULL
              AND expires_at > now()
            RETURNING principal_id, auth_guard
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "impersonation token consume failed");
            TokenError::Database
        })?;

        Ok(row.map(|row| Activation {
            principal_id: row.principal_id,
            auth_guard: row.auth_guard,
        }))
    }
}

// =============================================================================
// In-memory adapter (tests, single-node development)
// =============================================================================

/// In-memory token consumer
#[derive(Default)]
pub struct MemoryImpersonationTokens {
    tokens: Mutex<HashMap<String, Activation>>,
}

impl MemoryImpersonationTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, raw_token: &str, activation: Activation) {
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.insert(raw_token.to_string(), activation);
        }
    }
}

#[async_trait]
impl ImpersonationTokens for MemoryImpersonationTokens {
    async fn consume(&self, raw_token: &str) -> Result<Option<Activation>, TokenError> {
        Ok(self
            .tokens
            .lock()
            .ok()
            .and_then(|mut tokens| tokens.remove(raw_token)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_tokens_are_single_use() {
        let tokens = MemoryImpersonationTokens::new();
        let activation = Activation {
            principal_id: Uuid::new_v4(),
            auth_guard: "operator".to_string(),
        };
        tokens.insert("tok", activation.clone());

        assert_eq!(tokens.consume("tok").await.unwrap(), Some(activation));
        assert_eq!(tokens.consume("tok").await.unwrap(), None);
    }

    #[test]
    fn token_hash_is_stable() {
        assert_eq!(
            PgImpersonationTokens::hash_token("a"),
            PgImpersonationTokens::hash_token("a")
        );
        assert_ne!(
            PgImpersonationTokens::hash_token("a"),
            PgImpersonationTokens::hash_token("b")
        );
    }
}
