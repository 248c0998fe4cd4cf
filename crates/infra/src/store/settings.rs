use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::instrument;

use super::Store;
use crate::error::{StoreError, map_sqlx_error};

const JWT_SECRET_KEY: &str = "jwt_secret";

impl Store {
    /// The persisted token-signing secret, generated on first use.
    ///
    /// Insert-if-absent followed by a read makes concurrent first starts agree
    /// on one value.
    #[instrument(skip(self), err)]
    pub async fn jwt_secret(&self) -> Result<String, StoreError> {
        let mut buf = [0u8; 32];
        OsRng.fill_bytes(&mut buf);
        let candidate = hex::encode(buf);

        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)")
            .bind(JWT_SECRET_KEY)
            .bind(&candidate)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("store_jwt_secret", e))?;

        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
            .bind(JWT_SECRET_KEY)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("read_jwt_secret", e))
    }

    /// Add a token id to the revocation list and prune entries whose tokens
    /// have expired anyway.
    #[instrument(skip(self), err)]
    pub async fn revoke_token(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("INSERT OR IGNORE INTO revoked_tokens (jti, expires_at) VALUES (?1, ?2)")
            .bind(jti)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("revoke_token", e))?;

        let pruned = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < ?1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await;
        if let Err(e) = pruned {
            tracing::warn!(error = %e, "failed to prune expired revocations");
        }
        Ok(())
    }

    pub async fn is_token_revoked(&self, jti: &str) -> Result<bool, StoreError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM revoked_tokens WHERE jti = ?1)")
            .bind(jti)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("is_token_revoked", e))
    }
}
