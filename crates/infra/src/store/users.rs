use chrono::Utc;
use tracing::instrument;

use depot_auth::{Role, User, validate_username};
use depot_core::{DomainError, UserId};

use super::{Store, rows};
use crate::error::{StoreError, map_sqlx_error};

impl Store {
    /// Create a user. Usernames are unique among active users; a clash is
    /// reported as `Conflict` by the partial unique index.
    #[instrument(skip(self, password_hash), err)]
    pub async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, StoreError> {
        let username = validate_username(username)?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4) RETURNING id",
        )
        .bind(&username)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match map_sqlx_error("create_user", e) {
            StoreError::Domain(DomainError::Conflict(_)) => {
                DomainError::conflict(format!("username '{username}' already exists")).into()
            }
            other => other,
        })?;

        self.user(UserId::new(id))
            .await?
            .ok_or_else(|| StoreError::Storage("created user vanished".into()))
    }

    /// User by id, including soft-deleted ones.
    pub async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", rows::USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.as_ref().map(rows::user).transpose()
    }

    /// Active user by username.
    pub async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let sql = format!(
            "SELECT {} FROM users WHERE username = ?1 AND deleted_at IS NULL",
            rows::USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user_by_username", e))?;
        row.as_ref().map(rows::user).transpose()
    }

    /// Active users in creation order.
    pub async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!(
            "SELECT {} FROM users WHERE deleted_at IS NULL ORDER BY id",
            rows::USER_COLUMNS
        );
        let found = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        found.iter().map(rows::user).collect()
    }

    /// Change a user's role. The last active admin cannot be demoted; the
    /// guard lives in the UPDATE so two concurrent demotions cannot both pass.
    #[instrument(skip(self), err)]
    pub async fn set_user_role(&self, id: UserId, role: Role) -> Result<User, StoreError> {
        let result = sqlx::query(
            "UPDATE users SET role = ?1
             WHERE id = ?2 AND deleted_at IS NULL
               AND (?1 = 'admin' OR role <> 'admin'
                    OR (SELECT COUNT(*) FROM users WHERE role = 'admin' AND deleted_at IS NULL) > 1)",
        )
        .bind(role.as_str())
        .bind(id.get())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_user_role", e))?;
        if result.rows_affected() == 0 {
            return match self.user(id).await? {
                Some(user) if user.is_active() => {
                    Err(DomainError::conflict("cannot demote the last active admin").into())
                }
                _ => Err(DomainError::not_found("user").into()),
            };
        }
        self.user(id)
            .await?
            .ok_or_else(|| DomainError::not_found("user").into())
    }

    #[instrument(skip(self, password_hash), err)]
    pub async fn set_user_password(&self, id: UserId, password_hash: &str) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE users SET password_hash = ?1 WHERE id = ?2 AND deleted_at IS NULL")
                .bind(password_hash)
                .bind(id.get())
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("set_user_password", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("user").into());
        }
        Ok(())
    }

    /// Soft-delete `id` on behalf of `actor`. Users cannot delete themselves.
    #[instrument(skip(self), err)]
    pub async fn delete_user(&self, id: UserId, actor: UserId) -> Result<(), StoreError> {
        if id == actor {
            return Err(DomainError::validation("cannot delete yourself").into());
        }
        let result = sqlx::query("UPDATE users SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL")
            .bind(Utc::now())
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("user").into());
        }
        Ok(())
    }

    pub async fn count_active_admins(&self) -> Result<i64, StoreError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin' AND deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_active_admins", e))
    }
}
