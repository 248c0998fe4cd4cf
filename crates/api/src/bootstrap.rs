//! Startup wiring shared by the binary and the black-box tests.

use std::sync::Arc;

use anyhow::Context;

use depot_auth::{Hs256JwtValidator, Role, generate_password, hash_password, validate_password};
use depot_infra::Store;

use crate::app::AppServices;
use crate::config::ApiConfig;

/// Length of the password generated for a bootstrapped admin.
const GENERATED_PASSWORD_LEN: usize = 16;

/// Resolve the signing key, make sure an admin exists and assemble the
/// shared services for `build_app`.
pub async fn prepare(store: Store, config: &ApiConfig) -> anyhow::Result<Arc<AppServices>> {
    let secret = match &config.jwt_secret {
        Some(secret) => secret.clone(),
        None => {
            tracing::info!("JWT_SECRET not set; using the key stored in the database");
            store
                .jwt_secret()
                .await
                .context("failed to load persisted jwt secret")?
        }
    };

    ensure_admin(&store, config).await?;

    let jwt = Arc::new(Hs256JwtValidator::new(secret));
    Ok(Arc::new(AppServices::new(store, jwt, config.op_timeout)))
}

/// Create the initial admin account when no active admin exists.
pub async fn ensure_admin(store: &Store, config: &ApiConfig) -> anyhow::Result<()> {
    let admins = store
        .count_active_admins()
        .await
        .context("failed to count admins")?;
    if admins > 0 {
        return Ok(());
    }

    // The configured admin name may still belong to an active, demoted account.
    let existing = store
        .user_by_username(&config.admin_user)
        .await
        .context("failed to look up admin user")?;
    if let Some(user) = existing {
        store
            .set_user_role(user.id, Role::Admin)
            .await
            .with_context(|| format!("failed to promote '{}' to admin", user.username))?;
        tracing::warn!(username = %user.username, "no active admin; promoted existing user to admin");
        return Ok(());
    }

    let (password, generated) = match &config.admin_password {
        Some(password) => (password.clone(), false),
        None => (generate_password(GENERATED_PASSWORD_LEN), true),
    };
    validate_password(&password).context("DEPOT_ADMIN_PASSWORD is too weak")?;
    let hash = hash_password(&password).context("failed to hash admin password")?;

    let admin = store
        .create_user(&config.admin_user, &hash, Role::Admin)
        .await
        .with_context(|| format!("failed to create admin user '{}'", config.admin_user))?;

    if generated {
        tracing::warn!(
            username = %admin.username,
            password = %password,
            "created initial admin user; change this password after first login"
        );
    } else {
        tracing::info!(username = %admin.username, "created initial admin user");
    }
    Ok(())
}
