//! Runtime configuration of the API binary, read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use depot_infra::config::{ConfigError, StoreConfig, env_or};

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub addr: SocketAddr,
    /// HS256 signing key. `None` means "use the key persisted in the database".
    pub jwt_secret: Option<String>,
    pub admin_user: String,
    /// Password for a freshly bootstrapped admin; generated when `None`.
    pub admin_password: Option<String>,
    /// Deadline handed to every Transfer Engine call.
    pub op_timeout: Duration,
    pub store: StoreConfig,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            addr: env_or("DEPOT_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            jwt_secret: optional("JWT_SECRET"),
            admin_user: env_or("DEPOT_ADMIN_USER", "admin".to_string())?,
            admin_password: optional("DEPOT_ADMIN_PASSWORD"),
            op_timeout: Duration::from_millis(env_or("DEPOT_OP_TIMEOUT_MS", 10_000u64)?),
            store: StoreConfig::from_env()?,
        })
    }
}

fn optional(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|value| !value.trim().is_empty())
}
