//! Database adapters: connection pool and schema migrations.

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use tracing::{info, instrument};

use crate::config::StoreConfig;
use crate::error::{StoreError, map_sqlx_error};
use crate::tx::ImmediateTx;

/// Ordered schema migrations. Entry `n` moves `PRAGMA user_version` from `n`
/// to `n + 1`. Append only; never edit a shipped entry.
const MIGRATIONS: &[&[&str]] = &[
    // 1: core tables.
    &[
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id            INTEGER PRIMARY KEY,
            username      TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            role          TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('admin', 'manager', 'user')),
            created_at    TEXT NOT NULL,
            deleted_at    TEXT
        )
        "#,
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_users_username_active
            ON users(username) WHERE deleted_at IS NULL
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS owners (
            id         INTEGER PRIMARY KEY,
            name       TEXT NOT NULL,
            type       TEXT NOT NULL CHECK (type IN ('person', 'location')),
            created_at TEXT NOT NULL,
            deleted_at TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id          INTEGER PRIMARY KEY,
            name        TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            image       BLOB,
            image_mime  TEXT,
            status      TEXT NOT NULL DEFAULT 'active'
                        CHECK (status IN ('active', 'damaged', 'lost', 'removed')),
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            deleted_at  TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS inventory (
            item_id  INTEGER NOT NULL REFERENCES items(id),
            owner_id INTEGER NOT NULL REFERENCES owners(id),
            quantity INTEGER NOT NULL CHECK (quantity > 0),
            PRIMARY KEY (item_id, owner_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS transfers (
            id             INTEGER PRIMARY KEY,
            item_id        INTEGER NOT NULL REFERENCES items(id),
            from_owner_id  INTEGER NOT NULL REFERENCES owners(id),
            to_owner_id    INTEGER NOT NULL REFERENCES owners(id),
            quantity       INTEGER NOT NULL CHECK (quantity > 0),
            notes          TEXT NOT NULL DEFAULT '',
            transferred_at TEXT NOT NULL,
            transferred_by INTEGER REFERENCES users(id),
            CHECK (from_owner_id <> to_owner_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    ],
    // 2: token revocation and read-path indexes.
    &[
        r#"
        CREATE TABLE IF NOT EXISTS revoked_tokens (
            jti        TEXT PRIMARY KEY,
            expires_at TEXT NOT NULL
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_inventory_owner ON inventory(owner_id)",
        "CREATE INDEX IF NOT EXISTS idx_transfers_item ON transfers(item_id)",
        "CREATE INDEX IF NOT EXISTS idx_transfers_from ON transfers(from_owner_id)",
        "CREATE INDEX IF NOT EXISTS idx_transfers_to ON transfers(to_owner_id)",
    ],
];

/// Latest schema version this build knows about.
pub fn schema_version() -> i64 {
    MIGRATIONS.len() as i64
}

/// Open (creating if needed) the SQLite database described by `config`.
///
/// Every pooled connection gets WAL journaling, `synchronous=NORMAL`,
/// enforced foreign keys and the configured busy timeout.
#[instrument(skip(config), fields(db_path = %config.db_path.display()), err)]
pub async fn connect(config: &StoreConfig) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::new()
        .filename(&config.db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout);

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await
        .map_err(|e| map_sqlx_error("connect", e))
}

/// Bring the schema up to [`schema_version`].
///
/// Pending migrations run in one write transaction together with the version
/// bump, so a crash leaves the database at the old version with nothing
/// half-applied. Running it on an up-to-date database is a no-op.
#[instrument(skip(pool), err)]
pub async fn migrate(pool: &SqlitePool) -> Result<(), StoreError> {
    let mut tx = ImmediateTx::begin(pool).await?;
    let result = apply_pending(&mut tx).await;
    let applied = tx.finish(result).await?;
    if applied > 0 {
        info!(applied, version = schema_version(), "schema migrated");
    }
    Ok(())
}

async fn apply_pending(tx: &mut ImmediateTx) -> Result<usize, StoreError> {
    let current: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(tx.conn())
        .await
        .map_err(|e| map_sqlx_error("read_user_version", e))?;

    if current > schema_version() {
        return Err(StoreError::Storage(format!(
            "database schema version {current} is newer than supported {}",
            schema_version()
        )));
    }

    let pending = &MIGRATIONS[current as usize..];
    for statements in pending {
        for statement in statements.iter() {
            sqlx::query(statement)
                .execute(tx.conn())
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
    }

    if !pending.is_empty() {
        // PRAGMA does not accept bound parameters.
        let bump = format!("PRAGMA user_version = {}", schema_version());
        sqlx::query(&bump)
            .execute(tx.conn())
            .await
            .map_err(|e| map_sqlx_error("write_user_version", e))?;
    }
    Ok(pending.len())
}

/// Connect and migrate in one step.
pub async fn open(config: &StoreConfig) -> Result<SqlitePool, StoreError> {
    let pool = connect(config).await?;
    migrate(&pool).await?;
    Ok(pool)
}
