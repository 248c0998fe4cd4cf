//! Infrastructure layer: SQLite storage, migrations and the Transfer Engine.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod store;
pub mod tx;


pub use config::{ConfigError, StoreConfig};
pub use engine::{OpContext, TransferEngine};
pub use error::{StoreError, map_sqlx_error};
pub use store::{Store, TransferFilter};
pub use tx::ImmediateTx;
