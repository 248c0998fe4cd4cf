use axum::{Router, routing::get};

pub mod auth;
pub mod inventory;
pub mod items;
pub mod owners;
pub mod system;
pub mod transfers;
pub mod users;

/// Router for all authenticated endpoints (mounted under `/api`).
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/owners", owners::router())
        .nest("/items", items::router())
        .nest("/transfers", transfers::router())
        .nest("/inventory", inventory::router())
}
