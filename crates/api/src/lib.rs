//! HTTP API: server bootstrap, routing, and request/response mapping.

pub mod app;
pub mod authz;
pub mod bootstrap;
pub mod config;
pub mod context;
pub mod middleware;
