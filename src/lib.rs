//! Wallets API: a contract-validated CRUD service for wallet records.

pub mod config;
pub mod error;
pub mod routes;
pub mod validation;

pub use routes::{app, router, App, AppState};
