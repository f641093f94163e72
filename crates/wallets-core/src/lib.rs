//! Core types and traits for Wallets storage backends.
//!
//! This crate provides the `WalletStore` trait and the wallet records it
//! manages, so that storage implementations can live in separate crates.

pub mod models;
pub mod store;

pub use models::{NewWallet, Wallet, WalletEnvelope, WalletId};
pub use store::{StoreError, WalletStore};
