//! OpenAPI contract validation for the Wallets API.
//!
//! Both the HTTP server and the client interceptor validate through
//! [`Contract::validate_request`], so a payload accepted on one side is
//! accepted on the other and rejected payloads carry identical field errors.

mod contract;
mod document;
pub mod error;

pub use contract::{Contract, RequestParts, ResponseParts};
pub use error::{ContractError, FieldError, ValidationFailure};

/// The wallet contract, embedded at build time.
pub const WALLET_OPENAPI: &str = include_str!("../../../contract/wallet-openapi.yml");
