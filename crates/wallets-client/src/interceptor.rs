use std::sync::Arc;

use reqwest::{header::CONTENT_TYPE, Request};
use url::Url;
use wallets_contract::{Contract, RequestParts, ValidationFailure};

/// Inspects a fully built request before it is sent. Returning an error
/// cancels the request.
pub trait RequestInterceptor: Send + Sync {
    fn intercept(&self, request: &Request) -> Result<(), ValidationFailure>;
}

/// Validates outgoing requests against the API contract, the same way the
/// server validates them on arrival.
pub struct ContractInterceptor {
    contract: Arc<Contract>,
    base_path: String,
}

impl ContractInterceptor {
    /// `base_url` is the API root; its path is stripped before the request
    /// path is matched against the contract.
    pub fn new(contract: Arc<Contract>, base_url: &Url) -> Self {
        Self {
            contract,
            base_path: base_url.path().trim_end_matches('/').to_string(),
        }
    }
}

impl RequestInterceptor for ContractInterceptor {
    fn intercept(&self, request: &Request) -> Result<(), ValidationFailure> {
        let full_path = request.url().path();
        let path = full_path
            .strip_prefix(self.base_path.as_str())
            .filter(|p| p.starts_with('/'))
            .unwrap_or(full_path);

        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let body = request.body().and_then(|b| b.as_bytes()).unwrap_or_default();

        self.contract.validate_request(&RequestParts {
            method: request.method(),
            path,
            content_type,
            body,
        })
    }
}
