//! Client for the Wallets API.
//!
//! Every request passes through the configured [`RequestInterceptor`]s before
//! any network I/O. The default [`ContractInterceptor`] applies the same
//! contract the server enforces, so a request the server would reject with a
//! validation error never leaves the process.

pub mod interceptor;

use std::sync::Arc;

use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use thiserror::Error;
use url::Url;
use wallets_contract::{Contract, ValidationFailure};
use wallets_core::{NewWallet, Wallet, WalletEnvelope, WalletId};

pub use interceptor::{ContractInterceptor, RequestInterceptor};

#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected locally; the request was never sent.
    #[error("request violates contract: {0}")]
    Validation(ValidationFailure),
    /// Rejected by the server with a `{message, errors}` body.
    #[error("server rejected request ({}): {0}", .0.status)]
    Rejected(ValidationFailure),
    #[error("wallet not found: {0}")]
    NotFound(WalletId),
    #[error("unexpected response status {0}")]
    UnexpectedStatus(StatusCode),
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub struct WalletsClient {
    http: reqwest::Client,
    base_url: Url,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
}

impl WalletsClient {
    /// A client rooted at `base_url` that validates against `contract`.
    pub fn new(base_url: &str, contract: Arc<Contract>) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let interceptor = ContractInterceptor::new(contract, &base_url);
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            interceptors: vec![Arc::new(interceptor)],
        })
    }

    /// Appends an interceptor; interceptors run in registration order.
    pub fn with_interceptor(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Builds a request and runs it through the interceptors without sending it.
    pub fn prepare(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Request, ClientError> {
        let url = self.base_url.join(path.trim_start_matches('/'))?;
        let mut builder = self.http.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let request = builder.build()?;

        for interceptor in &self.interceptors {
            if let Err(failure) = interceptor.intercept(&request) {
                tracing::debug!(
                    method = %request.method(),
                    url = %request.url(),
                    errors = failure.errors.len(),
                    "request cancelled by interceptor"
                );
                return Err(ClientError::Validation(failure));
            }
        }
        Ok(request)
    }

    /// Validates and sends a request, returning the raw response.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, ClientError> {
        let request = self.prepare(method, path, body)?;
        Ok(self.http.execute(request).await?)
    }

    /// POST /wallets
    pub async fn create_wallet(&self, wallet: &NewWallet) -> Result<(), ClientError> {
        let body = serde_json::to_value(wallet)?;
        let response = self.send(Method::POST, "/wallets", Some(&body)).await?;
        match response.status() {
            StatusCode::CREATED => Ok(()),
            _ => Err(rejection(response).await),
        }
    }

    /// GET /wallets/:id
    pub async fn get_wallet(&self, id: WalletId) -> Result<Wallet, ClientError> {
        let response = self
            .send(Method::GET, &format!("/wallets/{}", id), None)
            .await?;
        match response.status() {
            StatusCode::OK => Ok(response.json::<WalletEnvelope>().await?.wallet),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(id)),
            _ => Err(rejection(response).await),
        }
    }
}

/// Turns an error response into `Rejected` when it carries a contract
/// failure body, otherwise `UnexpectedStatus`.
async fn rejection(response: Response) -> ClientError {
    let status = response.status();
    match response.json::<ValidationFailure>().await {
        Ok(mut failure) => {
            failure.status = status;
            ClientError::Rejected(failure)
        }
        Err(_) => ClientError::UnexpectedStatus(status),
    }
}
