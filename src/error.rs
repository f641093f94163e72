use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use wallets_contract::ValidationFailure;
use wallets_core::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Contract(#[from] ValidationFailure),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Contract(failure) => (failure.status, Json(failure)).into_response(),
            ApiError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
            ApiError::Store(e) => {
                tracing::error!(error = %e, "wallet store failure");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
