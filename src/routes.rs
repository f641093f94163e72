use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tower_http::normalize_path::NormalizePath;
use wallets_contract::{Contract, FieldError, ValidationFailure};
use wallets_core::{NewWallet, StoreError, WalletEnvelope, WalletId, WalletStore};

use crate::{error::ApiError, validation::enforce_contract};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn WalletStore>,
    pub contract: Arc<Contract>,
    pub metrics: Option<PrometheusHandle>,
}

/// The served application: the router behind trailing-slash normalization.
pub type App = NormalizePath<Router>;

/// Wraps [`router`] so `/wallets/` and `/wallets/1/` route like their
/// trimmed forms. Normalization has to run outside the router, since a
/// layer added with `Router::layer` only sees requests after routing.
pub fn app(state: AppState) -> App {
    NormalizePath::trim_trailing_slash(router(state))
}

/// Builds the HTTP router. Every `/wallets` route sits behind the contract
/// middleware; `/health` and `/metrics` are outside the contract.
pub fn router(state: AppState) -> Router {
    let wallets = Router::new()
        .route("/wallets", post(create_wallet))
        .route("/wallets/:id", get(get_wallet))
        .layer(middleware::from_fn_with_state(
            state.contract.clone(),
            enforce_contract,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
        .merge(wallets)
        .with_state(state)
}

/// POST /wallets
async fn create_wallet(
    State(state): State<AppState>,
    payload: Result<Json<NewWallet>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    // The contract may be looser than NewWallet when overridden at runtime.
    let Json(wallet) = payload.map_err(|rejection| {
        ValidationFailure::bad_request(vec![FieldError::new("/body", rejection.body_text())])
    })?;

    let wallet = state.store.create(wallet)?;
    metrics::increment_counter!("wallets_created_total");
    tracing::info!(id = wallet.id, "wallet created");
    Ok(StatusCode::CREATED)
}

/// GET /wallets/:id
async fn get_wallet(
    State(state): State<AppState>,
    id: Result<Path<WalletId>, PathRejection>,
) -> Result<Json<WalletEnvelope>, ApiError> {
    // Integers outside WalletId (e.g. negatives) cannot name a wallet.
    let Ok(Path(id)) = id else {
        metrics::increment_counter!("wallets_not_found_total");
        return Err(StoreError::NotFound(0).into());
    };

    match state.store.get_by_id(id) {
        Ok(wallet) => Ok(Json(WalletEnvelope { wallet })),
        Err(StoreError::NotFound(id)) => {
            metrics::increment_counter!("wallets_not_found_total");
            tracing::debug!(id, "wallet not found");
            Err(StoreError::NotFound(id).into())
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /health
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// GET /metrics
async fn render_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, String::new()),
    }
}
