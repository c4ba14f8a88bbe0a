//! Transaction-request endpoints.
//!
//! A wallet that scanned the merchant's `https:` link first calls `GET /tx`
//! to show who it is paying, then `POST /tx` with its account to receive the
//! transaction to sign.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use solana_pay::chain::SolanaRpc;
use solana_pay::types::transaction::{
    TransactionMetadata, TransactionRequestBody, TransactionResponse,
};
use solana_pay::{PaymentRequest, SolanaPayClient, SolanaPayError};
use std::sync::Arc;
use tracing::instrument;

/// Everything a request handler needs, shared across requests.
pub struct MerchantState<R> {
    pub client: SolanaPayClient<R>,
    pub request: PaymentRequest,
    pub metadata: TransactionMetadata,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A [`SolanaPayError`] rendered as JSON.
///
/// Node failures are 503 so the wallet may retry; everything else is the
/// caller's fault and 400.
#[derive(Debug)]
pub struct ApiError(pub SolanaPayError);

impl From<SolanaPayError> for ApiError {
    fn from(error: SolanaPayError) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_network() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::BAD_REQUEST
        };
        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn routes<R>() -> Router<Arc<MerchantState<R>>>
where
    R: SolanaRpc + Send + Sync + 'static,
{
    Router::new()
        .route("/tx", get(get_metadata::<R>).post(post_transaction::<R>))
        .route("/health", get(get_health::<R>))
}

/// `GET /tx`: label and icon for the wallet to display.
#[instrument(skip_all)]
pub async fn get_metadata<R>(
    State(state): State<Arc<MerchantState<R>>>,
) -> Json<TransactionMetadata> {
    Json(state.metadata.clone())
}

/// `POST /tx`: the unsigned payment transaction for `account`.
#[instrument(skip_all)]
pub async fn post_transaction<R>(
    State(state): State<Arc<MerchantState<R>>>,
    Json(body): Json<TransactionRequestBody>,
) -> Result<Json<TransactionResponse>, ApiError>
where
    R: SolanaRpc + Send + Sync + 'static,
{
    let built = state
        .client
        .create_transaction(&body.account, &state.request)
        .await
        .inspect_err(|error| {
            tracing::warn!(account = %body.account, %error, "Failed to build transaction")
        })?;
    tracing::info!(
        account = %body.account,
        instructions = built.instructions_count,
        estimated_fee = built.estimated_fee,
        "Built transaction"
    );
    Ok(Json(TransactionResponse {
        transaction: built.transaction,
        message: state.message.clone(),
    }))
}

/// `GET /health`: whether the current RPC node answers.
#[instrument(skip_all)]
pub async fn get_health<R>(State(state): State<Arc<MerchantState<R>>>) -> Response
where
    R: SolanaRpc + Send + Sync + 'static,
{
    match state.client.rpc().check_health().await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(error) => {
            tracing::warn!(%error, "RPC health check failed");
            ApiError(error.into()).into_response()
        }
    }
}
