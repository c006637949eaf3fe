use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::domain::Transaction;
use crate::error::AppError;
use crate::services::{RequestContext, TransactionRequest};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn ok(message: &str, data: T) -> Self {
        Self {
            status_code: StatusCode::OK.as_u16(),
            message: message.to_string(),
            data: Some(data),
        }
    }
}

fn parse_request(
    body: Result<Json<TransactionRequest>, JsonRejection>,
) -> Result<TransactionRequest, AppError> {
    let Json(request) =
        body.map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e.body_text())))?;
    request.validated()
}

pub async fn deposit(
    State(state): State<AppState>,
    body: Result<Json<TransactionRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Transaction>>, AppError> {
    let request = parse_request(body)?;
    let ctx = RequestContext::with_timeout(state.request_timeout);

    let tx = state
        .transaction_processor
        .process_deposit(&ctx, request)
        .await?;

    Ok(Json(ApiResponse::ok("Deposit initiated successfully", tx)))
}

pub async fn withdrawal(
    State(state): State<AppState>,
    body: Result<Json<TransactionRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Transaction>>, AppError> {
    let request = parse_request(body)?;
    let ctx = RequestContext::with_timeout(state.request_timeout);

    let tx = state
        .transaction_processor
        .process_withdrawal(&ctx, request)
        .await?;

    Ok(Json(ApiResponse::ok("Withdrawal initiated successfully", tx)))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, AppError> {
    let tx = state.transactions.get_by_id(id).await?;
    Ok(Json(tx))
}
