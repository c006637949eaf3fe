use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::validation::{sanitize_string, validate_gateway_name};
use crate::AppState;

/// `POST /api/callbacks/:gateway`. The body is passed through untouched;
/// its format is whatever the named gateway speaks.
pub async fn gateway_callback(
    State(state): State<AppState>,
    Path(gateway): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let gateway = sanitize_string(&gateway);
    validate_gateway_name(&gateway)?;

    let ctx = crate::services::RequestContext::with_timeout(state.request_timeout);
    let processed = ctx
        .run(state.callback_processor.process_callback(&gateway, &body))
        .await
        .map_err(|_| AppError::Cancelled.context("process callback"))?;

    if let Err(e) = processed {
        tracing::error!(gateway = %gateway, error = %e, "Error processing callback");
        return Err(e);
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Callback processed successfully",
    })))
}
