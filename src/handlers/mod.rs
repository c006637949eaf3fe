pub mod callbacks;
pub mod transactions;

use crate::health::check_health;
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let response = check_health(&state.health_checkers, state.start_time).await;

    // 503 only when a critical dependency is down
    let status_code = if response.status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status_code, Json(response))
}
