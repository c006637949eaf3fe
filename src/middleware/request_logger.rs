use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_BODY_LOG_SIZE: usize = 1024; // 1KB of body is logged, the rest is elided
// matches axum's default request body limit
const MAX_BODY_BUFFER_SIZE: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogConfig {
    pub log_body: bool,
}

pub async fn request_logger_middleware(
    State(config): State<RequestLogConfig>,
    mut req: Request,
    next: Next,
) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let header_value = HeaderValue::from_str(&request_id).ok();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    if let Some(value) = header_value.clone() {
        req.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    if config.log_body {
        let (parts, body) = req.into_parts();
        let bytes = match axum::body::to_bytes(body, MAX_BODY_BUFFER_SIZE).await {
            Ok(bytes) => bytes,
            Err(_) => {
                tracing::warn!(
                    request_id = %request_id,
                    method = %method,
                    uri = %uri,
                    "Request body too large or failed to read"
                );
                return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
            }
        };

        let sanitized_body = match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(json) => serde_json::to_string(&crate::utils::sanitize::sanitize_json(&json))
                .map(|body| truncate_for_log(&body))
                .unwrap_or_else(|_| "[invalid json]".to_string()),
            // callback bodies may be XML
            Err(_) => format!("[non-json, {} bytes]", bytes.len()),
        };

        tracing::info!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            body_size = bytes.len(),
            body = %sanitized_body,
            "Incoming request"
        );

        req = Request::from_parts(parts, Body::from(bytes));
    } else {
        tracing::info!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            "Incoming request"
        );
    }

    let mut response = next.run(req).await;

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Outgoing response"
    );

    if let Some(value) = header_value {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn truncate_for_log(body: &str) -> String {
    if body.len() <= MAX_BODY_LOG_SIZE {
        return body.to_string();
    }
    let mut end = MAX_BODY_LOG_SIZE;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[{} bytes total]", &body[..end], body.len())
}
