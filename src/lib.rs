pub mod adapters;
pub mod cli;
pub mod codec;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod ports;
pub mod services;
pub mod startup;
pub mod utils;
pub mod validation;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::health::DependencyChecker;
use crate::middleware::{request_logger_middleware, RequestLogConfig};
use crate::ports::TransactionRepository;
use crate::services::{CallbackProcessor, TransactionProcessor};

#[derive(Clone)]
pub struct AppState {
    pub transaction_processor: Arc<TransactionProcessor>,
    pub callback_processor: Arc<CallbackProcessor>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub health_checkers: Vec<Arc<dyn DependencyChecker>>,
    pub request_timeout: Duration,
    pub request_log: RequestLogConfig,
    pub start_time: Instant,
}

pub fn create_app(state: AppState) -> Router {
    let request_log = state.request_log;

    Router::new()
        .route("/health", get(handlers::health))
        .route("/deposit", post(handlers::transactions::deposit))
        .route("/withdrawal", post(handlers::transactions::withdrawal))
        .route("/transactions/:id", get(handlers::transactions::get_transaction))
        .route(
            "/api/callbacks/:gateway",
            post(handlers::callbacks::gateway_callback),
        )
        .layer(axum::middleware::from_fn_with_state(
            request_log,
            request_logger_middleware,
        ))
        .with_state(state)
}
