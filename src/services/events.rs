use std::sync::Arc;

use crate::domain::TransactionEvent;
use crate::error::AppError;
use crate::ports::{EventPublisher, PublishError};

use super::publish_guard::PublishGuard;

/// Serializes transaction events and hands them to the bus through the
/// publish guard. Callers log the result and move on.
///
/// The event body is always JSON. `format` is the data format of the gateway
/// that handled the transaction and travels with the message as a hint.
#[derive(Clone)]
pub struct EventDispatcher {
    publisher: Arc<dyn EventPublisher>,
    guard: PublishGuard,
}

impl EventDispatcher {
    pub fn new(publisher: Arc<dyn EventPublisher>, guard: PublishGuard) -> Self {
        Self { publisher, guard }
    }

    pub fn guard(&self) -> &PublishGuard {
        &self.guard
    }

    pub async fn dispatch(&self, event: &TransactionEvent, format: &str) -> Result<(), AppError> {
        let message = serde_json::to_vec(event)
            .map_err(|e| AppError::PublishFailure(format!("event serialization: {}", e)))?;
        let key = event.key();
        let publisher = self.publisher.clone();
        let format = format.to_string();

        self.guard
            .guard(move || async move {
                publisher.publish(&key, &message, &format).await
            })
            .await
            .map_err(|e: PublishError| AppError::from(e).context("publish event"))
    }
}
