use async_trait::async_trait;

use crate::ports::{EventPublisher, PublishError};

pub const TRANSACTION_EVENTS_STREAM: &str = "transaction-events";

/// Appends events to a Redis stream (`XADD`), one entry per event.
#[derive(Clone)]
pub struct RedisEventPublisher {
    redis_client: redis::Client,
    stream: String,
}

impl RedisEventPublisher {
    pub fn new(redis_url: &str) -> anyhow::Result<Self> {
        let redis_client = redis::Client::open(redis_url)?;
        Ok(Self {
            redis_client,
            stream: TRANSACTION_EVENTS_STREAM.to_string(),
        })
    }

    pub fn with_stream(mut self, stream: impl Into<String>) -> Self {
        self.stream = stream.into();
        self
    }
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish(&self, key: &str, message: &[u8], format: &str) -> Result<(), PublishError> {
        let mut conn = self
            .redis_client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let entry_id = redis::cmd("XADD")
            .arg(&self.stream)
            .arg("*")
            .arg("key")
            .arg(key)
            .arg("format")
            .arg(format)
            .arg("payload")
            .arg(message)
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        tracing::debug!(stream = %self.stream, key, entry_id = %entry_id, "Event appended");
        Ok(())
    }
}

/// Writes events to the log. Used when no broker is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventPublisher;

#[async_trait]
impl EventPublisher for LogEventPublisher {
    async fn publish(&self, key: &str, message: &[u8], format: &str) -> Result<(), PublishError> {
        tracing::info!(
            key,
            format,
            payload = %String::from_utf8_lossy(message),
            "Event published"
        );
        Ok(())
    }
}
