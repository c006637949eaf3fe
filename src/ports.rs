//! Capability contracts consumed by the services.
//! Adapters in `crate::adapters` provide Postgres, HTTP, Redis and in-memory implementations.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::codec::PayloadFormat;
use crate::config::gateways::GatewayDetails;
use crate::domain::{Country, Gateway, Transaction, TransactionStatus, TransactionType, User};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Persists a new transaction and returns it with its store-assigned id.
    async fn create(&self, tx: &Transaction) -> RepositoryResult<Transaction>;
    async fn get_by_id(&self, id: i64) -> RepositoryResult<Transaction>;
    /// Single atomic write. `NotFound` when no row has this id.
    async fn update_status(&self, id: i64, status: &TransactionStatus) -> RepositoryResult<()>;
}

#[async_trait]
pub trait GatewayRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Gateway>;
    async fn find_by_name(&self, name: &str) -> RepositoryResult<Gateway>;
}

#[async_trait]
pub trait CountryRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Country>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> RepositoryResult<User>;
}

#[derive(Error, Debug)]
pub enum GatewayClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("gateway returned non-success status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Circuit breaker open: {0}")]
    CircuitOpen(String),

    #[error("gateway {0} has no client configured")]
    UnknownGateway(String),

    #[error("invalid header {0}")]
    InvalidHeader(String),
}

/// Outbound call to a payment gateway. Success means a 2xx acknowledgment.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn send_transaction(
        &self,
        gateway_name: &str,
        kind: TransactionType,
        payload: &[u8],
        transaction_id: i64,
        format: PayloadFormat,
        details: &GatewayDetails,
    ) -> Result<(), GatewayClientError>;
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PublishError {
    #[error("publish transport error: {0}")]
    Transport(String),

    #[error("publish circuit breaker is open")]
    CircuitOpen,

    #[error("publish timed out after {0:?}")]
    Timeout(Duration),

    #[error("publish task aborted: {0}")]
    Aborted(String),
}

/// Message bus. `key` is the partition key (stringified transaction id).
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, key: &str, message: &[u8], format: &str) -> Result<(), PublishError>;
}
