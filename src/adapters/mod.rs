//! Implementations of the contracts in `crate::ports`.

pub mod http_gateway_client;
pub mod in_memory;
pub mod postgres_directory_repository;
pub mod postgres_transaction_repository;
pub mod redis_event_publisher;

pub use http_gateway_client::HttpGatewayClient;
pub use in_memory::{InMemoryDirectory, InMemoryTransactionRepository};
pub use postgres_directory_repository::PostgresDirectoryRepository;
pub use postgres_transaction_repository::PostgresTransactionRepository;
pub use redis_event_publisher::{LogEventPublisher, RedisEventPublisher};
