pub mod callback_processor;
pub mod context;
pub mod events;
pub mod gateway_selector;
pub mod publish_guard;
pub mod retry;
pub mod transaction_processor;

pub use callback_processor::CallbackProcessor;
pub use context::{CancelHandle, Cancelled, RequestContext};
pub use events::EventDispatcher;
pub use gateway_selector::GatewaySelector;
pub use publish_guard::{
    BreakerConfig, CircuitBreaker, CircuitState, Clock, Permit, PublishGuard, SystemClock,
};
pub use retry::{RetryError, RetryPolicy};
pub use transaction_processor::{RetryDelays, TransactionProcessor, TransactionRequest};
