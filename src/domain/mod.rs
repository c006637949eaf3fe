pub mod directory;
pub mod event;
pub mod transaction;

pub use directory::{Country, Gateway, User};
pub use event::{EventType, TransactionEvent};
pub use transaction::{Transaction, TransactionStatus, TransactionType};
