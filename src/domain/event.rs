use bigdecimal::BigDecimal;
use chrono::Utc;
use serde::Serialize;

use super::transaction::{Transaction, TransactionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    TransactionInitiated,
    CallbackProcessed,
}

/// Message published to the event bus after a transaction changes state.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionEvent {
    pub transaction_id: i64,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: BigDecimal,
    pub gateway_id: i64,
    pub user_id: i64,
    pub timestamp: i64,
    pub event_type: EventType,
}

impl TransactionEvent {
    pub fn from_transaction(tx: &Transaction, event_type: EventType) -> Self {
        Self {
            transaction_id: tx.id,
            status: tx.status.to_string(),
            kind: tx.kind,
            amount: tx.amount.clone(),
            gateway_id: tx.gateway_id,
            user_id: tx.user_id,
            timestamp: Utc::now().timestamp(),
            event_type,
        }
    }

    /// Partition key on the bus.
    pub fn key(&self) -> String {
        self.transaction_id.to_string()
    }
}
