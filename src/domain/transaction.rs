//! Transaction domain entity.
//! Framework-agnostic representation of a deposit or withdrawal and its lifecycle.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of the money movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "deposit" => Ok(TransactionType::Deposit),
            "withdrawal" => Ok(TransactionType::Withdrawal),
            other => Err(format!("unknown transaction type: {}", other)),
        }
    }
}

/// Lifecycle status of a transaction.
///
/// The processor only ever writes `PENDING`, `PROCESSING` and `FAILED`.
/// Callbacks write whatever status the gateway reports, so values outside the
/// known set are carried verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Other(String),
}

impl TransactionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Processing => "PROCESSING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Other(value) => value,
        }
    }
}

impl From<String> for TransactionStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PENDING" => TransactionStatus::Pending,
            "PROCESSING" => TransactionStatus::Processing,
            "COMPLETED" => TransactionStatus::Completed,
            "FAILED" => TransactionStatus::Failed,
            _ => TransactionStatus::Other(value),
        }
    }
}

impl From<&str> for TransactionStatus {
    fn from(value: &str) -> Self {
        TransactionStatus::from(value.to_string())
    }
}

impl From<TransactionStatus> for String {
    fn from(status: TransactionStatus) -> Self {
        match status {
            TransactionStatus::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain entity representing a transaction.
///
/// `id` is 0 until the store assigns one. After creation only `status` changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub amount: BigDecimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub status: TransactionStatus,
    pub gateway_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(user_id: i64, gateway_id: i64, amount: BigDecimal, kind: TransactionType) -> Self {
        Self {
            id: 0,
            amount,
            kind,
            status: TransactionStatus::Pending,
            gateway_id,
            user_id,
            created_at: Utc::now(),
        }
    }
}
