//! Postgres implementation of TransactionRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{Transaction, TransactionStatus, TransactionType};
use crate::ports::{RepositoryError, RepositoryResult, TransactionRepository};

/// Postgres-backed transaction repository.
#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn create(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            INSERT INTO transactions (amount, transaction_type, status, gateway_id, user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, amount, transaction_type, status, gateway_id, user_id, created_at
            "#,
        )
        .bind(&tx.amount)
        .bind(tx.kind.as_str())
        .bind(tx.status.as_str())
        .bind(tx.gateway_id)
        .bind(tx.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.into_domain()
    }

    async fn get_by_id(&self, id: i64) -> RepositoryResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, amount, transaction_type, status, gateway_id, user_id, created_at
            FROM transactions WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.ok_or_else(|| RepositoryError::NotFound(format!("transaction {}", id)))?
            .into_domain()
    }

    async fn update_status(&self, id: i64, status: &TransactionStatus) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE transactions SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("transaction {}", id)));
        }
        Ok(())
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    amount: bigdecimal::BigDecimal,
    transaction_type: String,
    status: String,
    gateway_id: i64,
    user_id: i64,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> RepositoryResult<Transaction> {
        let kind = self
            .transaction_type
            .parse::<TransactionType>()
            .map_err(|e| RepositoryError::Database(sqlx::Error::Decode(e.into())))?;

        Ok(Transaction {
            id: self.id,
            amount: self.amount,
            kind,
            status: TransactionStatus::from(self.status),
            gateway_id: self.gateway_id,
            user_id: self.user_id,
            created_at: self.created_at,
        })
    }
}
