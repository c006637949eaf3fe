//! Postgres lookups over gateway, country and user reference data.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{Country, Gateway, User};
use crate::ports::{
    CountryRepository, GatewayRepository, RepositoryError, RepositoryResult, UserRepository,
};

#[derive(Clone)]
pub struct PostgresDirectoryRepository {
    pool: PgPool,
}

impl PostgresDirectoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GatewayRow {
    id: i64,
    name: String,
    data_format_supported: String,
}

impl From<GatewayRow> for Gateway {
    fn from(row: GatewayRow) -> Self {
        Gateway {
            id: row.id,
            name: row.name,
            data_format_supported: row.data_format_supported,
        }
    }
}

#[async_trait]
impl GatewayRepository for PostgresDirectoryRepository {
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Gateway> {
        sqlx::query_as::<_, GatewayRow>(
            "SELECT id, name, data_format_supported FROM gateways WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Gateway::from)
        .ok_or_else(|| RepositoryError::NotFound(format!("gateway {}", id)))
    }

    async fn find_by_name(&self, name: &str) -> RepositoryResult<Gateway> {
        sqlx::query_as::<_, GatewayRow>(
            "SELECT id, name, data_format_supported FROM gateways WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .map(Gateway::from)
        .ok_or_else(|| RepositoryError::NotFound(format!("gateway {}", name)))
    }
}

#[async_trait]
impl CountryRepository for PostgresDirectoryRepository {
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Country> {
        sqlx::query_as::<_, (i64, String, String, String)>(
            "SELECT id, name, code, currency FROM countries WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(|(id, name, code, currency)| Country {
            id,
            name,
            code,
            currency,
        })
        .ok_or_else(|| RepositoryError::NotFound(format!("country {}", id)))
    }
}

#[async_trait]
impl UserRepository for PostgresDirectoryRepository {
    async fn find_by_id(&self, id: i64) -> RepositoryResult<User> {
        sqlx::query_as::<_, (i64, String, String, i64)>(
            "SELECT id, username, email, country_id FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(|(id, username, email, country_id)| User {
            id,
            username,
            email,
            country_id,
        })
        .ok_or_else(|| RepositoryError::NotFound(format!("user {}", id)))
    }
}
