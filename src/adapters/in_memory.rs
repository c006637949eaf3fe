use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};
use tokio::sync::RwLock;

use crate::domain::{Country, Gateway, Transaction, TransactionStatus, User};
use crate::ports::{
    CountryRepository, GatewayRepository, RepositoryError, RepositoryResult,
    TransactionRepository, UserRepository,
};

/// Thread-safe in-memory transaction store.
///
/// Ids are assigned sequentially from 1, like a `BIGSERIAL` column.
#[derive(Default, Clone)]
pub struct InMemoryTransactionRepository {
    transactions: Arc<RwLock<HashMap<i64, Transaction>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `tx` under its own id, replacing any existing record.
    pub async fn insert(&self, tx: Transaction) {
        self.next_id.fetch_max(tx.id, Ordering::SeqCst);
        self.transactions.write().await.insert(tx.id, tx);
    }

    pub async fn len(&self) -> usize {
        self.transactions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.transactions.read().await.is_empty()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn create(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        let mut stored = tx.clone();
        stored.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        stored.created_at = Utc::now();

        self.transactions
            .write()
            .await
            .insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: i64) -> RepositoryResult<Transaction> {
        self.transactions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("transaction {}", id)))
    }

    async fn update_status(&self, id: i64, status: &TransactionStatus) -> RepositoryResult<()> {
        let mut transactions = self.transactions.write().await;
        let tx = transactions
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("transaction {}", id)))?;
        tx.status = status.clone();
        Ok(())
    }
}

#[derive(Default)]
struct Directory {
    gateways: HashMap<i64, Gateway>,
    countries: HashMap<i64, Country>,
    users: HashMap<i64, User>,
}

/// Reference data for gateways, countries and users.
///
/// Seeding is synchronous so fixtures can be built outside a runtime.
#[derive(Default, Clone)]
pub struct InMemoryDirectory {
    inner: Arc<StdRwLock<Directory>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Directory> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Directory> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_gateway(&self, name: &str, data_format_supported: &str) -> Gateway {
        let mut directory = self.write();
        let gateway = Gateway {
            id: directory.gateways.len() as i64 + 1,
            name: name.to_string(),
            data_format_supported: data_format_supported.to_string(),
        };
        directory.gateways.insert(gateway.id, gateway.clone());
        gateway
    }

    /// Adds a country. An `id` of 0 is replaced with the next free id.
    pub fn add_country(&self, mut country: Country) -> Country {
        let mut directory = self.write();
        if country.id == 0 {
            country.id = directory.countries.len() as i64 + 1;
        }
        directory.countries.insert(country.id, country.clone());
        country
    }

    /// Adds a user. An `id` of 0 is replaced with the next free id.
    pub fn add_user(&self, mut user: User) -> User {
        let mut directory = self.write();
        if user.id == 0 {
            user.id = directory.users.len() as i64 + 1;
        }
        directory.users.insert(user.id, user.clone());
        user
    }
}

#[async_trait]
impl GatewayRepository for InMemoryDirectory {
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Gateway> {
        self.read()
            .gateways
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("gateway {}", id)))
    }

    async fn find_by_name(&self, name: &str) -> RepositoryResult<Gateway> {
        self.read()
            .gateways
            .values()
            .find(|gateway| gateway.name == name)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("gateway {}", name)))
    }
}

#[async_trait]
impl CountryRepository for InMemoryDirectory {
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Country> {
        self.read()
            .countries
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("country {}", id)))
    }
}

#[async_trait]
impl UserRepository for InMemoryDirectory {
    async fn find_by_id(&self, id: i64) -> RepositoryResult<User> {
        self.read()
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("user {}", id)))
    }
}
