use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub dependencies: HashMap<String, DependencyStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyStatus {
    Healthy { status: String, latency_ms: u64 },
    Unhealthy { status: String, error: String },
}

impl DependencyStatus {
    fn healthy(start: Instant) -> Self {
        DependencyStatus::Healthy {
            status: "healthy".to_string(),
            latency_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn unhealthy(error: impl ToString) -> Self {
        DependencyStatus::Unhealthy {
            status: "unhealthy".to_string(),
            error: error.to_string(),
        }
    }
}

#[async_trait]
pub trait DependencyChecker: Send + Sync {
    fn name(&self) -> &'static str;

    /// A failing critical dependency makes the whole service unhealthy.
    fn is_critical(&self) -> bool {
        false
    }

    async fn check(&self) -> DependencyStatus;
}

pub struct PostgresChecker {
    pool: sqlx::PgPool,
}

impl PostgresChecker {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DependencyChecker for PostgresChecker {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn is_critical(&self) -> bool {
        true
    }

    async fn check(&self) -> DependencyStatus {
        let start = Instant::now();
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => DependencyStatus::healthy(start),
            Err(e) => DependencyStatus::unhealthy(e),
        }
    }
}

pub struct RedisChecker {
    url: String,
}

impl RedisChecker {
    pub fn new(url: String) -> Self {
        Self { url }
    }
}

#[async_trait]
impl DependencyChecker for RedisChecker {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn check(&self) -> DependencyStatus {
        let start = Instant::now();
        let client = match redis::Client::open(self.url.as_str()) {
            Ok(client) => client,
            Err(e) => return DependencyStatus::unhealthy(e),
        };
        let mut conn = match client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => return DependencyStatus::unhealthy(e),
        };
        match redis::cmd("PING").query_async::<_, String>(&mut conn).await {
            Ok(_) => DependencyStatus::healthy(start),
            Err(e) => DependencyStatus::unhealthy(e),
        }
    }
}

/// Runs every checker concurrently, each bounded by a 5 second timeout.
pub async fn check_health(
    checkers: &[Arc<dyn DependencyChecker>],
    start_time: Instant,
) -> HealthResponse {
    let results = run_checks(checkers).await;

    let mut dependencies = HashMap::new();
    let mut has_critical_failure = false;
    let mut has_non_critical_failure = false;

    for (checker, status) in checkers.iter().zip(results) {
        if matches!(status, DependencyStatus::Unhealthy { .. }) {
            if checker.is_critical() {
                has_critical_failure = true;
            } else {
                has_non_critical_failure = true;
            }
        }
        dependencies.insert(checker.name().to_string(), status);
    }

    let status = if has_critical_failure {
        "unhealthy"
    } else if has_non_critical_failure {
        "degraded"
    } else {
        "healthy"
    };

    HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: start_time.elapsed().as_secs(),
        dependencies,
    }
}

async fn run_checks(checkers: &[Arc<dyn DependencyChecker>]) -> Vec<DependencyStatus> {
    let handles: Vec<_> = checkers
        .iter()
        .cloned()
        .map(|checker| {
            tokio::spawn(async move {
                timeout(CHECK_TIMEOUT, checker.check())
                    .await
                    .unwrap_or_else(|_| DependencyStatus::unhealthy("timeout"))
            })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(
            handle
                .await
                .unwrap_or_else(|e| DependencyStatus::unhealthy(e)),
        );
    }
    results
}
