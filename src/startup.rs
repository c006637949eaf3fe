use anyhow::{Context, Result};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::adapters::{
    HttpGatewayClient, LogEventPublisher, PostgresDirectoryRepository,
    PostgresTransactionRepository, RedisEventPublisher,
};
use crate::config::gateways::GatewaysConfig;
use crate::config::Config;
use crate::health::{DependencyChecker, PostgresChecker, RedisChecker};
use crate::middleware::RequestLogConfig;
use crate::ports::EventPublisher;
use crate::services::{
    BreakerConfig, CallbackProcessor, EventDispatcher, GatewaySelector, PublishGuard,
    RetryDelays, TransactionProcessor,
};
use crate::AppState;

pub fn breaker_config(config: &Config) -> BreakerConfig {
    BreakerConfig {
        failure_rate_threshold: config.publish_breaker_failure_rate,
        minimum_calls: config.publish_breaker_min_calls,
        window_size: config.publish_breaker_window,
        reset_timeout: Duration::from_secs(config.publish_breaker_reset_secs),
        call_timeout: Duration::from_millis(config.publish_timeout_ms),
        ..BreakerConfig::default()
    }
}

pub fn retry_delays(config: &Config) -> RetryDelays {
    RetryDelays {
        base: Duration::from_millis(config.retry_base_delay_ms),
        max: Duration::from_millis(config.retry_max_delay_ms),
    }
}

/// Wires Postgres, the gateway client and the event bus into the services.
pub fn build_state(config: &Config, gateways: Arc<GatewaysConfig>, pool: PgPool) -> Result<AppState> {
    let transactions = Arc::new(PostgresTransactionRepository::new(pool.clone()));
    let directory = Arc::new(PostgresDirectoryRepository::new(pool.clone()));

    let mut health_checkers: Vec<Arc<dyn DependencyChecker>> =
        vec![Arc::new(PostgresChecker::new(pool))];

    let publisher: Arc<dyn EventPublisher> = match &config.redis_url {
        Some(url) => {
            health_checkers.push(Arc::new(RedisChecker::new(url.clone())));
            Arc::new(RedisEventPublisher::new(url).context("Invalid REDIS_URL")?)
        }
        None => {
            tracing::warn!("REDIS_URL not set, transaction events will only be logged");
            Arc::new(LogEventPublisher)
        }
    };
    let events = EventDispatcher::new(publisher, PublishGuard::new(breaker_config(config)));

    let client = Arc::new(HttpGatewayClient::new(&gateways, config.public_base_url.clone()));
    let selector = GatewaySelector::new(
        gateways.clone(),
        directory.clone(),
        directory.clone(),
        directory.clone(),
    );

    let transaction_processor = TransactionProcessor::new(
        selector,
        transactions.clone(),
        gateways,
        client,
        events.clone(),
    )
    .with_retry_delays(retry_delays(config));
    let callback_processor = CallbackProcessor::new(directory, transactions.clone(), events);

    Ok(AppState {
        transaction_processor: Arc::new(transaction_processor),
        callback_processor: Arc::new(callback_processor),
        transactions,
        health_checkers,
        request_timeout: config.request_timeout(),
        request_log: RequestLogConfig {
            log_body: config.log_request_body,
        },
        start_time: Instant::now(),
    })
}

pub struct ValidationReport {
    pub environment: bool,
    pub gateways: bool,
    pub database: bool,
    pub redis: Option<bool>,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.environment && self.gateways && self.database && self.redis.unwrap_or(true)
    }

    pub fn print(&self) {
        println!("\n=== Startup Validation Report ===");
        println!("Environment Variables: {}", status(self.environment));
        println!("Gateway Config:        {}", status(self.gateways));
        println!("Database Connectivity: {}", status(self.database));
        match self.redis {
            Some(ok) => println!("Redis Connectivity:    {}", status(ok)),
            None => println!("Redis Connectivity:    - (not configured)"),
        }

        if !self.errors.is_empty() {
            println!("\nErrors:");
            for error in &self.errors {
                println!("  ❌ {}", error);
            }
        }

        println!("\nOverall Status: {}", if self.is_valid() { "✅ PASS" } else { "❌ FAIL" });
        println!("=================================\n");
    }
}

fn status(ok: bool) -> &'static str {
    if ok { "✅ OK" } else { "❌ FAIL" }
}

pub async fn validate_environment(config: &Config) -> ValidationReport {
    let mut report = ValidationReport {
        environment: true,
        gateways: true,
        database: true,
        redis: None,
        errors: Vec::new(),
    };

    if let Err(e) = config.validate() {
        report.environment = false;
        report.errors.push(format!("Environment: {}", e));
    }

    if let Err(e) = GatewaysConfig::load(&config.gateway_config_path) {
        report.gateways = false;
        report.errors.push(format!("Gateways: {:#}", e));
    }

    if let Err(e) = validate_database(config).await {
        report.database = false;
        report.errors.push(format!("Database: {:#}", e));
    }

    if let Some(url) = &config.redis_url {
        let ok = validate_redis(url).await;
        if let Err(e) = &ok {
            report.errors.push(format!("Redis: {:#}", e));
        }
        report.redis = Some(ok.is_ok());
    }

    report
}

async fn validate_database(config: &Config) -> Result<()> {
    let pool = crate::db::create_pool(config)
        .await
        .context("Failed to connect to database")?;
    sqlx::query("SELECT 1")
        .fetch_one(&pool)
        .await
        .context("Failed to query database")?;
    Ok(())
}

async fn validate_redis(redis_url: &str) -> Result<()> {
    let client = redis::Client::open(redis_url).context("Invalid Redis URL")?;

    let mut conn = client
        .get_multiplexed_async_connection()
        .await
        .context("Failed to connect to Redis")?;

    redis::cmd("PING")
        .query_async::<_, String>(&mut conn)
        .await
        .context("Redis PING failed")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            server_port: 3000,
            database_url: "postgres://localhost:5432/paygate".to_string(),
            redis_url: None,
            gateway_config_path: "config/gateways.json".into(),
            public_base_url: "https://payments.example.com".to_string(),
            request_timeout_secs: 30,
            retry_base_delay_ms: 250,
            retry_max_delay_ms: 4_000,
            publish_timeout_ms: 1_500,
            publish_breaker_failure_rate: 0.25,
            publish_breaker_min_calls: 8,
            publish_breaker_window: 40,
            publish_breaker_reset_secs: 12,
            log_json: false,
            log_request_body: false,
        }
    }

    #[test]
    fn test_breaker_config_from_env_config() {
        let breaker = breaker_config(&config());
        assert_eq!(breaker.failure_rate_threshold, 0.25);
        assert_eq!(breaker.minimum_calls, 8);
        assert_eq!(breaker.window_size, 40);
        assert_eq!(breaker.reset_timeout, Duration::from_secs(12));
        assert_eq!(breaker.call_timeout, Duration::from_millis(1_500));
    }

    #[test]
    fn test_retry_delays_from_env_config() {
        let delays = retry_delays(&config());
        assert_eq!(delays.base, Duration::from_millis(250));
        assert_eq!(delays.max, Duration::from_secs(4));
    }

    #[test]
    fn test_report_ignores_unconfigured_redis() {
        let report = ValidationReport {
            environment: true,
            gateways: true,
            database: true,
            redis: None,
            errors: Vec::new(),
        };
        assert!(report.is_valid());

        let report = ValidationReport {
            redis: Some(false),
            ..report
        };
        assert!(!report.is_valid());
    }
}
