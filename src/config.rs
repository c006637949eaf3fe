use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub mod gateways;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub redis_url: Option<String>,
    pub gateway_config_path: PathBuf,
    pub public_base_url: String,
    pub request_timeout_secs: u64,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub publish_timeout_ms: u64,
    pub publish_breaker_failure_rate: f64,
    pub publish_breaker_min_calls: usize,
    pub publish_breaker_window: usize,
    pub publish_breaker_reset_secs: u64,
    pub log_json: bool,
    pub log_request_body: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            server_port: parse_or("SERVER_PORT", 3000)?,
            database_url: env::var("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            gateway_config_path: env::var("GATEWAY_CONFIG_PATH")
                .unwrap_or_else(|_| "config/gateways.json".to_string())
                .into(),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            request_timeout_secs: parse_or("REQUEST_TIMEOUT_SECS", 30)?,
            retry_base_delay_ms: parse_or("RETRY_BASE_DELAY_MS", 200)?,
            retry_max_delay_ms: parse_or("RETRY_MAX_DELAY_MS", 10_000)?,
            publish_timeout_ms: parse_or("PUBLISH_TIMEOUT_MS", 2_000)?,
            publish_breaker_failure_rate: parse_or("PUBLISH_BREAKER_FAILURE_RATE", 0.5)?,
            publish_breaker_min_calls: parse_or("PUBLISH_BREAKER_MIN_CALLS", 5)?,
            publish_breaker_window: parse_or("PUBLISH_BREAKER_WINDOW", 20)?,
            publish_breaker_reset_secs: parse_or("PUBLISH_BREAKER_RESET_SECS", 30)?,
            log_json: env::var("LOG_FORMAT")
                .map(|format| format.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            log_request_body: parse_or("LOG_REQUEST_BODY", false)?,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_url.is_empty() {
            anyhow::bail!("DATABASE_URL is empty");
        }
        if self.server_port == 0 {
            anyhow::bail!("SERVER_PORT must be greater than 0");
        }
        if !(0.0..=1.0).contains(&self.publish_breaker_failure_rate) {
            anyhow::bail!("PUBLISH_BREAKER_FAILURE_RATE must be between 0 and 1");
        }
        url::Url::parse(&self.public_base_url)
            .map_err(|e| anyhow::anyhow!("PUBLIC_BASE_URL is not a valid URL: {}", e))?;
        Ok(())
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} is invalid: {}", key, e)),
        Err(_) => Ok(default),
    }
}
