//! Gateway routing configuration.
//!
//! Loaded once at startup from a JSON document and shared read-only afterwards.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use crate::domain::TransactionType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayEndpoints {
    pub deposit: String,
    pub withdrawal: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayRetry {
    pub max_attempts: u32,
    pub backoff_factor: f64,
}

impl Default for GatewayRetry {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff_factor: 1.0,
        }
    }
}

/// Connection details for one gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayDetails {
    pub base_url: String,
    pub endpoints: GatewayEndpoints,
    #[serde(default)]
    pub callback_url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Request timeout in seconds.
    pub timeout: u64,
    #[serde(default)]
    pub retry: GatewayRetry,
}

impl GatewayDetails {
    pub fn endpoint_for(&self, kind: TransactionType) -> &str {
        match kind {
            TransactionType::Deposit => &self.endpoints.deposit,
            TransactionType::Withdrawal => &self.endpoints.withdrawal,
        }
    }

    pub fn url_for(&self, kind: TransactionType) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint_for(kind)
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountryConfig {
    /// Gateway name to priority. Higher wins.
    pub gateways: BTreeMap<String, i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewaysConfig {
    pub gateways: BTreeMap<String, GatewayDetails>,
    pub countries: BTreeMap<String, CountryConfig>,
}

impl GatewaysConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("error reading gateway config {}", path.display()))?;
        let config = Self::from_json(&raw)?;
        tracing::info!(
            gateways = config.gateways.len(),
            countries = config.countries.len(),
            "Gateway configuration loaded from {}",
            path.display()
        );
        Ok(config)
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let config: GatewaysConfig =
            serde_json::from_str(raw).context("error parsing gateway config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.gateways.is_empty() {
            anyhow::bail!("no gateways defined in configuration");
        }
        if self.countries.is_empty() {
            anyhow::bail!("no countries defined in configuration");
        }

        for (name, details) in &self.gateways {
            url::Url::parse(&details.base_url)
                .with_context(|| format!("gateway {} has an invalid base_url", name))?;
            if details.retry.max_attempts == 0 {
                anyhow::bail!("gateway {} must allow at least one attempt", name);
            }
        }

        for (code, country) in &self.countries {
            if country.gateways.is_empty() {
                anyhow::bail!("no gateways defined for country {}", code);
            }
            for gateway in country.gateways.keys() {
                if !self.gateways.contains_key(gateway) {
                    anyhow::bail!(
                        "gateway {} referenced in country {} does not exist in gateways configuration",
                        gateway,
                        code
                    );
                }
            }
        }

        Ok(())
    }

    pub fn gateway_details(&self, name: &str) -> Option<&GatewayDetails> {
        self.gateways.get(name)
    }

    pub fn country(&self, code: &str) -> Option<&CountryConfig> {
        self.countries.get(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "gateways": {
            "stripe": {
                "base_url": "https://api.stripe.test",
                "endpoints": { "deposit": "/v1/deposits", "withdrawal": "/v1/withdrawals" },
                "callback_url": "/api/callbacks/stripe",
                "headers": { "Authorization": "Bearer sk_test" },
                "timeout": 30,
                "retry": { "max_attempts": 3, "backoff_factor": 2.0 }
            },
            "paypal": {
                "base_url": "https://api.paypal.test/",
                "endpoints": { "deposit": "/deposit", "withdrawal": "/withdraw" },
                "timeout": 10
            }
        },
        "countries": {
            "US": { "gateways": { "stripe": 10, "paypal": 5 } }
        }
    }"#;

    #[test]
    fn parses_and_validates_sample() {
        let config = GatewaysConfig::from_json(SAMPLE).unwrap();
        let stripe = config.gateway_details("stripe").unwrap();
        assert_eq!(stripe.retry.max_attempts, 3);
        assert_eq!(stripe.timeout(), Duration::from_secs(30));
        assert_eq!(
            config.gateway_details("paypal").unwrap().retry,
            GatewayRetry::default()
        );
        assert_eq!(config.country("US").unwrap().gateways["stripe"], 10);
    }

    #[test]
    fn builds_endpoint_urls() {
        let config = GatewaysConfig::from_json(SAMPLE).unwrap();
        let paypal = config.gateway_details("paypal").unwrap();
        assert_eq!(
            paypal.url_for(TransactionType::Withdrawal),
            "https://api.paypal.test/withdraw"
        );
    }

    #[test]
    fn rejects_unknown_gateway_reference() {
        let raw = SAMPLE.replace("\"paypal\": 5", "\"adyen\": 5");
        let err = GatewaysConfig::from_json(&raw).unwrap_err();
        assert!(err.to_string().contains("adyen"));
    }

    #[test]
    fn rejects_country_without_candidates() {
        let raw = SAMPLE.replace(
            "\"US\": { \"gateways\": { \"stripe\": 10, \"paypal\": 5 } }",
            "\"US\": { \"gateways\": {} }",
        );
        assert!(GatewaysConfig::from_json(&raw).is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = GatewaysConfig::load(file.path()).unwrap();
        assert_eq!(config.gateways.len(), 2);
    }
}
