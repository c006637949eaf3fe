use async_trait::async_trait;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

use crate::codec::PayloadFormat;
use crate::config::gateways::{GatewayDetails, GatewaysConfig};
use crate::domain::TransactionType;
use crate::ports::{GatewayClient, GatewayClientError};

type Breaker = StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>;

pub const TRANSACTION_ID_HEADER: &str = "x-transaction-id";
pub const CALLBACK_URL_HEADER: &str = "x-callback-url";

/// HTTP client for delivering transactions to payment gateways.
///
/// Every configured gateway gets its own circuit breaker so one failing
/// provider does not trip calls to the others.
#[derive(Clone)]
pub struct HttpGatewayClient {
    client: Client,
    public_base_url: String,
    breakers: HashMap<String, Breaker>,
}

impl HttpGatewayClient {
    pub fn new(gateways: &GatewaysConfig, public_base_url: impl Into<String>) -> Self {
        Self::with_circuit_breaker(gateways, public_base_url, 5, 30)
    }

    pub fn with_circuit_breaker(
        gateways: &GatewaysConfig,
        public_base_url: impl Into<String>,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let breakers = gateways
            .gateways
            .keys()
            .map(|name| {
                let backoff = backoff::equal_jittered(
                    Duration::from_secs(reset_timeout_secs),
                    Duration::from_secs(reset_timeout_secs * 2),
                );
                let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
                (name.clone(), Config::new().failure_policy(policy).build())
            })
            .collect();

        HttpGatewayClient {
            client,
            public_base_url: public_base_url.into(),
            breakers,
        }
    }

    /// "closed" or "open" for a configured gateway, `None` otherwise.
    pub fn circuit_state(&self, gateway_name: &str) -> Option<&'static str> {
        self.breakers.get(gateway_name).map(|breaker| {
            if breaker.is_call_permitted() {
                "closed"
            } else {
                "open"
            }
        })
    }

    /// Absolute callback URL; relative paths are served from our public base.
    fn callback_url(&self, details: &GatewayDetails) -> Option<String> {
        let callback = details.callback_url.trim();
        if callback.is_empty() {
            None
        } else if callback.starts_with("http://") || callback.starts_with("https://") {
            Some(callback.to_string())
        } else {
            Some(format!(
                "{}/{}",
                self.public_base_url.trim_end_matches('/'),
                callback.trim_start_matches('/')
            ))
        }
    }

    fn headers(
        &self,
        format: PayloadFormat,
        transaction_id: i64,
        details: &GatewayDetails,
    ) -> Result<HeaderMap, GatewayClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(format.content_type()));

        for (key, value) in &details.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| GatewayClientError::InvalidHeader(key.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| GatewayClientError::InvalidHeader(key.clone()))?;
            headers.insert(name, value);
        }

        headers.insert(
            HeaderName::from_static(TRANSACTION_ID_HEADER),
            HeaderValue::from(transaction_id),
        );

        if let Some(callback) = self.callback_url(details) {
            let value = HeaderValue::from_str(&callback)
                .map_err(|_| GatewayClientError::InvalidHeader(CALLBACK_URL_HEADER.to_string()))?;
            headers.insert(HeaderName::from_static(CALLBACK_URL_HEADER), value);
        }

        Ok(headers)
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    async fn send_transaction(
        &self,
        gateway_name: &str,
        kind: TransactionType,
        payload: &[u8],
        transaction_id: i64,
        format: PayloadFormat,
        details: &GatewayDetails,
    ) -> Result<(), GatewayClientError> {
        let breaker = self
            .breakers
            .get(gateway_name)
            .ok_or_else(|| GatewayClientError::UnknownGateway(gateway_name.to_string()))?;

        let mut request = self
            .client
            .post(details.url_for(kind))
            .headers(self.headers(format, transaction_id, details)?)
            .body(payload.to_vec());
        if details.timeout > 0 {
            request = request.timeout(details.timeout());
        }

        let result = breaker
            .call(async move {
                let response = request.send().await?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(GatewayClientError::Status {
                        status: status.as_u16(),
                        body,
                    });
                }
                Ok(())
            })
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(FailsafeError::Rejected) => Err(GatewayClientError::CircuitOpen(format!(
                "{} circuit breaker is open",
                gateway_name
            ))),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}
