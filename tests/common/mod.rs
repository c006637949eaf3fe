#![allow(dead_code)]

use async_trait::async_trait;
use paygate_core::adapters::{InMemoryDirectory, InMemoryTransactionRepository};
use paygate_core::codec::PayloadFormat;
use paygate_core::config::gateways::{GatewayDetails, GatewaysConfig};
use paygate_core::domain::{Country, TransactionType, User};
use paygate_core::middleware::RequestLogConfig;
use paygate_core::ports::{EventPublisher, GatewayClient, GatewayClientError, PublishError};
use paygate_core::services::{
    BreakerConfig, CallbackProcessor, EventDispatcher, GatewaySelector, PublishGuard,
    RetryDelays, TransactionProcessor,
};
use paygate_core::AppState;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const US_USER: i64 = 1;
pub const DE_USER: i64 = 2;
pub const GB_USER: i64 = 3;
pub const CA_USER: i64 = 4;
pub const FR_USER: i64 = 5;

const GATEWAYS: &str = r#"{
    "gateways": {
        "stripe": {
            "base_url": "https://api.stripe.test",
            "endpoints": { "deposit": "/deposits", "withdrawal": "/withdrawals" },
            "callback_url": "/api/callbacks/stripe",
            "timeout": 5,
            "retry": { "max_attempts": 3, "backoff_factor": 2.0 }
        },
        "paypal": {
            "base_url": "https://api.paypal.test",
            "endpoints": { "deposit": "/deposit", "withdrawal": "/payout" },
            "timeout": 5,
            "retry": { "max_attempts": 2, "backoff_factor": 1.0 }
        },
        "soap-gateway": {
            "base_url": "https://soap.gateway.test",
            "endpoints": { "deposit": "/soap/deposit", "withdrawal": "/soap/withdrawal" },
            "timeout": 5,
            "retry": { "max_attempts": 1, "backoff_factor": 1.0 }
        },
        "legacy": {
            "base_url": "https://legacy.gateway.test",
            "endpoints": { "deposit": "/in", "withdrawal": "/out" },
            "timeout": 5
        },
        "ghost": {
            "base_url": "https://ghost.gateway.test",
            "endpoints": { "deposit": "/in", "withdrawal": "/out" },
            "timeout": 5
        }
    },
    "countries": {
        "US": { "gateways": { "stripe": 10, "paypal": 5 } },
        "DE": { "gateways": { "soap-gateway": 10 } },
        "GB": { "gateways": { "paypal": 10 } },
        "CA": { "gateways": { "legacy": 10 } },
        "FR": { "gateways": { "ghost": 10 } }
    }
}"#;

/// Gateway client that fails a scripted number of calls before succeeding.
#[derive(Default)]
pub struct MockGatewayClient {
    failures_remaining: AtomicU32,
    calls: AtomicU32,
    sent: Mutex<Vec<SentRequest>>,
}

#[derive(Debug, Clone)]
pub struct SentRequest {
    pub gateway: String,
    pub kind: TransactionType,
    pub payload: Vec<u8>,
    pub transaction_id: i64,
    pub format: PayloadFormat,
}

impl MockGatewayClient {
    pub fn failing(times: u32) -> Self {
        let client = Self::default();
        client.failures_remaining.store(times, Ordering::SeqCst);
        client
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl GatewayClient for MockGatewayClient {
    async fn send_transaction(
        &self,
        gateway_name: &str,
        kind: TransactionType,
        payload: &[u8],
        transaction_id: i64,
        format: PayloadFormat,
        _details: &GatewayDetails,
    ) -> Result<(), GatewayClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(SentRequest {
            gateway: gateway_name.to_string(),
            kind,
            payload: payload.to_vec(),
            transaction_id,
            format,
        });

        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(GatewayClientError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

/// Publisher that records every message, or fails every call.
#[derive(Default)]
pub struct RecordingPublisher {
    pub fail: bool,
    messages: Mutex<Vec<serde_json::Value>>,
    formats: Mutex<Vec<String>>,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> Vec<serde_json::Value> {
        self.messages.lock().unwrap().clone()
    }

    pub fn formats(&self) -> Vec<String> {
        self.formats.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, _key: &str, message: &[u8], format: &str) -> Result<(), PublishError> {
        if self.fail {
            return Err(PublishError::Transport("broker unavailable".to_string()));
        }
        let value = serde_json::from_slice(message)
            .map_err(|e| PublishError::Transport(e.to_string()))?;
        self.messages.lock().unwrap().push(value);
        self.formats.lock().unwrap().push(format.to_string());
        Ok(())
    }
}

pub struct TestHarness {
    pub directory: Arc<InMemoryDirectory>,
    pub transactions: Arc<InMemoryTransactionRepository>,
    pub client: Arc<MockGatewayClient>,
    pub publisher: Arc<RecordingPublisher>,
    pub gateways: Arc<GatewaysConfig>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with(MockGatewayClient::default(), RecordingPublisher::default())
    }

    pub fn with(client: MockGatewayClient, publisher: RecordingPublisher) -> Self {
        Self::with_config(gateways_config(), client, publisher)
    }

    pub fn with_config(
        gateways: GatewaysConfig,
        client: MockGatewayClient,
        publisher: RecordingPublisher,
    ) -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.add_gateway("stripe", "application/json");
        directory.add_gateway("paypal", "application/json");
        directory.add_gateway("soap-gateway", "text/xml");
        directory.add_gateway("legacy", "text/csv");

        for (code, username) in [
            ("US", "us_user"),
            ("DE", "de_user"),
            ("GB", "gb_user"),
            ("CA", "ca_user"),
            ("FR", "fr_user"),
        ] {
            let country = directory.add_country(Country {
                id: 0,
                name: code.to_string(),
                code: code.to_string(),
                currency: "USD".to_string(),
            });
            directory.add_user(User {
                id: 0,
                username: username.to_string(),
                email: format!("{}@example.com", username),
                country_id: country.id,
            });
        }

        Self {
            directory,
            transactions: Arc::new(InMemoryTransactionRepository::new()),
            client: Arc::new(client),
            publisher: Arc::new(publisher),
            gateways: Arc::new(gateways),
        }
    }

    pub fn events(&self) -> EventDispatcher {
        EventDispatcher::new(
            self.publisher.clone(),
            PublishGuard::new(BreakerConfig::default()),
        )
    }

    pub fn processor(&self) -> TransactionProcessor {
        let selector = GatewaySelector::new(
            self.gateways.clone(),
            self.directory.clone(),
            self.directory.clone(),
            self.directory.clone(),
        );
        TransactionProcessor::new(
            selector,
            self.transactions.clone(),
            self.gateways.clone(),
            self.client.clone(),
            self.events(),
        )
        .with_retry_delays(RetryDelays {
            base: Duration::from_millis(1),
            max: Duration::from_millis(5),
        })
    }

    pub fn callback_processor(&self) -> CallbackProcessor {
        CallbackProcessor::new(self.directory.clone(), self.transactions.clone(), self.events())
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            transaction_processor: Arc::new(self.processor()),
            callback_processor: Arc::new(self.callback_processor()),
            transactions: self.transactions.clone(),
            health_checkers: Vec::new(),
            request_timeout: Duration::from_secs(5),
            request_log: RequestLogConfig::default(),
            start_time: Instant::now(),
        }
    }
}

pub fn gateways_config() -> GatewaysConfig {
    GatewaysConfig::from_json(GATEWAYS).expect("test gateway config is valid")
}
