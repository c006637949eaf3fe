mod common;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use common::*;
use paygate_core::adapters::InMemoryTransactionRepository;
use paygate_core::codec::PayloadFormat;
use paygate_core::domain::{Transaction, TransactionStatus, TransactionType};
use paygate_core::error::AppError;
use paygate_core::ports::{
    GatewayRepository, RepositoryError, RepositoryResult, TransactionRepository,
};
use paygate_core::services::{
    GatewaySelector, RequestContext, RetryDelays, TransactionProcessor, TransactionRequest,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Store whose transition to PROCESSING always fails.
struct ProcessingUpdateFails {
    inner: Arc<InMemoryTransactionRepository>,
}

#[async_trait]
impl TransactionRepository for ProcessingUpdateFails {
    async fn create(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        self.inner.create(tx).await
    }

    async fn get_by_id(&self, id: i64) -> RepositoryResult<Transaction> {
        self.inner.get_by_id(id).await
    }

    async fn update_status(&self, id: i64, status: &TransactionStatus) -> RepositoryResult<()> {
        if *status == TransactionStatus::Processing {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.update_status(id, status).await
    }
}

fn request(user_id: i64, amount: &str) -> TransactionRequest {
    TransactionRequest {
        amount: BigDecimal::from_str(amount).unwrap(),
        user_id,
        currency: "USD".to_string(),
    }
}

#[tokio::test]
async fn test_deposit_routes_to_highest_priority_gateway() {
    let harness = TestHarness::new();

    let tx = harness
        .processor()
        .process_deposit(&RequestContext::background(), request(US_USER, "100.00"))
        .await
        .unwrap();

    assert!(tx.id > 0);
    assert_eq!(tx.amount, BigDecimal::from_str("100.00").unwrap());
    assert_eq!(tx.kind, TransactionType::Deposit);
    assert_eq!(tx.status, TransactionStatus::Processing);

    let stripe = GatewayRepository::find_by_name(&*harness.directory, "stripe")
        .await
        .unwrap();
    assert_eq!(tx.gateway_id, stripe.id);

    let stored = harness.transactions.get_by_id(tx.id).await.unwrap();
    assert_eq!(stored.status, TransactionStatus::Processing);

    let sent = harness.client.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].gateway, "stripe");
    assert_eq!(sent[0].transaction_id, tx.id);
    assert_eq!(sent[0].format, PayloadFormat::Json);
    let payload: serde_json::Value = serde_json::from_slice(&sent[0].payload).unwrap();
    assert_eq!(payload["transaction_id"], tx.id);
    assert_eq!(payload["currency"], "USD");
    assert_eq!(payload["type"], "deposit");
}

#[tokio::test]
async fn test_withdrawal_publishes_initiated_event() {
    let harness = TestHarness::new();

    let tx = harness
        .processor()
        .process_withdrawal(&RequestContext::background(), request(US_USER, "42.50"))
        .await
        .unwrap();

    let events = harness.publisher.messages();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event_type"], "transaction_initiated");
    assert_eq!(events[0]["transaction_id"], tx.id);
    assert_eq!(events[0]["type"], "withdrawal");
    assert_eq!(events[0]["status"], "PROCESSING");
    assert_eq!(harness.publisher.formats(), vec!["application/json".to_string()]);
    assert_eq!(harness.client.sent()[0].kind, TransactionType::Withdrawal);
}

#[tokio::test]
async fn test_markup_gateway_receives_xml() {
    let harness = TestHarness::new();

    harness
        .processor()
        .process_deposit(&RequestContext::background(), request(DE_USER, "10"))
        .await
        .unwrap();

    let sent = harness.client.sent();
    assert_eq!(sent[0].gateway, "soap-gateway");
    assert_eq!(sent[0].format, PayloadFormat::TextXml);
    let body = String::from_utf8(sent[0].payload.clone()).unwrap();
    assert!(body.starts_with("<transaction>"));
    assert!(body.contains("<type>deposit</type>"));

    // event body stays JSON, the gateway format rides along as the hint
    assert_eq!(harness.publisher.formats(), vec!["text/xml".to_string()]);
    assert_eq!(harness.publisher.messages()[0]["type"], "deposit");
}

#[tokio::test]
async fn test_unconfigured_country_creates_no_record() {
    let mut config = gateways_config();
    config.countries.remove("US");
    let harness = TestHarness::with_config(config, Default::default(), Default::default());

    let err = harness
        .processor()
        .process_deposit(&RequestContext::background(), request(US_USER, "100"))
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), AppError::NotConfigured(_)));
    assert!(harness.transactions.is_empty().await);
    assert_eq!(harness.client.calls(), 0);
}

#[tokio::test]
async fn test_unknown_user_creates_no_record() {
    let harness = TestHarness::new();

    let err = harness
        .processor()
        .process_deposit(&RequestContext::background(), request(99, "100"))
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), AppError::NotFound(_)));
    assert!(harness.transactions.is_empty().await);
}

#[tokio::test]
async fn test_gateway_missing_from_directory_creates_no_record() {
    let harness = TestHarness::new();

    let err = harness
        .processor()
        .process_deposit(&RequestContext::background(), request(FR_USER, "100"))
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), AppError::NotFound(_)));
    assert!(harness.transactions.is_empty().await);
}

#[tokio::test]
async fn test_exhausted_retries_mark_transaction_failed() {
    let harness = TestHarness::with(MockGatewayClient::failing(3), Default::default());

    let err = harness
        .processor()
        .process_deposit(&RequestContext::background(), request(US_USER, "100"))
        .await
        .unwrap_err();

    match err.kind() {
        AppError::GatewayCallFailed { attempts, message } => {
            assert_eq!(*attempts, 3);
            assert!(message.contains("503"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(harness.client.calls(), 3);

    let stored = harness.transactions.get_by_id(1).await.unwrap();
    assert_eq!(stored.status, TransactionStatus::Failed);
    assert!(harness.publisher.messages().is_empty());
}

#[tokio::test]
async fn test_transient_failures_within_budget_succeed() {
    let harness = TestHarness::with(MockGatewayClient::failing(2), Default::default());

    let tx = harness
        .processor()
        .process_deposit(&RequestContext::background(), request(US_USER, "100"))
        .await
        .unwrap();

    assert_eq!(tx.status, TransactionStatus::Processing);
    assert_eq!(harness.client.calls(), 3);
}

#[tokio::test]
async fn test_publish_failure_does_not_fail_transaction() {
    let harness = TestHarness::with(Default::default(), RecordingPublisher::failing());

    let tx = harness
        .processor()
        .process_deposit(&RequestContext::background(), request(US_USER, "100"))
        .await
        .unwrap();

    assert_eq!(tx.status, TransactionStatus::Processing);
    let stored = harness.transactions.get_by_id(tx.id).await.unwrap();
    assert_eq!(stored.status, TransactionStatus::Processing);
}

#[tokio::test]
async fn test_unsupported_format_marks_transaction_failed() {
    let harness = TestHarness::new();

    let err = harness
        .processor()
        .process_deposit(&RequestContext::background(), request(CA_USER, "100"))
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), AppError::UnsupportedFormat(_)));
    assert_eq!(harness.client.calls(), 0);
    let stored = harness.transactions.get_by_id(1).await.unwrap();
    assert_eq!(stored.status, TransactionStatus::Failed);
}

#[tokio::test]
async fn test_missing_call_configuration_marks_transaction_failed() {
    let mut config = gateways_config();
    config.gateways.remove("paypal");
    let harness = TestHarness::with_config(config, Default::default(), Default::default());

    let err = harness
        .processor()
        .process_deposit(&RequestContext::background(), request(GB_USER, "100"))
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), AppError::NotConfigured(_)));
    let stored = harness.transactions.get_by_id(1).await.unwrap();
    assert_eq!(stored.status, TransactionStatus::Failed);
}

#[tokio::test]
async fn test_cancelled_request_creates_no_record() {
    let harness = TestHarness::new();
    let (ctx, handle) = RequestContext::background().cancellable();
    handle.cancel();

    let err = harness
        .processor()
        .process_deposit(&ctx, request(US_USER, "100"))
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), AppError::Cancelled));
    assert!(harness.transactions.is_empty().await);
    assert_eq!(harness.client.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_during_backoff_marks_transaction_failed() {
    let harness = TestHarness::with(MockGatewayClient::failing(10), Default::default());
    let processor = harness.processor().with_retry_delays(RetryDelays {
        base: Duration::from_secs(5),
        max: Duration::from_secs(5),
    });
    let ctx = RequestContext::with_timeout(Duration::from_millis(200));

    let err = processor
        .process_deposit(&ctx, request(US_USER, "100"))
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), AppError::Cancelled));
    assert!(err.to_string().contains("call gateway"));
    assert_eq!(harness.client.calls(), 1);
    let stored = harness.transactions.get_by_id(1).await.unwrap();
    assert_eq!(stored.status, TransactionStatus::Failed);
    assert!(harness.publisher.messages().is_empty());
}

#[tokio::test]
async fn test_failed_processing_update_is_returned_to_caller() {
    let harness = TestHarness::new();
    let selector = GatewaySelector::new(
        harness.gateways.clone(),
        harness.directory.clone(),
        harness.directory.clone(),
        harness.directory.clone(),
    );
    let processor = TransactionProcessor::new(
        selector,
        Arc::new(ProcessingUpdateFails {
            inner: harness.transactions.clone(),
        }),
        harness.gateways.clone(),
        harness.client.clone(),
        harness.events(),
    );

    let err = processor
        .process_deposit(&RequestContext::background(), request(US_USER, "100"))
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), AppError::StoreFailure(_)));
    assert_eq!(harness.client.calls(), 1);
    let stored = harness.transactions.get_by_id(1).await.unwrap();
    assert_eq!(stored.status, TransactionStatus::Pending);
    assert!(harness.publisher.messages().is_empty());
}
