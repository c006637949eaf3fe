use bigdecimal::BigDecimal;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::codec::{self, PayloadFormat};
use crate::config::gateways::GatewaysConfig;
use crate::domain::{EventType, Transaction, TransactionEvent, TransactionStatus, TransactionType};
use crate::error::AppError;
use crate::ports::{GatewayClient, TransactionRepository};
use crate::validation::{
    normalize_amount, validate_currency, validate_positive_amount, validate_user_id,
};

use super::context::RequestContext;
use super::events::EventDispatcher;
use super::gateway_selector::GatewaySelector;
use super::retry::{RetryError, RetryPolicy};

/// Body of `POST /deposit` and `POST /withdrawal`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRequest {
    pub amount: BigDecimal,
    pub user_id: i64,
    pub currency: String,
}

impl TransactionRequest {
    /// Checks the request and returns it with a two-place amount and a
    /// normalized currency code.
    pub fn validated(self) -> Result<Self, AppError> {
        validate_positive_amount(&self.amount)?;
        let amount = normalize_amount(&self.amount)?;
        validate_user_id(self.user_id)?;
        let currency = validate_currency(&self.currency)?;
        Ok(Self {
            amount,
            user_id: self.user_id,
            currency,
        })
    }
}

/// Delays between outbound attempts; attempt counts come from each gateway.
#[derive(Debug, Clone, Copy)]
pub struct RetryDelays {
    pub base: Duration,
    pub max: Duration,
}

impl Default for RetryDelays {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            base: policy.base_delay,
            max: policy.max_delay,
        }
    }
}

#[derive(Clone)]
pub struct TransactionProcessor {
    selector: GatewaySelector,
    transactions: Arc<dyn TransactionRepository>,
    gateways_config: Arc<GatewaysConfig>,
    client: Arc<dyn GatewayClient>,
    events: EventDispatcher,
    delays: RetryDelays,
}

impl TransactionProcessor {
    pub fn new(
        selector: GatewaySelector,
        transactions: Arc<dyn TransactionRepository>,
        gateways_config: Arc<GatewaysConfig>,
        client: Arc<dyn GatewayClient>,
        events: EventDispatcher,
    ) -> Self {
        Self {
            selector,
            transactions,
            gateways_config,
            client,
            events,
            delays: RetryDelays::default(),
        }
    }

    pub fn with_retry_delays(mut self, delays: RetryDelays) -> Self {
        self.delays = delays;
        self
    }

    pub async fn process_deposit(
        &self,
        ctx: &RequestContext,
        request: TransactionRequest,
    ) -> Result<Transaction, AppError> {
        self.process(ctx, request, TransactionType::Deposit).await
    }

    pub async fn process_withdrawal(
        &self,
        ctx: &RequestContext,
        request: TransactionRequest,
    ) -> Result<Transaction, AppError> {
        self.process(ctx, request, TransactionType::Withdrawal).await
    }

    async fn process(
        &self,
        ctx: &RequestContext,
        request: TransactionRequest,
        kind: TransactionType,
    ) -> Result<Transaction, AppError> {
        let gateway = self
            .selector
            .select_for_user(ctx, request.user_id)
            .await
            .map_err(|e| e.context("select gateway"))?;

        if ctx.is_cancelled() {
            return Err(AppError::Cancelled.context("create transaction"));
        }

        let pending = Transaction::new(request.user_id, gateway.id, request.amount, kind);
        let mut tx = self
            .transactions
            .create(&pending)
            .await
            .map_err(|e| AppError::from(e).context("create transaction"))?;

        info!(
            transaction_id = tx.id,
            gateway = %gateway.name,
            kind = %kind,
            "Transaction created"
        );

        let Some(details) = self.gateways_config.gateway_details(&gateway.name) else {
            self.mark_failed(tx.id).await;
            return Err(AppError::NotConfigured(format!("gateway {}", gateway.name))
                .context("resolve gateway configuration"));
        };

        let prepared = gateway
            .data_format_supported
            .parse::<PayloadFormat>()
            .and_then(|format| Ok((format, codec::encode(&tx, &request.currency, format)?)));
        let (format, payload) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                self.mark_failed(tx.id).await;
                return Err(AppError::from(e).context("encode payload"));
            }
        };

        let policy = RetryPolicy::new(details.retry.max_attempts, details.retry.backoff_factor)
            .with_delays(self.delays.base, self.delays.max);
        let sent = policy
            .run(ctx, || {
                self.client
                    .send_transaction(&gateway.name, kind, &payload, tx.id, format, details)
            })
            .await;

        if let Err(err) = sent {
            self.mark_failed(tx.id).await;
            return Err(match err {
                RetryError::Exhausted { attempts, last } => {
                    error!(
                        transaction_id = tx.id,
                        gateway = %gateway.name,
                        attempts,
                        error = %last,
                        "Gateway call failed"
                    );
                    AppError::GatewayCallFailed {
                        attempts,
                        message: last.to_string(),
                    }
                }
                RetryError::Cancelled { attempts } => {
                    warn!(
                        transaction_id = tx.id,
                        gateway = %gateway.name,
                        attempts,
                        "Gateway call cancelled"
                    );
                    AppError::Cancelled
                }
            }
            .context("call gateway"));
        }

        self.transactions
            .update_status(tx.id, &TransactionStatus::Processing)
            .await
            .map_err(|e| AppError::from(e).context("update transaction status"))?;
        tx.status = TransactionStatus::Processing;

        let event = TransactionEvent::from_transaction(&tx, EventType::TransactionInitiated);
        if let Err(e) = self
            .events
            .dispatch(&event, &gateway.data_format_supported)
            .await
        {
            warn!(transaction_id = tx.id, error = %e, "Transaction event not published");
        }

        info!(transaction_id = tx.id, status = %tx.status, "Transaction sent to gateway");
        Ok(tx)
    }

    /// Best-effort transition to FAILED; its own failure is only logged.
    async fn mark_failed(&self, id: i64) {
        if let Err(e) = self
            .transactions
            .update_status(id, &TransactionStatus::Failed)
            .await
        {
            warn!(transaction_id = id, error = %e, "Could not mark transaction as FAILED");
        }
    }
}
