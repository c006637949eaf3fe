use std::sync::Arc;
use tracing::{info, warn};

use crate::codec::{self, PayloadFormat};
use crate::domain::{EventType, TransactionEvent};
use crate::error::AppError;
use crate::ports::{GatewayRepository, TransactionRepository};

use super::events::EventDispatcher;

/// Applies gateway callbacks to stored transactions.
#[derive(Clone)]
pub struct CallbackProcessor {
    gateways: Arc<dyn GatewayRepository>,
    transactions: Arc<dyn TransactionRepository>,
    events: EventDispatcher,
}

impl CallbackProcessor {
    pub fn new(
        gateways: Arc<dyn GatewayRepository>,
        transactions: Arc<dyn TransactionRepository>,
        events: EventDispatcher,
    ) -> Self {
        Self {
            gateways,
            transactions,
            events,
        }
    }

    /// Decodes `body` in the named gateway's format and stores the reported
    /// status. Nothing is written unless the body decodes.
    pub async fn process_callback(&self, gateway_name: &str, body: &[u8]) -> Result<(), AppError> {
        let gateway = self
            .gateways
            .find_by_name(gateway_name)
            .await
            .map_err(|e| AppError::from(e).context("resolve callback gateway"))?;

        let update = gateway
            .data_format_supported
            .parse::<PayloadFormat>()
            .and_then(|format| codec::decode_callback(body, format))
            .map_err(|e| AppError::from(e).context("decode callback"))?;

        self.transactions
            .update_status(update.transaction_id, &update.status)
            .await
            .map_err(|e| AppError::from(e).context("update transaction status"))?;

        info!(
            transaction_id = update.transaction_id,
            gateway = gateway_name,
            status = %update.status,
            "Callback applied"
        );

        let tx = self
            .transactions
            .get_by_id(update.transaction_id)
            .await
            .map_err(|e| AppError::from(e).context("reload transaction"))?;

        let owner = self
            .gateways
            .find_by_id(tx.gateway_id)
            .await
            .map_err(|e| AppError::from(e).context("resolve transaction gateway"))?;
        if owner.id != gateway.id {
            warn!(
                transaction_id = tx.id,
                callback_gateway = gateway_name,
                transaction_gateway = %owner.name,
                "Callback received from a gateway other than the one that handled the transaction"
            );
        }

        let event = TransactionEvent::from_transaction(&tx, EventType::CallbackProcessed);
        if let Err(e) = self
            .events
            .dispatch(&event, &owner.data_format_supported)
            .await
        {
            warn!(transaction_id = tx.id, error = %e, "Callback event not published");
        }

        Ok(())
    }
}
