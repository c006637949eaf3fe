//! Payload codec for gateway traffic.
//!
//! Two wire formats exist: structured JSON (`application/json`) and XML markup
//! (`text/xml` or `application/xml`). The format is chosen by exact match on
//! the gateway's declared content type.
//!
//! Callback decoding is asymmetric between the two formats: JSON callbacks
//! must carry a numeric `transaction_id` and a string `status`, while XML
//! callbacks only need to parse. Missing XML fields decode as `0` and `""`.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::{Transaction, TransactionStatus};

pub const APPLICATION_JSON: &str = "application/json";
pub const TEXT_XML: &str = "text/xml";
pub const APPLICATION_XML: &str = "application/xml";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unsupported data format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid callback: {0}")]
    InvalidCallback(String),

    #[error("failed to encode payload: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    Json,
    TextXml,
    ApplicationXml,
}

impl PayloadFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            PayloadFormat::Json => APPLICATION_JSON,
            PayloadFormat::TextXml => TEXT_XML,
            PayloadFormat::ApplicationXml => APPLICATION_XML,
        }
    }

    pub fn is_markup(&self) -> bool {
        !matches!(self, PayloadFormat::Json)
    }
}

impl FromStr for PayloadFormat {
    type Err = CodecError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            APPLICATION_JSON => Ok(PayloadFormat::Json),
            TEXT_XML => Ok(PayloadFormat::TextXml),
            APPLICATION_XML => Ok(PayloadFormat::ApplicationXml),
            other => Err(CodecError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.content_type())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename = "transaction")]
struct GatewayPayload<'a> {
    transaction_id: i64,
    amount: &'a BigDecimal,
    currency: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Deserialize)]
struct JsonCallback {
    transaction_id: i64,
    status: String,
}

#[derive(Debug, Deserialize)]
struct XmlCallback {
    #[serde(default)]
    transaction_id: i64,
    #[serde(default)]
    status: String,
}

/// What a gateway callback tells us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackUpdate {
    pub transaction_id: i64,
    pub status: TransactionStatus,
}

/// Encodes the outbound request body for a gateway.
pub fn encode(
    tx: &Transaction,
    currency: &str,
    format: PayloadFormat,
) -> Result<Vec<u8>, CodecError> {
    let payload = GatewayPayload {
        transaction_id: tx.id,
        amount: &tx.amount,
        currency,
        kind: tx.kind.as_str(),
    };

    match format {
        PayloadFormat::Json => {
            serde_json::to_vec(&payload).map_err(|e| CodecError::Encode(e.to_string()))
        }
        PayloadFormat::TextXml | PayloadFormat::ApplicationXml => quick_xml::se::to_string(&payload)
            .map(String::into_bytes)
            .map_err(|e| CodecError::Encode(e.to_string())),
    }
}

/// Decodes a gateway callback body into the transaction id and reported status.
pub fn decode_callback(body: &[u8], format: PayloadFormat) -> Result<CallbackUpdate, CodecError> {
    match format {
        PayloadFormat::Json => {
            let callback: JsonCallback = serde_json::from_slice(body)
                .map_err(|e| CodecError::InvalidCallback(format!("JSON callback: {}", e)))?;
            Ok(CallbackUpdate {
                transaction_id: callback.transaction_id,
                status: TransactionStatus::from(callback.status),
            })
        }
        PayloadFormat::TextXml | PayloadFormat::ApplicationXml => {
            let text = std::str::from_utf8(body)
                .map_err(|e| CodecError::InvalidCallback(format!("XML callback: {}", e)))?;
            let callback: XmlCallback = quick_xml::de::from_str(text)
                .map_err(|e| CodecError::InvalidCallback(format!("XML callback: {}", e)))?;
            Ok(CallbackUpdate {
                transaction_id: callback.transaction_id,
                status: TransactionStatus::from(callback.status),
            })
        }
    }
}
