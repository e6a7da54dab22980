#![forbid(unsafe_code)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

pub mod upstream;

pub use upstream::{UpstreamClient, UpstreamSettings};

/// Wire body of the upstream `sms/send` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryRequest {
    pub from_did: String,
    pub to_did: String,
    pub message: String,
}

/// Upstream acknowledgement. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeliveryResponse {
    pub code: Option<i64>,
    pub status: Option<String>,
    pub data: JsonValue,
    pub guid: Option<String>,
}

impl DeliveryResponse {
    /// Correlation id; `None` when absent or empty, which means rejected.
    pub fn guid(&self) -> Option<&str> {
        self.guid.as_deref().filter(|guid| !guid.is_empty())
    }

    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or_default()
    }

    pub fn data_text(&self) -> String {
        match &self.data {
            JsonValue::Null => String::new(),
            JsonValue::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("cannot perform POST: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("API error, status {status}")]
    Status { status: u16 },
    #[error("cannot read response: {0}")]
    Body(#[source] reqwest::Error),
    #[error("cannot decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Destination for rewritten texts. Implementations make at most one
/// attempt per call and never retry.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, request: &DeliveryRequest)
        -> Result<DeliveryResponse, DeliveryError>;
}
