#![forbid(unsafe_code)]

use crate::delivery::{DeliveryError, DeliverySink};
use crate::relay::mapping::RelayMapping;
use crate::relay::record::MessageRecord;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Terminal state of one pipeline run. None of them are retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    NoRelay,
    LogOnly,
    TransportError,
    BadStatus { status: u16 },
    DecodeError,
    EmptyGuid,
    Delivered { guid: String },
}

impl RelayOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, RelayOutcome::Delivered { .. })
    }
}

impl Display for RelayOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayOutcome::NoRelay => f.write_str("no-relay"),
            RelayOutcome::LogOnly => f.write_str("log-only"),
            RelayOutcome::TransportError => f.write_str("transport-error"),
            RelayOutcome::BadStatus { status } => write!(f, "bad-status:{status}"),
            RelayOutcome::DecodeError => f.write_str("decode-error"),
            RelayOutcome::EmptyGuid => f.write_str("empty-guid"),
            RelayOutcome::Delivered { .. } => f.write_str("delivered"),
        }
    }
}

/// Resolve, rewrite and forward one inbound text.
pub struct RelayPipeline {
    mapping: Arc<RelayMapping>,
    sink: Option<Arc<dyn DeliverySink>>,
}

impl RelayPipeline {
    /// A pipeline without a sink runs in log-only mode.
    pub fn new(mapping: Arc<RelayMapping>, sink: Option<Arc<dyn DeliverySink>>) -> Self {
        Self { mapping, sink }
    }

    pub fn log_only(&self) -> bool {
        self.sink.is_none()
    }

    pub fn mapping(&self) -> &RelayMapping {
        &self.mapping
    }

    pub async fn run(&self, record: MessageRecord) -> RelayOutcome {
        let Some(target) = self.mapping.resolve(&record.destination) else {
            warn!(to = %record.destination, "missing relay target");
            return RelayOutcome::NoRelay;
        };

        let envelope = record.rewrite(target);

        let Some(sink) = self.sink.as_ref() else {
            info!(
                from = %envelope.source,
                to = %envelope.destination,
                body = %envelope.message,
                "log-only mode, not forwarding message"
            );
            return RelayOutcome::LogOnly;
        };

        let request = envelope.to_delivery_request();
        debug!(from = %request.from_did, to = %request.to_did, "forwarding message");

        let response = match sink.deliver(&request).await {
            Ok(response) => response,
            Err(err) => return report_failure(err),
        };

        let Some(guid) = response.guid() else {
            error!(reason = %response.data_text(), "cannot relay, upstream returned no guid");
            return RelayOutcome::EmptyGuid;
        };

        info!(
            from = %request.from_did,
            to = %request.to_did,
            body = %request.message,
            status = %response.status(),
            data = %response.data_text(),
            guid = %guid,
            "forwarded message"
        );

        RelayOutcome::Delivered {
            guid: guid.to_string(),
        }
    }
}

fn report_failure(err: DeliveryError) -> RelayOutcome {
    match err {
        DeliveryError::Transport(source) => {
            error!(error = %source, "cannot perform POST");
            RelayOutcome::TransportError
        }
        DeliveryError::Status { status } => {
            error!(status, "API error");
            RelayOutcome::BadStatus { status }
        }
        err @ (DeliveryError::Body(_) | DeliveryError::Decode(_)) => {
            error!(error = %err, "cannot decode response");
            RelayOutcome::DecodeError
        }
    }
}
