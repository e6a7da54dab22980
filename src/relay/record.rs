#![forbid(unsafe_code)]

use crate::delivery::DeliveryRequest;
use std::collections::HashMap;

pub const FROM_FIELD: &str = "from";
pub const TO_FIELD: &str = "to";
pub const MESSAGE_FIELD: &str = "message";
pub const TYPE_FIELD: &str = "type";

pub const DEFAULT_SOURCE: &str = "guest";
pub const DEFAULT_DESTINATION: &str = "UNKNOWN_DEST";
pub const DEFAULT_MESSAGE: &str = "";
pub const DEFAULT_TYPE: &str = "UNKNOWN_TYPE";

/// Inbound text after defaults have been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub source: String,
    pub destination: String,
    pub message: String,
    pub kind: String,
}

impl MessageRecord {
    /// Builds a record from decoded form fields. A field that is absent takes
    /// its default; a field that is present but empty is kept as-is.
    pub fn from_form(form: &HashMap<String, String>) -> Self {
        let field = |name: &str, default: &str| {
            form.get(name)
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            source: field(FROM_FIELD, DEFAULT_SOURCE),
            destination: field(TO_FIELD, DEFAULT_DESTINATION),
            message: field(MESSAGE_FIELD, DEFAULT_MESSAGE),
            kind: field(TYPE_FIELD, DEFAULT_TYPE),
        }
    }

    /// Swaps the envelope so the relay's own number poses as sender and the
    /// mapped target receives the text. `kind` does not survive the rewrite.
    pub fn rewrite(self, target: &str) -> RelayEnvelope {
        let MessageRecord {
            source: original_source,
            destination,
            message,
            kind: _,
        } = self;

        RelayEnvelope {
            source: destination,
            destination: target.to_string(),
            message: relayed_message(&message, &original_source),
        }
    }
}

impl Default for MessageRecord {
    fn default() -> Self {
        Self::from_form(&HashMap::new())
    }
}

/// Outbound envelope produced by [`MessageRecord::rewrite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEnvelope {
    pub source: String,
    pub destination: String,
    pub message: String,
}

impl RelayEnvelope {
    pub fn to_delivery_request(&self) -> DeliveryRequest {
        DeliveryRequest {
            from_did: self.source.trim().to_string(),
            to_did: self.destination.trim().to_string(),
            message: self.message.clone(),
        }
    }
}

pub fn relayed_message(message: &str, original_source: &str) -> String {
    format!("{message}\n- Relayed from: {original_source}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn absent_fields_take_defaults() {
        let record = MessageRecord::from_form(&HashMap::new());

        assert_eq!(record.source, DEFAULT_SOURCE);
        assert_eq!(record.destination, DEFAULT_DESTINATION);
        assert_eq!(record.message, DEFAULT_MESSAGE);
        assert_eq!(record.kind, DEFAULT_TYPE);
    }

    #[test]
    fn present_fields_are_kept_even_when_empty() {
        let record = MessageRecord::from_form(&form(&[
            ("from", ""),
            ("to", "alice"),
            ("type", "sms"),
        ]));

        assert_eq!(record.source, "");
        assert_eq!(record.destination, "alice");
        assert_eq!(record.message, DEFAULT_MESSAGE);
        assert_eq!(record.kind, "sms");
    }

    #[test]
    fn rewrite_swaps_envelope_and_tags_original_sender() {
        let record = MessageRecord::from_form(&form(&[
            ("from", "svc1"),
            ("to", "alice"),
            ("message", "hi"),
        ]));

        let envelope = record.rewrite("bob");

        assert_eq!(envelope.source, "alice");
        assert_eq!(envelope.destination, "bob");
        assert_eq!(envelope.message, "hi\n- Relayed from: svc1");
    }

    #[test]
    fn delivery_request_trims_numbers_but_not_message() {
        let envelope = RelayEnvelope {
            source: " 15550001111 ".to_string(),
            destination: "\t15550002222\n".to_string(),
            message: " padded \n- Relayed from: guest".to_string(),
        };

        let request = envelope.to_delivery_request();

        assert_eq!(request.from_did, "15550001111");
        assert_eq!(request.to_did, "15550002222");
        assert_eq!(request.message, " padded \n- Relayed from: guest");
    }
}
