//! Payment-provider webhook events.
//!
//! Events arrive as provider JSON; parsing happens only after the raw-body
//! signature has been verified. Unknown event types are kept around as
//! `Unrecognized` so the reconciler can acknowledge them without acting.

use crate::domain::Minor;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    PaymentSucceeded {
        transaction_id: String,
    },
    PaymentFailed {
        transaction_id: String,
    },
    PaymentCanceled {
        transaction_id: String,
    },
    ChargeRefunded {
        transaction_id: String,
        amount_refunded: Minor,
        charge_amount: Minor,
    },
    DisputeCreated {
        transaction_id: String,
        amount: Minor,
        charge_amount: Minor,
    },
    Unrecognized {
        event_type: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventParseError {
    #[error("event missing id")]
    MissingId,
    #[error("event missing type")]
    MissingType,
    #[error("event {0} missing field {1}")]
    MissingField(String, &'static str),
}

impl ProviderEvent {
    /// Parse a verified provider event envelope.
    ///
    /// Returns the provider event id (used for idempotent replay detection)
    /// alongside the typed event.
    pub fn from_json(value: &serde_json::Value) -> Result<(String, ProviderEvent), EventParseError> {
        let event_id = value["id"]
            .as_str()
            .ok_or(EventParseError::MissingId)?
            .to_string();
        let event_type = value["type"].as_str().ok_or(EventParseError::MissingType)?;
        let object = &value["data"]["object"];

        let field = |name: &'static str| -> Result<String, EventParseError> {
            object[name]
                .as_str()
                .map(String::from)
                .ok_or_else(|| EventParseError::MissingField(event_type.to_string(), name))
        };
        let amount = |name: &'static str| -> Result<Minor, EventParseError> {
            object[name]
                .as_i64()
                .map(Minor::new)
                .ok_or_else(|| EventParseError::MissingField(event_type.to_string(), name))
        };

        let event = match event_type {
            "payment_intent.succeeded" => ProviderEvent::PaymentSucceeded {
                transaction_id: field("id")?,
            },
            "payment_intent.payment_failed" => ProviderEvent::PaymentFailed {
                transaction_id: field("id")?,
            },
            "payment_intent.canceled" => ProviderEvent::PaymentCanceled {
                transaction_id: field("id")?,
            },
            "charge.refunded" => ProviderEvent::ChargeRefunded {
                transaction_id: field("payment_intent")?,
                amount_refunded: amount("amount_refunded")?,
                charge_amount: amount("amount")?,
            },
            "charge.dispute.created" => ProviderEvent::DisputeCreated {
                transaction_id: field("payment_intent")?,
                amount: amount("amount")?,
                charge_amount: amount("charge_amount")?,
            },
            other => ProviderEvent::Unrecognized {
                event_type: other.to_string(),
            },
        };

        Ok((event_id, event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_payment_succeeded() {
        let value = json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": { "object": { "id": "pi_123" } }
        });
        let (event_id, event) = ProviderEvent::from_json(&value).unwrap();
        assert_eq!(event_id, "evt_1");
        assert_eq!(
            event,
            ProviderEvent::PaymentSucceeded {
                transaction_id: "pi_123".to_string()
            }
        );
    }

    #[test]
    fn test_parse_charge_refunded() {
        let value = json!({
            "id": "evt_2",
            "type": "charge.refunded",
            "data": { "object": {
                "payment_intent": "pi_123",
                "amount_refunded": 5000,
                "amount": 10000
            }}
        });
        let (_, event) = ProviderEvent::from_json(&value).unwrap();
        assert_eq!(
            event,
            ProviderEvent::ChargeRefunded {
                transaction_id: "pi_123".to_string(),
                amount_refunded: Minor::new(5000),
                charge_amount: Minor::new(10_000),
            }
        );
    }

    #[test]
    fn test_unknown_type_is_unrecognized() {
        let value = json!({
            "id": "evt_3",
            "type": "customer.created",
            "data": { "object": {} }
        });
        let (_, event) = ProviderEvent::from_json(&value).unwrap();
        assert_eq!(
            event,
            ProviderEvent::Unrecognized {
                event_type: "customer.created".to_string()
            }
        );
    }

    #[test]
    fn test_missing_id_rejected() {
        let value = json!({ "type": "payment_intent.succeeded", "data": { "object": {} } });
        assert_eq!(
            ProviderEvent::from_json(&value).unwrap_err(),
            EventParseError::MissingId
        );
    }

    #[test]
    fn test_missing_field_rejected() {
        let value = json!({
            "id": "evt_4",
            "type": "charge.refunded",
            "data": { "object": { "payment_intent": "pi_1", "amount": 100 } }
        });
        assert!(matches!(
            ProviderEvent::from_json(&value).unwrap_err(),
            EventParseError::MissingField(_, "amount_refunded")
        ));
    }
}
