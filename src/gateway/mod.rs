//! External collaborator adapters: payment provider, shipping quoter, and
//! tax-id validator, plus webhook signature verification.
//!
//! Every adapter is a trait so the orchestration layer receives injected
//! dependencies; implementations must use finite timeouts and surface typed
//! errors so callers choose fallback-vs-abort deliberately.

use crate::domain::{Minor, OrderId};
use async_trait::async_trait;
use std::fmt;

pub mod mock;
pub mod provider;
pub mod shipping;
pub mod signature;
pub mod vat;

pub use mock::{MockPaymentGateway, MockShippingQuoter, MockTaxIdValidator};
pub use provider::HttpPaymentGateway;
pub use shipping::{
    HttpShippingQuoter, ShipmentItem, ShippingMethod, ShippingOption, ShippingQuoter,
};
pub use signature::{sign_payload, verify_event_signature};
pub use vat::{CachingTaxIdValidator, TaxIdValidator};

/// An opened provider transaction tied 1:1 to an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub transaction_id: String,
    /// Opaque secret the storefront hands to the provider's client library.
    pub client_secret: String,
}

/// Payment-provider operations used by checkout and settlement.
#[async_trait]
pub trait PaymentGateway: Send + Sync + fmt::Debug {
    /// Open a provider transaction for the order total, tagged with the
    /// order id for webhook correlation.
    async fn create_intent(
        &self,
        order_id: &OrderId,
        amount: Minor,
        currency: &str,
    ) -> Result<PaymentIntent, GatewayError>;

    /// Cancel an open transaction.
    async fn cancel_intent(&self, transaction_id: &str) -> Result<(), GatewayError>;

    /// Transfer an artist's share to their connected account; returns the
    /// provider transfer id.
    async fn create_transfer(
        &self,
        destination_account: &str,
        amount: Minor,
        currency: &str,
    ) -> Result<String, GatewayError>;

    /// Reverse part or all of a previous transfer.
    async fn reverse_transfer(&self, transfer_id: &str, amount: Minor)
        -> Result<(), GatewayError>;
}

/// Error type for external gateway operations.
#[derive(Debug, Clone)]
pub enum GatewayError {
    /// Network error (e.g., connection timeout, DNS failure)
    Network(String),
    /// HTTP error from the provider
    Http { status: u16, message: String },
    /// Malformed provider response
    Parse(String),
    /// The provider understood and rejected the request
    Rejected(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Network(msg) => write!(f, "Network error: {}", msg),
            GatewayError::Http { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            GatewayError::Parse(msg) => write!(f, "Parse error: {}", msg),
            GatewayError::Rejected(msg) => write!(f, "Rejected: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_display() {
        let err = GatewayError::Network("connection timeout".to_string());
        assert_eq!(err.to_string(), "Network error: connection timeout");

        let err = GatewayError::Http {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error 503: unavailable");

        let err = GatewayError::Rejected("card declined".to_string());
        assert_eq!(err.to_string(), "Rejected: card declined");
    }
}
