//! Mock collaborators for testing without network calls.

use super::{
    GatewayError, PaymentGateway, PaymentIntent, ShipmentItem, ShippingOption, ShippingQuoter,
    TaxIdValidator,
};
use crate::domain::{Address, Country, Minor, OrderId};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Mock payment gateway recording every call it receives.
#[derive(Debug, Default)]
pub struct MockPaymentGateway {
    counter: AtomicU64,
    fail_intents: bool,
    fail_transfers: bool,
    pub created_intents: Mutex<Vec<(OrderId, Minor)>>,
    pub cancelled_intents: Mutex<Vec<String>>,
    pub transfers: Mutex<Vec<(String, Minor)>>,
    pub reversals: Mutex<Vec<(String, Minor)>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_intent` fail with a rejection.
    pub fn with_failing_intents(mut self) -> Self {
        self.fail_intents = true;
        self
    }

    /// Make `create_transfer` fail with a network error.
    pub fn with_failing_transfers(mut self) -> Self {
        self.fail_transfers = true;
        self
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}_{:04}", prefix, n)
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_intent(
        &self,
        order_id: &OrderId,
        amount: Minor,
        _currency: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        if self.fail_intents {
            return Err(GatewayError::Rejected("intent declined".to_string()));
        }
        self.created_intents
            .lock()
            .expect("mock lock")
            .push((*order_id, amount));
        let transaction_id = self.next_id("pi");
        Ok(PaymentIntent {
            client_secret: format!("{}_secret", transaction_id),
            transaction_id,
        })
    }

    async fn cancel_intent(&self, transaction_id: &str) -> Result<(), GatewayError> {
        self.cancelled_intents
            .lock()
            .expect("mock lock")
            .push(transaction_id.to_string());
        Ok(())
    }

    async fn create_transfer(
        &self,
        destination_account: &str,
        amount: Minor,
        _currency: &str,
    ) -> Result<String, GatewayError> {
        if self.fail_transfers {
            return Err(GatewayError::Network("transfer endpoint down".to_string()));
        }
        self.transfers
            .lock()
            .expect("mock lock")
            .push((destination_account.to_string(), amount));
        Ok(self.next_id("tr"))
    }

    async fn reverse_transfer(
        &self,
        transfer_id: &str,
        amount: Minor,
    ) -> Result<(), GatewayError> {
        self.reversals
            .lock()
            .expect("mock lock")
            .push((transfer_id.to_string(), amount));
        Ok(())
    }
}

/// Mock shipping quoter returning predefined options.
#[derive(Debug, Default)]
pub struct MockShippingQuoter {
    options: Vec<ShippingOption>,
    fail: bool,
}

impl MockShippingQuoter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_option(mut self, option: ShippingOption) -> Self {
        self.options.push(option);
        self
    }

    /// Make every quote fail, exercising the flat-rate fallback.
    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl ShippingQuoter for MockShippingQuoter {
    async fn quote(
        &self,
        _items: &[ShipmentItem],
        _destination: &Address,
    ) -> Result<Vec<ShippingOption>, GatewayError> {
        if self.fail {
            return Err(GatewayError::Network("carrier API down".to_string()));
        }
        Ok(self.options.clone())
    }
}

/// Mock tax-id validator with a fixed verdict.
#[derive(Debug)]
pub struct MockTaxIdValidator {
    verdict: bool,
    fail: bool,
}

impl MockTaxIdValidator {
    pub fn valid() -> Self {
        Self {
            verdict: true,
            fail: false,
        }
    }

    pub fn invalid() -> Self {
        Self {
            verdict: false,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            verdict: false,
            fail: true,
        }
    }
}

#[async_trait]
impl TaxIdValidator for MockTaxIdValidator {
    async fn validate(&self, _country: &Country, _tax_id: &str) -> Result<bool, GatewayError> {
        if self.fail {
            return Err(GatewayError::Network("registry unavailable".to_string()));
        }
        Ok(self.verdict)
    }
}
