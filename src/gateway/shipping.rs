//! Shipping quote collaborator.
//!
//! The packing/quoting algorithm is an external black box; this module only
//! carries the request/response contract and an HTTP client with a finite
//! timeout. Fallback to the flat rate is the caller's decision, made on the
//! typed error rather than inside the adapter.

use super::GatewayError;
use crate::domain::{Address, ItemKind, Minor};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Shipping service level requested by the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMethod {
    Standard,
    Express,
}

impl ShippingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingMethod::Standard => "standard",
            ShippingMethod::Express => "express",
        }
    }
}

/// One physical piece to quote, with the dimensions the packer needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentItem {
    pub kind: ItemKind,
    pub qty: i64,
    pub width_cm: f64,
    pub height_cm: f64,
    pub depth_cm: f64,
    pub framed: bool,
}

/// A priced shipping option returned by the quoter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingOption {
    pub method: ShippingMethod,
    pub service_name: String,
    pub amount: Minor,
}

/// External shipping quote service.
#[async_trait]
pub trait ShippingQuoter: Send + Sync + fmt::Debug {
    async fn quote(
        &self,
        items: &[ShipmentItem],
        destination: &Address,
    ) -> Result<Vec<ShippingOption>, GatewayError>;
}

/// HTTP implementation of the quote contract.
#[derive(Debug, Clone)]
pub struct HttpShippingQuoter {
    client: Client,
    base_url: String,
}

impl HttpShippingQuoter {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, base_url }
    }
}

#[async_trait]
impl ShippingQuoter for HttpShippingQuoter {
    async fn quote(
        &self,
        items: &[ShipmentItem],
        destination: &Address,
    ) -> Result<Vec<ShippingOption>, GatewayError> {
        let url = format!("{}/quote", self.base_url);
        let payload = serde_json::json!({
            "items": items,
            "shipTo": destination,
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Http {
                status: status.as_u16(),
                message: "Quote request failed".to_string(),
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        let options = body["options"]
            .as_array()
            .ok_or_else(|| GatewayError::Parse("quote response missing options".to_string()))?;

        options
            .iter()
            .map(|o| {
                serde_json::from_value::<ShippingOption>(o.clone())
                    .map_err(|e| GatewayError::Parse(e.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipment_item_serializes_quote_contract() {
        let item = ShipmentItem {
            kind: ItemKind::Unique,
            qty: 1,
            width_cm: 60.0,
            height_cm: 80.0,
            depth_cm: 4.0,
            framed: true,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"], "unique");
        assert_eq!(json["widthCm"], 60.0);
        assert_eq!(json["framed"], true);
    }

    #[test]
    fn test_shipping_option_parses() {
        let json = serde_json::json!({
            "method": "express",
            "serviceName": "Courier 24h",
            "amount": 7800
        });
        let option: ShippingOption = serde_json::from_value(json).unwrap();
        assert_eq!(option.method, ShippingMethod::Express);
        assert_eq!(option.amount, Minor::new(7800));
    }
}
