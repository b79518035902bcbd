//! Payment provider client via REST API (no SDK dependency).

use super::{GatewayError, PaymentGateway, PaymentIntent};
use crate::domain::{Minor, OrderId};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// REST client for the payment provider, authenticated with the secret key.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    base_url: String,
    secret_key: String,
}

impl HttpPaymentGateway {
    pub fn new(base_url: String, secret_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url,
            secret_key,
        }
    }

    /// POST a form-encoded request, retrying transient failures with
    /// exponential backoff bounded at 30 seconds.
    async fn post_form(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<serde_json::Value, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .post(&url)
                .basic_auth(&self.secret_key, None::<&str>)
                .form(form)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(GatewayError::Network(e.to_string())))?;

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                return Err(backoff::Error::transient(GatewayError::Http {
                    status: status.as_u16(),
                    message: "Provider busy".to_string(),
                }));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(backoff::Error::permanent(GatewayError::Rejected(format!(
                    "status {}: {}",
                    status.as_u16(),
                    body
                ))));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(GatewayError::Parse(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_intent(
        &self,
        order_id: &OrderId,
        amount: Minor,
        currency: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        debug!(order_id = %order_id, amount = amount.as_i64(), "Creating payment intent");

        let form = [
            ("amount", amount.as_i64().to_string()),
            ("currency", currency.to_string()),
            ("metadata[order_id]", order_id.to_string()),
        ];
        let resp = self.post_form("/v1/payment_intents", &form).await?;

        let transaction_id = resp["id"]
            .as_str()
            .ok_or_else(|| GatewayError::Parse(format!("intent response missing id: {resp}")))?
            .to_string();
        let client_secret = resp["client_secret"]
            .as_str()
            .ok_or_else(|| {
                GatewayError::Parse(format!("intent response missing client_secret: {resp}"))
            })?
            .to_string();

        Ok(PaymentIntent {
            transaction_id,
            client_secret,
        })
    }

    async fn cancel_intent(&self, transaction_id: &str) -> Result<(), GatewayError> {
        debug!(transaction_id, "Cancelling payment intent");

        self.post_form(
            &format!("/v1/payment_intents/{}/cancel", transaction_id),
            &[],
        )
        .await?;

        Ok(())
    }

    async fn create_transfer(
        &self,
        destination_account: &str,
        amount: Minor,
        currency: &str,
    ) -> Result<String, GatewayError> {
        debug!(
            destination_account,
            amount = amount.as_i64(),
            "Creating transfer"
        );

        let form = [
            ("amount", amount.as_i64().to_string()),
            ("currency", currency.to_string()),
            ("destination", destination_account.to_string()),
        ];
        let resp = self.post_form("/v1/transfers", &form).await?;

        resp["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| GatewayError::Parse(format!("transfer response missing id: {resp}")))
    }

    async fn reverse_transfer(
        &self,
        transfer_id: &str,
        amount: Minor,
    ) -> Result<(), GatewayError> {
        debug!(transfer_id, amount = amount.as_i64(), "Reversing transfer");

        let form = [("amount", amount.as_i64().to_string())];
        self.post_form(&format!("/v1/transfers/{}/reversals", transfer_id), &form)
            .await?;

        Ok(())
    }
}
