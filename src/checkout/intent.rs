//! Payment-intent orchestration: cart validation through provider intent.

use crate::config::Config;
use crate::db::Repository;
use crate::domain::{
    Address, CartId, Country, ItemKind, Minor, Order, OrderId, OrderItem, OrderStatus,
    TaxBreakdown, TimeMs,
};
use crate::engine::{
    price_cart, resolve_tax, IssueKind, LineSnapshot, PricedCart, TaxPolicy, ValidatedBusiness,
    ValidationIssue,
};
use crate::gateway::{
    GatewayError, PaymentGateway, ShipmentItem, ShippingMethod, ShippingOption, ShippingQuoter,
    TaxIdValidator,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart not found")]
    CartNotFound,
    #[error("cart is empty")]
    EmptyCart,
    #[error("an address is required to determine destination")]
    MissingAddress,
    #[error("cart validation failed")]
    Rejected(Vec<ValidationIssue>),
    #[error("order not found")]
    OrderNotFound,
    #[error("order is not pending")]
    NotPending,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Buyer-supplied business identity for reverse-charge treatment.
#[derive(Debug, Clone)]
pub struct BusinessDetails {
    pub country: Country,
    pub tax_id: String,
}

#[derive(Debug, Clone)]
pub struct CreateIntentRequest {
    pub cart_id: CartId,
    pub email: Option<String>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub shipping_method: Option<ShippingMethod>,
    pub business: Option<BusinessDetails>,
}

#[derive(Debug, Clone)]
pub struct CreateIntentResponse {
    pub client_secret: String,
    pub order_id: OrderId,
    pub tax: TaxBreakdown,
}

/// Orchestrates checkout: pricing, shipping, tax, the order snapshot, holds,
/// and the provider transaction. All collaborators are injected; lifecycle
/// belongs to the composition root.
pub struct CheckoutService {
    repo: Arc<Repository>,
    gateway: Arc<dyn PaymentGateway>,
    quoter: Option<Arc<dyn ShippingQuoter>>,
    vat: Arc<dyn TaxIdValidator>,
    config: Config,
}

impl CheckoutService {
    pub fn new(
        repo: Arc<Repository>,
        gateway: Arc<dyn PaymentGateway>,
        quoter: Option<Arc<dyn ShippingQuoter>>,
        vat: Arc<dyn TaxIdValidator>,
        config: Config,
    ) -> Self {
        Self {
            repo,
            gateway,
            quoter,
            vat,
            config,
        }
    }

    /// Convert a cart into a pending order with an open provider transaction.
    ///
    /// All-or-nothing from the caller's perspective: a hold conflict or a
    /// gateway failure after the order row was written rolls the order back.
    pub async fn create_payment_intent(
        &self,
        request: CreateIntentRequest,
    ) -> Result<CreateIntentResponse, CheckoutError> {
        let now = TimeMs::now();

        let cart = self
            .repo
            .get_cart(&request.cart_id)
            .await?
            .ok_or(CheckoutError::CartNotFound)?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let snapshots = self.repo.line_snapshots(&cart.items).await?;
        let priced =
            price_cart(&cart.items, &snapshots, now).map_err(CheckoutError::Rejected)?;

        // Physical goods ship somewhere; digital-only orders are taxed at
        // the billing address.
        let destination = if priced.has_physical_goods {
            request
                .shipping_address
                .as_ref()
                .ok_or(CheckoutError::MissingAddress)?
        } else {
            request
                .billing_address
                .as_ref()
                .or(request.shipping_address.as_ref())
                .ok_or(CheckoutError::MissingAddress)?
        };

        let shipping = self
            .resolve_shipping(&priced, &snapshots, destination, request.shipping_method)
            .await;

        let business = self.validate_business(request.business.as_ref()).await;
        let policy = TaxPolicy {
            home_country: self.config.home_country.clone(),
            jurisdiction: self.config.tax_jurisdiction.clone(),
            rate_bps: self.config.tax_rate_bps,
        };
        let breakdown = resolve_tax(&priced.lines, destination.country(), business.as_ref(), &policy);

        let order_id = OrderId::new();
        let items: Vec<OrderItem> = priced
            .lines
            .iter()
            .map(|line| OrderItem {
                id: Uuid::new_v4(),
                order_id,
                kind: line.kind,
                artwork_id: line.artwork_id,
                edition_id: line.edition_id,
                artist_id: line.artist_id,
                unit_price: line.unit_price,
                quantity: line.quantity,
                subtotal: line.subtotal,
                refunded_qty: 0,
            })
            .collect();

        let total = priced.subtotal + breakdown.total + shipping;
        let order = Order {
            id: order_id,
            cart_id: cart.id,
            buyer_email: request.email.clone(),
            currency: cart.currency.clone(),
            subtotal: priced.subtotal,
            tax: breakdown.total,
            shipping,
            total,
            refunded: Minor::zero(),
            status: OrderStatus::Pending,
            transaction_id: None,
            destination_country: Some(destination.country().clone()),
            tax_treatment: breakdown.treatment,
            created_at: now,
            cancelled_at: None,
        };

        // Prices snapshotted here are never recomputed later.
        self.repo.insert_order_with_items(&order, &items).await?;

        if let Err(err) = self.acquire_unique_holds(&priced, &order_id, now).await {
            self.rollback_order(&order_id).await;
            return Err(err);
        }

        let intent = match self
            .gateway
            .create_intent(&order_id, total, &cart.currency)
            .await
        {
            Ok(intent) => intent,
            Err(e) => {
                // Payment-gateway failure aborts checkout entirely.
                self.rollback_order(&order_id).await;
                return Err(CheckoutError::Gateway(e));
            }
        };
        self.repo
            .set_order_transaction(&order_id, &intent.transaction_id)
            .await?;

        info!(
            order_id = %order_id,
            total = total.as_i64(),
            transaction_id = %intent.transaction_id,
            "Payment intent created"
        );

        Ok(CreateIntentResponse {
            client_secret: intent.client_secret,
            order_id,
            tax: breakdown,
        })
    }

    /// Cancel a pending order: provider transaction, holds, then status.
    /// A second call finds the order no longer pending and fails.
    pub async fn cancel_payment_intent(&self, order_id: &OrderId) -> Result<(), CheckoutError> {
        let order = self
            .repo
            .get_order(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound)?;
        if order.status != OrderStatus::Pending {
            return Err(CheckoutError::NotPending);
        }

        if let Some(transaction_id) = &order.transaction_id {
            self.gateway.cancel_intent(transaction_id).await?;
        }

        self.repo.release_holds_for_order(order_id).await?;
        self.repo
            .set_order_status_if(
                order_id,
                OrderStatus::Pending,
                OrderStatus::Cancelled,
                Some(TimeMs::now()),
            )
            .await?;

        info!(order_id = %order_id, "Payment intent cancelled");
        Ok(())
    }

    /// Claim a hold for every unique line, tied to the new order.
    async fn acquire_unique_holds(
        &self,
        priced: &PricedCart,
        order_id: &OrderId,
        now: TimeMs,
    ) -> Result<(), CheckoutError> {
        for line in &priced.lines {
            let Some(artwork_id) = line.artwork_id else {
                continue;
            };
            let acquired = self
                .repo
                .acquire_hold(&artwork_id, order_id, self.config.hold_ttl_minutes, now)
                .await?;
            if !acquired {
                // Lost the race since validation; surface as reserved.
                return Err(CheckoutError::Rejected(vec![ValidationIssue {
                    kind: IssueKind::ItemReserved,
                    reference: artwork_id.to_string(),
                    detail: "artwork was reserved by a concurrent checkout".to_string(),
                }]));
            }
        }
        Ok(())
    }

    /// Shipping cost policy: zero for digital-only carts, the flat base rate
    /// for print-only physical carts, and a quoter round-trip for carts with
    /// unique pieces. Quoter unavailability falls back to the flat rate
    /// rather than aborting checkout.
    async fn resolve_shipping(
        &self,
        priced: &PricedCart,
        snapshots: &[LineSnapshot],
        destination: &Address,
        requested: Option<ShippingMethod>,
    ) -> Minor {
        if !priced.has_physical_goods {
            return Minor::zero();
        }

        let flat = Minor::new(self.config.flat_shipping_minor);
        if !priced.has_unique_goods() {
            return flat;
        }

        let Some(quoter) = &self.quoter else {
            return flat;
        };

        let shipment: Vec<ShipmentItem> = snapshots
            .iter()
            .filter_map(|snapshot| match snapshot {
                LineSnapshot::Unique { artwork, .. } => Some(ShipmentItem {
                    kind: ItemKind::Unique,
                    qty: 1,
                    width_cm: artwork.width_cm,
                    height_cm: artwork.height_cm,
                    depth_cm: artwork.depth_cm,
                    framed: artwork.framed,
                }),
                _ => None,
            })
            .collect();

        match quoter.quote(&shipment, destination).await {
            Ok(options) => {
                match select_option(&options, requested.unwrap_or(ShippingMethod::Standard)) {
                    Some(option) => option.amount,
                    None => {
                        warn!("Quoter returned no usable option; using flat rate");
                        flat
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Shipping quote failed; using flat rate");
                flat
            }
        }
    }

    async fn validate_business(
        &self,
        business: Option<&BusinessDetails>,
    ) -> Option<ValidatedBusiness> {
        let business = business?;
        let valid = match self
            .vat
            .validate(&business.country, &business.tax_id)
            .await
        {
            Ok(valid) => valid,
            Err(e) => {
                // An unverifiable id gets the standard treatment, never a
                // blocked checkout.
                warn!(error = %e, "Tax id validation failed; treating as unvalidated");
                false
            }
        };
        Some(ValidatedBusiness {
            country: business.country.clone(),
            tax_id: business.tax_id.clone(),
            tax_id_valid: valid,
        })
    }

    /// Best-effort rollback of a partially created order.
    async fn rollback_order(&self, order_id: &OrderId) {
        if let Err(e) = self.repo.release_holds_for_order(order_id).await {
            error!(order_id = %order_id, error = %e, "Rollback: hold release failed");
        }
        if let Err(e) = self.repo.delete_order(order_id).await {
            error!(order_id = %order_id, error = %e, "Rollback: order delete failed");
        }
    }
}

/// Requested method first, then STANDARD, then EXPRESS.
fn select_option(
    options: &[ShippingOption],
    requested: ShippingMethod,
) -> Option<&ShippingOption> {
    options
        .iter()
        .find(|o| o.method == requested)
        .or_else(|| {
            options
                .iter()
                .find(|o| o.method == ShippingMethod::Standard)
        })
        .or_else(|| options.iter().find(|o| o.method == ShippingMethod::Express))
}
