//! Order and order-item ledger types.
//!
//! An order's identity and item snapshots are immutable once created. The
//! status field (plus refunded amount and cancellation timestamp) is the only
//! mutable state, and only the webhook reconciler transitions it.

use crate::domain::{ArtistId, ArtworkId, CartId, Country, EditionId, ItemKind, Minor, TaxTreatment, TimeMs};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub Uuid);

impl OrderId {
    pub fn new() -> Self {
        OrderId(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(OrderId)
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order payment state.
///
/// Transitions are monotonic: `Pending` moves to exactly one of `Paid`,
/// `Failed`, or `Cancelled`. `Paid` may accumulate partial refunds via the
/// refunded amount without changing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "failed" => Some(OrderStatus::Failed),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

/// An order: the immutable financial record of a checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub cart_id: CartId,
    pub buyer_email: Option<String>,
    pub currency: String,
    pub subtotal: Minor,
    pub tax: Minor,
    pub shipping: Minor,
    pub total: Minor,
    pub refunded: Minor,
    pub status: OrderStatus,
    pub transaction_id: Option<String>,
    pub destination_country: Option<Country>,
    pub tax_treatment: TaxTreatment,
    pub created_at: TimeMs,
    pub cancelled_at: Option<TimeMs>,
}

/// Snapshot of one purchased line.
///
/// Prices are copied from the catalog at order creation and never recomputed;
/// later catalog edits must not change historical orders.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: OrderId,
    pub kind: ItemKind,
    pub artwork_id: Option<ArtworkId>,
    pub edition_id: Option<EditionId>,
    pub artist_id: ArtistId,
    pub unit_price: Minor,
    pub quantity: i64,
    pub subtotal: Minor,
    pub refunded_qty: i64,
}
