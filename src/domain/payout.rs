//! Artist payout records.

use crate::domain::{ArtistId, Minor, OrderId, TimeMs};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayoutId(pub Uuid);

impl PayoutId {
    pub fn new() -> Self {
        PayoutId(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(PayoutId)
    }
}

impl Default for PayoutId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PayoutId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Paid,
    Reversed,
}

impl PayoutStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Paid => "paid",
            PayoutStatus::Reversed => "reversed",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PayoutStatus::Pending),
            "paid" => Some(PayoutStatus::Paid),
            "reversed" => Some(PayoutStatus::Reversed),
            _ => None,
        }
    }
}

/// One payout row per paid order item: the artist's net share after the
/// platform fee. Created at order-paid time, paid out once `available_at`
/// passes (or immediately when the delay is zero), and reversed on refund
/// or dispute.
#[derive(Debug, Clone, PartialEq)]
pub struct Payout {
    pub id: PayoutId,
    pub order_id: OrderId,
    pub order_item_id: Uuid,
    pub artist_id: ArtistId,
    pub amount: Minor,
    pub currency: String,
    pub status: PayoutStatus,
    pub available_at: Option<TimeMs>,
    pub transfer_id: Option<String>,
    pub created_at: TimeMs,
}
