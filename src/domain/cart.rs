//! Cart and cart line types.
//!
//! Cart lines are a tagged enum so pricing, tax, and fulfillment handle each
//! kind exhaustively. Client-supplied prices are advisory only and are
//! re-validated server-side.

use crate::domain::{ArtworkId, EditionId, Minor, TimeMs};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a shopping cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartId(pub Uuid);

impl CartId {
    pub fn new() -> Self {
        CartId(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(CartId)
    }
}

impl Default for CartId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CartId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who the cart belongs to: an authenticated user or an anonymous session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartOwner {
    User(Uuid),
    Anonymous(String),
}

impl CartOwner {
    pub fn kind(&self) -> &'static str {
        match self {
            CartOwner::User(_) => "user",
            CartOwner::Anonymous(_) => "anonymous",
        }
    }

    pub fn id_string(&self) -> String {
        match self {
            CartOwner::User(id) => id.to_string(),
            CartOwner::Anonymous(token) => token.clone(),
        }
    }

    pub fn from_db(kind: &str, id: &str) -> Option<Self> {
        match kind {
            "user" => Uuid::parse_str(id).ok().map(CartOwner::User),
            "anonymous" => Some(CartOwner::Anonymous(id.to_string())),
            _ => None,
        }
    }
}

/// Kind of purchasable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Unique,
    Print,
    Digital,
}

impl ItemKind {
    pub fn as_db(&self) -> &'static str {
        match self {
            ItemKind::Unique => "unique",
            ItemKind::Print => "print",
            ItemKind::Digital => "digital",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "unique" => Some(ItemKind::Unique),
            "print" => Some(ItemKind::Print),
            "digital" => Some(ItemKind::Digital),
            _ => None,
        }
    }

    pub fn is_physical(&self) -> bool {
        !matches!(self, ItemKind::Digital)
    }
}

/// One line of a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartItem {
    /// A one-of-a-kind artwork; quantity is always 1.
    Unique {
        artwork_id: ArtworkId,
        advisory_price: Option<Minor>,
    },
    /// A limited-print edition.
    Print {
        edition_id: EditionId,
        quantity: i64,
        advisory_price: Option<Minor>,
    },
    /// A digital edition; fulfillment mints per-unit entitlement tokens.
    Digital {
        edition_id: EditionId,
        quantity: i64,
        advisory_price: Option<Minor>,
    },
}

impl CartItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            CartItem::Unique { .. } => ItemKind::Unique,
            CartItem::Print { .. } => ItemKind::Print,
            CartItem::Digital { .. } => ItemKind::Digital,
        }
    }

    /// Quantity of this line; forced to 1 for unique artworks.
    pub fn quantity(&self) -> i64 {
        match self {
            CartItem::Unique { .. } => 1,
            CartItem::Print { quantity, .. } | CartItem::Digital { quantity, .. } => *quantity,
        }
    }

    pub fn is_physical(&self) -> bool {
        self.kind().is_physical()
    }

    /// The catalog reference as a display string, for error reporting.
    pub fn reference(&self) -> String {
        match self {
            CartItem::Unique { artwork_id, .. } => artwork_id.to_string(),
            CartItem::Print { edition_id, .. } | CartItem::Digital { edition_id, .. } => {
                edition_id.to_string()
            }
        }
    }
}

/// A mutable shopping cart, destroyed after successful payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub id: CartId,
    pub owner: CartOwner,
    pub currency: String,
    pub items: Vec<CartItem>,
    pub created_at: TimeMs,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_quantity_is_one() {
        let item = CartItem::Unique {
            artwork_id: ArtworkId::new(),
            advisory_price: Some(Minor::new(250_000)),
        };
        assert_eq!(item.quantity(), 1);
        assert_eq!(item.kind(), ItemKind::Unique);
        assert!(item.is_physical());
    }

    #[test]
    fn test_digital_is_not_physical() {
        let item = CartItem::Digital {
            edition_id: EditionId::new(),
            quantity: 4,
            advisory_price: None,
        };
        assert!(!item.is_physical());
        assert_eq!(item.quantity(), 4);
    }

    #[test]
    fn test_item_kind_roundtrip() {
        for kind in [ItemKind::Unique, ItemKind::Print, ItemKind::Digital] {
            assert_eq!(ItemKind::from_db(kind.as_db()), Some(kind));
        }
        assert_eq!(ItemKind::from_db("unknown"), None);
    }

    #[test]
    fn test_cart_owner_roundtrip() {
        let user = CartOwner::User(Uuid::new_v4());
        assert_eq!(
            CartOwner::from_db(user.kind(), &user.id_string()),
            Some(user)
        );

        let anon = CartOwner::Anonymous("sess-42".to_string());
        assert_eq!(
            CartOwner::from_db(anon.kind(), &anon.id_string()),
            Some(anon)
        );
    }
}
