//! Cart re-pricing and validation.
//!
//! Prices always come from the catalog snapshot, never from the client.
//! Validation collects every violation before failing so the storefront can
//! show the buyer the full picture; a single issue rejects the whole cart.

use crate::domain::{
    Artwork, ArtistId, ArtworkHold, ArtworkId, CartItem, Edition, EditionId, ItemKind, Minor,
    TimeMs,
};
use serde::Serialize;

/// Catalog state for one cart line, as fetched by the repository.
#[derive(Debug, Clone)]
pub enum LineSnapshot {
    /// A unique artwork together with any hold currently recorded on it.
    Unique {
        artwork: Artwork,
        hold: Option<ArtworkHold>,
    },
    /// A print or digital edition.
    Edition { edition: Edition },
    /// The referenced catalog entity does not exist.
    Missing,
}

/// Validation failure category, surfaced verbatim to the API caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    ItemReserved,
    OutOfStock,
    ItemInvalid,
}

impl IssueKind {
    /// Stable category string for API responses.
    pub fn category(&self) -> &'static str {
        match self {
            IssueKind::ItemReserved => "original_reserved",
            IssueKind::OutOfStock => "out_of_stock",
            IssueKind::ItemInvalid => "item_invalid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    /// The catalog reference the issue applies to.
    pub reference: String,
    pub detail: String,
}

/// One cart line with its authoritative price resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub kind: ItemKind,
    pub artwork_id: Option<ArtworkId>,
    pub edition_id: Option<EditionId>,
    pub artist_id: ArtistId,
    pub unit_price: Minor,
    pub quantity: i64,
    pub subtotal: Minor,
}

/// A fully validated, re-priced cart.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub subtotal: Minor,
    /// False only when every line is digital.
    pub has_physical_goods: bool,
}

impl PricedCart {
    /// Whether any line is a unique physical artwork (drives the shipping
    /// quote path versus the flat print rate).
    pub fn has_unique_goods(&self) -> bool {
        self.lines.iter().any(|l| l.kind == ItemKind::Unique)
    }
}

/// Re-price and validate a cart against catalog snapshots.
///
/// `items` and `snapshots` are parallel: `snapshots[i]` is the catalog state
/// for `items[i]`. Issues across all lines are accumulated; a non-empty list
/// rejects the cart atomically.
pub fn price_cart(
    items: &[CartItem],
    snapshots: &[LineSnapshot],
    now: TimeMs,
) -> Result<PricedCart, Vec<ValidationIssue>> {
    debug_assert_eq!(items.len(), snapshots.len());

    let mut issues = Vec::new();
    let mut lines = Vec::with_capacity(items.len());

    for (item, snapshot) in items.iter().zip(snapshots.iter()) {
        match (item, snapshot) {
            (CartItem::Unique { artwork_id, .. }, LineSnapshot::Unique { artwork, hold }) => {
                if !artwork.status.is_purchasable() {
                    issues.push(ValidationIssue {
                        kind: IssueKind::ItemInvalid,
                        reference: artwork_id.to_string(),
                        detail: format!("artwork is {}", artwork.status.as_db()),
                    });
                    continue;
                }
                // No claiming order exists yet at validation time, so any
                // live hold belongs to someone else.
                if let Some(hold) = hold {
                    if !hold.is_expired(now) {
                        issues.push(ValidationIssue {
                            kind: IssueKind::ItemReserved,
                            reference: artwork_id.to_string(),
                            detail: "artwork is reserved by another checkout".to_string(),
                        });
                        continue;
                    }
                }
                lines.push(PricedLine {
                    kind: ItemKind::Unique,
                    artwork_id: Some(artwork.id),
                    edition_id: None,
                    artist_id: artwork.artist_id,
                    unit_price: artwork.price,
                    quantity: 1,
                    subtotal: artwork.price,
                });
            }
            (
                CartItem::Print { edition_id, .. } | CartItem::Digital { edition_id, .. },
                LineSnapshot::Edition { edition },
            ) => {
                let quantity = item.quantity();
                if quantity < 1 {
                    issues.push(ValidationIssue {
                        kind: IssueKind::ItemInvalid,
                        reference: edition_id.to_string(),
                        detail: format!("invalid quantity {}", quantity),
                    });
                    continue;
                }
                if !edition.status.is_purchasable() {
                    issues.push(ValidationIssue {
                        kind: IssueKind::ItemInvalid,
                        reference: edition_id.to_string(),
                        detail: format!("edition is {}", edition.status.as_db()),
                    });
                    continue;
                }
                if edition.digital != matches!(item, CartItem::Digital { .. }) {
                    issues.push(ValidationIssue {
                        kind: IssueKind::ItemInvalid,
                        reference: edition_id.to_string(),
                        detail: "line kind does not match the edition".to_string(),
                    });
                    continue;
                }
                if !edition.has_stock(quantity) {
                    issues.push(ValidationIssue {
                        kind: IssueKind::OutOfStock,
                        reference: edition_id.to_string(),
                        detail: format!(
                            "requested {} but only {} available",
                            quantity,
                            edition.available.unwrap_or(0)
                        ),
                    });
                    continue;
                }
                lines.push(PricedLine {
                    kind: item.kind(),
                    artwork_id: None,
                    edition_id: Some(edition.id),
                    artist_id: edition.artist_id,
                    unit_price: edition.unit_price,
                    quantity,
                    subtotal: edition.unit_price.times(quantity),
                });
            }
            (item, LineSnapshot::Missing) => {
                issues.push(ValidationIssue {
                    kind: IssueKind::ItemInvalid,
                    reference: item.reference(),
                    detail: "listing not found".to_string(),
                });
            }
            (item, _) => {
                issues.push(ValidationIssue {
                    kind: IssueKind::ItemInvalid,
                    reference: item.reference(),
                    detail: "listing kind does not match the cart line".to_string(),
                });
            }
        }
    }

    if !issues.is_empty() {
        return Err(issues);
    }

    let subtotal = lines.iter().map(|l| l.subtotal).sum();
    let has_physical_goods = lines.iter().any(|l| l.kind.is_physical());

    Ok(PricedCart {
        lines,
        subtotal,
        has_physical_goods,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArtistId, ListingStatus, OrderId};

    fn artwork(price: i64, status: ListingStatus) -> Artwork {
        Artwork {
            id: ArtworkId::new(),
            artist_id: ArtistId::new(),
            title: "Untitled".to_string(),
            price: Minor::new(price),
            currency: "eur".to_string(),
            status,
            width_cm: 60.0,
            height_cm: 80.0,
            depth_cm: 4.0,
            framed: true,
            created_at: TimeMs::new(0),
        }
    }

    fn edition(price: i64, available: Option<i64>, digital: bool) -> Edition {
        Edition {
            id: EditionId::new(),
            artist_id: ArtistId::new(),
            title: "Edition".to_string(),
            unit_price: Minor::new(price),
            currency: "eur".to_string(),
            status: ListingStatus::Published,
            available,
            digital,
            created_at: TimeMs::new(0),
        }
    }

    #[test]
    fn test_prices_come_from_catalog_not_client() {
        let art = artwork(250_000, ListingStatus::Published);
        let items = vec![CartItem::Unique {
            artwork_id: art.id,
            // Client claims a lower price; it must be ignored.
            advisory_price: Some(Minor::new(1)),
        }];
        let snapshots = vec![LineSnapshot::Unique {
            artwork: art,
            hold: None,
        }];

        let priced = price_cart(&items, &snapshots, TimeMs::new(0)).unwrap();
        assert_eq!(priced.subtotal, Minor::new(250_000));
        assert!(priced.has_physical_goods);
        assert!(priced.has_unique_goods());
    }

    #[test]
    fn test_live_hold_rejects_with_reserved() {
        let art = artwork(250_000, ListingStatus::Published);
        let hold = ArtworkHold {
            artwork_id: art.id,
            order_id: OrderId::new(),
            expires_at: TimeMs::new(10_000),
        };
        let items = vec![CartItem::Unique {
            artwork_id: art.id,
            advisory_price: None,
        }];
        let snapshots = vec![LineSnapshot::Unique {
            artwork: art,
            hold: Some(hold),
        }];

        let issues = price_cart(&items, &snapshots, TimeMs::new(5_000)).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::ItemReserved);
        assert_eq!(issues[0].kind.category(), "original_reserved");
    }

    #[test]
    fn test_expired_hold_is_ignored() {
        let art = artwork(250_000, ListingStatus::Published);
        let hold = ArtworkHold {
            artwork_id: art.id,
            order_id: OrderId::new(),
            expires_at: TimeMs::new(10_000),
        };
        let items = vec![CartItem::Unique {
            artwork_id: art.id,
            advisory_price: None,
        }];
        let snapshots = vec![LineSnapshot::Unique {
            artwork: art,
            hold: Some(hold),
        }];

        assert!(price_cart(&items, &snapshots, TimeMs::new(10_000)).is_ok());
    }

    #[test]
    fn test_out_of_stock_and_withdrawn_accumulate() {
        let ed = edition(5000, Some(1), false);
        let withdrawn = artwork(90_000, ListingStatus::Withdrawn);

        let items = vec![
            CartItem::Print {
                edition_id: ed.id,
                quantity: 2,
                advisory_price: None,
            },
            CartItem::Unique {
                artwork_id: withdrawn.id,
                advisory_price: None,
            },
        ];
        let snapshots = vec![
            LineSnapshot::Edition { edition: ed },
            LineSnapshot::Unique {
                artwork: withdrawn,
                hold: None,
            },
        ];

        let issues = price_cart(&items, &snapshots, TimeMs::new(0)).unwrap_err();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].kind, IssueKind::OutOfStock);
        assert_eq!(issues[1].kind, IssueKind::ItemInvalid);
    }

    #[test]
    fn test_unlimited_edition_skips_stock_check() {
        let ed = edition(2000, None, true);
        let items = vec![CartItem::Digital {
            edition_id: ed.id,
            quantity: 500,
            advisory_price: None,
        }];
        let snapshots = vec![LineSnapshot::Edition { edition: ed }];

        let priced = price_cart(&items, &snapshots, TimeMs::new(0)).unwrap();
        assert_eq!(priced.subtotal, Minor::new(1_000_000));
        assert!(!priced.has_physical_goods);
    }

    #[test]
    fn test_digital_only_cart_has_no_physical_goods() {
        let ed = edition(1500, Some(10), true);
        let items = vec![CartItem::Digital {
            edition_id: ed.id,
            quantity: 2,
            advisory_price: None,
        }];
        let snapshots = vec![LineSnapshot::Edition { edition: ed }];

        let priced = price_cart(&items, &snapshots, TimeMs::new(0)).unwrap();
        assert!(!priced.has_physical_goods);
        assert!(!priced.has_unique_goods());
    }

    #[test]
    fn test_missing_listing_is_invalid() {
        let items = vec![CartItem::Unique {
            artwork_id: ArtworkId::new(),
            advisory_price: None,
        }];
        let snapshots = vec![LineSnapshot::Missing];

        let issues = price_cart(&items, &snapshots, TimeMs::new(0)).unwrap_err();
        assert_eq!(issues[0].kind, IssueKind::ItemInvalid);
    }

    #[test]
    fn test_kind_mismatch_is_invalid() {
        // A digital cart line pointing at a physical print edition.
        let ed = edition(1500, Some(10), false);
        let items = vec![CartItem::Digital {
            edition_id: ed.id,
            quantity: 1,
            advisory_price: None,
        }];
        let snapshots = vec![LineSnapshot::Edition { edition: ed }];

        let issues = price_cart(&items, &snapshots, TimeMs::new(0)).unwrap_err();
        assert_eq!(issues[0].kind, IssueKind::ItemInvalid);
    }

    #[test]
    fn test_item_subtotals_sum_to_cart_subtotal() {
        let art = artwork(250_000, ListingStatus::Published);
        let ed = edition(5000, Some(10), false);
        let items = vec![
            CartItem::Unique {
                artwork_id: art.id,
                advisory_price: None,
            },
            CartItem::Print {
                edition_id: ed.id,
                quantity: 3,
                advisory_price: None,
            },
        ];
        let snapshots = vec![
            LineSnapshot::Unique {
                artwork: art,
                hold: None,
            },
            LineSnapshot::Edition { edition: ed },
        ];

        let priced = price_cart(&items, &snapshots, TimeMs::new(0)).unwrap();
        let line_sum: Minor = priced.lines.iter().map(|l| l.subtotal).sum();
        assert_eq!(line_sum, priced.subtotal);
        assert_eq!(priced.subtotal, Minor::new(265_000));
    }
}
