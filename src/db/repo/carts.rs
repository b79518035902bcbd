//! Cart load and teardown.

use super::{parse_enum, parse_uuid, Repository};
use crate::domain::{
    ArtworkId, Cart, CartId, CartItem, CartOwner, EditionId, ItemKind, Minor, TimeMs,
};
use sqlx::Row;

impl Repository {
    /// Persist a cart and its lines.
    pub async fn insert_cart(&self, cart: &Cart) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO carts (id, owner_kind, owner_id, currency, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(cart.id.to_string())
        .bind(cart.owner.kind())
        .bind(cart.owner.id_string())
        .bind(&cart.currency)
        .bind(cart.created_at.as_ms())
        .execute(&mut *tx)
        .await?;

        for item in &cart.items {
            let (artwork_id, edition_id, advisory) = match item {
                CartItem::Unique {
                    artwork_id,
                    advisory_price,
                } => (Some(artwork_id.to_string()), None, *advisory_price),
                CartItem::Print {
                    edition_id,
                    advisory_price,
                    ..
                }
                | CartItem::Digital {
                    edition_id,
                    advisory_price,
                    ..
                } => (None, Some(edition_id.to_string()), *advisory_price),
            };

            sqlx::query(
                r#"
                INSERT INTO cart_items (cart_id, kind, artwork_id, edition_id, quantity, advisory_price)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(cart.id.to_string())
            .bind(item.kind().as_db())
            .bind(artwork_id)
            .bind(edition_id)
            .bind(item.quantity())
            .bind(advisory.map(|m| m.as_i64()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Load a cart with its lines in insertion order.
    pub async fn get_cart(&self, cart_id: &CartId) -> Result<Option<Cart>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, owner_kind, owner_id, currency, created_at FROM carts WHERE id = ?",
        )
        .bind(cart_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.get("id");
        let owner_kind: String = row.get("owner_kind");
        let owner_id: String = row.get("owner_id");
        let owner = parse_enum(
            CartOwner::from_db(&owner_kind, &owner_id),
            &owner_kind,
            "owner_kind",
        )?;

        let item_rows = sqlx::query(
            r#"
            SELECT kind, artwork_id, edition_id, quantity, advisory_price
            FROM cart_items WHERE cart_id = ? ORDER BY id ASC
            "#,
        )
        .bind(cart_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::with_capacity(item_rows.len());
        for item_row in item_rows {
            let kind: String = item_row.get("kind");
            let kind = parse_enum(ItemKind::from_db(&kind), &kind, "kind")?;
            let advisory_price = item_row
                .get::<Option<i64>, _>("advisory_price")
                .map(Minor::new);

            let item = match kind {
                ItemKind::Unique => {
                    let artwork: Option<String> = item_row.get("artwork_id");
                    let artwork = artwork.ok_or_else(|| sqlx::Error::ColumnDecode {
                        index: "artwork_id".to_string(),
                        source: "unique cart line without artwork_id".into(),
                    })?;
                    CartItem::Unique {
                        artwork_id: ArtworkId(parse_uuid(&artwork, "artwork_id")?),
                        advisory_price,
                    }
                }
                ItemKind::Print | ItemKind::Digital => {
                    let edition: Option<String> = item_row.get("edition_id");
                    let edition = edition.ok_or_else(|| sqlx::Error::ColumnDecode {
                        index: "edition_id".to_string(),
                        source: "edition cart line without edition_id".into(),
                    })?;
                    let edition_id = EditionId(parse_uuid(&edition, "edition_id")?);
                    let quantity: i64 = item_row.get("quantity");
                    if kind == ItemKind::Print {
                        CartItem::Print {
                            edition_id,
                            quantity,
                            advisory_price,
                        }
                    } else {
                        CartItem::Digital {
                            edition_id,
                            quantity,
                            advisory_price,
                        }
                    }
                }
            };
            items.push(item);
        }

        Ok(Some(Cart {
            id: CartId(parse_uuid(&id, "id")?),
            owner,
            currency: row.get("currency"),
            items,
            created_at: TimeMs::new(row.get::<i64, _>("created_at")),
        }))
    }

    /// Destroy a cart after successful payment.
    pub async fn delete_cart(&self, cart_id: &CartId) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cart_items WHERE cart_id = ?")
            .bind(cart_id.to_string())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM carts WHERE id = ?")
            .bind(cart_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
