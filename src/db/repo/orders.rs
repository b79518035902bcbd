//! Order ledger operations, including the atomic paid transition.

use super::{parse_enum, parse_uuid, Repository};
use crate::domain::{
    ArtistId, ArtworkId, CartId, Country, EditionId, ItemKind, Minor, Order, OrderId, OrderItem,
    OrderStatus, TaxTreatment, TimeMs,
};
use sqlx::Row;
use uuid::Uuid;

impl Repository {
    /// Persist an order and its item snapshots in a single transaction.
    pub async fn insert_order_with_items(
        &self,
        order: &Order,
        items: &[OrderItem],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders
                (id, cart_id, buyer_email, currency, subtotal, tax, shipping, total,
                 refunded, status, transaction_id, destination_country, tax_treatment,
                 created_at, cancelled_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(order.id.to_string())
        .bind(order.cart_id.to_string())
        .bind(order.buyer_email.as_deref())
        .bind(&order.currency)
        .bind(order.subtotal.as_i64())
        .bind(order.tax.as_i64())
        .bind(order.shipping.as_i64())
        .bind(order.total.as_i64())
        .bind(order.refunded.as_i64())
        .bind(order.status.as_db())
        .bind(order.transaction_id.as_deref())
        .bind(order.destination_country.as_ref().map(|c| c.as_str().to_string()))
        .bind(order.tax_treatment.as_db())
        .bind(order.created_at.as_ms())
        .bind(order.cancelled_at.map(|t| t.as_ms()))
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items
                    (id, order_id, kind, artwork_id, edition_id, artist_id,
                     unit_price, quantity, subtotal, refunded_qty)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(item.id.to_string())
            .bind(item.order_id.to_string())
            .bind(item.kind.as_db())
            .bind(item.artwork_id.map(|id| id.to_string()))
            .bind(item.edition_id.map(|id| id.to_string()))
            .bind(item.artist_id.to_string())
            .bind(item.unit_price.as_i64())
            .bind(item.quantity)
            .bind(item.subtotal.as_i64())
            .bind(item.refunded_qty)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>, sqlx::Error> {
        let row = sqlx::query(ORDER_SELECT)
            .bind(order_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(order_from_row).transpose()
    }

    /// Locate an order by its provider transaction id; the correlation key
    /// every webhook handler starts from.
    pub async fn find_order_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Order>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, cart_id, buyer_email, currency, subtotal, tax, shipping, total,
                   refunded, status, transaction_id, destination_country, tax_treatment,
                   created_at, cancelled_at
            FROM orders WHERE transaction_id = ?
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(order_from_row).transpose()
    }

    pub async fn set_order_transaction(
        &self,
        order_id: &OrderId,
        transaction_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE orders SET transaction_id = ? WHERE id = ?")
            .bind(transaction_id)
            .bind(order_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Remove an order and its items; the rollback path when hold acquisition
    /// or payment-intent creation fails after the order row was written.
    pub async fn delete_order(&self, order_id: &OrderId) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM order_items WHERE order_id = ?")
            .bind(order_id.to_string())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(order_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Conditionally transition order status; returns false when the order
    /// was not in `from`, which callers treat as an idempotent no-op.
    pub async fn set_order_status_if(
        &self,
        order_id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
        cancelled_at: Option<TimeMs>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE orders SET status = ?, cancelled_at = COALESCE(?, cancelled_at) WHERE id = ? AND status = ?",
        )
        .bind(to.as_db())
        .bind(cancelled_at.map(|t| t.as_ms()))
        .bind(order_id.to_string())
        .bind(from.as_db())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn add_refunded_amount(
        &self,
        order_id: &OrderId,
        amount: Minor,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE orders SET refunded = refunded + ? WHERE id = ?")
            .bind(amount.as_i64())
            .bind(order_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn list_order_items(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<OrderItem>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, kind, artwork_id, edition_id, artist_id,
                   unit_price, quantity, subtotal, refunded_qty
            FROM order_items WHERE order_id = ? ORDER BY id ASC
            "#,
        )
        .bind(order_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(item_from_row).collect()
    }

    /// Atomically finalize a successful payment.
    ///
    /// In one transaction: claim the Pending -> Paid transition, then for
    /// each item mark unique artworks sold (releasing their holds),
    /// decrement limited edition stock, and mint per-unit entitlement tokens
    /// for digital lines. The conditional status update makes concurrent
    /// deliveries converge on exactly one finalizer; the losers observe a
    /// no-op and return `None`.
    pub async fn apply_paid_transition(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<Vec<OrderItem>>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query("UPDATE orders SET status = 'paid' WHERE id = ? AND status = 'pending'")
            .bind(order_id.to_string())
            .execute(&mut *tx)
            .await?;
        if claimed.rows_affected() == 0 {
            return Ok(None);
        }

        let rows = sqlx::query(
            r#"
            SELECT id, order_id, kind, artwork_id, edition_id, artist_id,
                   unit_price, quantity, subtotal, refunded_qty
            FROM order_items WHERE order_id = ? ORDER BY id ASC
            "#,
        )
        .bind(order_id.to_string())
        .fetch_all(&mut *tx)
        .await?;
        let items: Vec<OrderItem> = rows
            .into_iter()
            .map(item_from_row)
            .collect::<Result<_, _>>()?;

        for item in &items {
            match item.kind {
                ItemKind::Unique => {
                    if let Some(artwork_id) = item.artwork_id {
                        sqlx::query("UPDATE artworks SET status = 'sold' WHERE id = ?")
                            .bind(artwork_id.to_string())
                            .execute(&mut *tx)
                            .await?;
                        sqlx::query("DELETE FROM artwork_holds WHERE artwork_id = ?")
                            .bind(artwork_id.to_string())
                            .execute(&mut *tx)
                            .await?;
                    }
                }
                ItemKind::Print | ItemKind::Digital => {
                    if let Some(edition_id) = item.edition_id {
                        sqlx::query(
                            r#"
                            UPDATE editions SET available = MAX(available - ?, 0)
                            WHERE id = ? AND available IS NOT NULL
                            "#,
                        )
                        .bind(item.quantity)
                        .bind(edition_id.to_string())
                        .execute(&mut *tx)
                        .await?;
                    }
                    if item.kind == ItemKind::Digital {
                        for serial in 1..=item.quantity {
                            sqlx::query(
                                r#"
                                INSERT INTO entitlements (order_item_id, serial, token, created_at)
                                VALUES (?, ?, ?, ?)
                                ON CONFLICT(order_item_id, serial) DO NOTHING
                                "#,
                            )
                            .bind(item.id.to_string())
                            .bind(serial)
                            .bind(Uuid::new_v4().to_string())
                            .bind(TimeMs::now().as_ms())
                            .execute(&mut *tx)
                            .await?;
                        }
                    }
                }
            }
        }

        tx.commit().await?;
        Ok(Some(items))
    }

    /// Audit record for a refund or dispute event.
    pub async fn record_refund_event(
        &self,
        order_id: &OrderId,
        kind: &str,
        amount: Minor,
        charge_amount: Minor,
        now: TimeMs,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO refund_events (order_id, kind, amount, charge_amount, received_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(order_id.to_string())
        .bind(kind)
        .bind(amount.as_i64())
        .bind(charge_amount.as_i64())
        .bind(now.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

const ORDER_SELECT: &str = r#"
    SELECT id, cart_id, buyer_email, currency, subtotal, tax, shipping, total,
           refunded, status, transaction_id, destination_country, tax_treatment,
           created_at, cancelled_at
    FROM orders WHERE id = ?
"#;

fn order_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Order, sqlx::Error> {
    let id: String = row.get("id");
    let cart_id: String = row.get("cart_id");
    let status: String = row.get("status");
    let treatment: String = row.get("tax_treatment");

    Ok(Order {
        id: OrderId(parse_uuid(&id, "id")?),
        cart_id: CartId(parse_uuid(&cart_id, "cart_id")?),
        buyer_email: row.get("buyer_email"),
        currency: row.get("currency"),
        subtotal: Minor::new(row.get::<i64, _>("subtotal")),
        tax: Minor::new(row.get::<i64, _>("tax")),
        shipping: Minor::new(row.get::<i64, _>("shipping")),
        total: Minor::new(row.get::<i64, _>("total")),
        refunded: Minor::new(row.get::<i64, _>("refunded")),
        status: parse_enum(OrderStatus::from_db(&status), &status, "status")?,
        transaction_id: row.get("transaction_id"),
        destination_country: row
            .get::<Option<String>, _>("destination_country")
            .map(|c| Country::new(&c)),
        tax_treatment: parse_enum(
            TaxTreatment::from_db(&treatment),
            &treatment,
            "tax_treatment",
        )?,
        created_at: TimeMs::new(row.get::<i64, _>("created_at")),
        cancelled_at: row.get::<Option<i64>, _>("cancelled_at").map(TimeMs::new),
    })
}

fn item_from_row(row: sqlx::sqlite::SqliteRow) -> Result<OrderItem, sqlx::Error> {
    let id: String = row.get("id");
    let order_id: String = row.get("order_id");
    let kind: String = row.get("kind");
    let artist_id: String = row.get("artist_id");
    let artwork_id: Option<String> = row.get("artwork_id");
    let edition_id: Option<String> = row.get("edition_id");

    Ok(OrderItem {
        id: parse_uuid(&id, "id")?,
        order_id: OrderId(parse_uuid(&order_id, "order_id")?),
        kind: parse_enum(ItemKind::from_db(&kind), &kind, "kind")?,
        artwork_id: artwork_id
            .map(|s| parse_uuid(&s, "artwork_id").map(ArtworkId))
            .transpose()?,
        edition_id: edition_id
            .map(|s| parse_uuid(&s, "edition_id").map(EditionId))
            .transpose()?,
        artist_id: ArtistId(parse_uuid(&artist_id, "artist_id")?),
        unit_price: Minor::new(row.get::<i64, _>("unit_price")),
        quantity: row.get("quantity"),
        subtotal: Minor::new(row.get::<i64, _>("subtotal")),
        refunded_qty: row.get("refunded_qty"),
    })
}
