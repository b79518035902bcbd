//! Artist payout rows.

use super::{parse_enum, parse_uuid, Repository};
use crate::domain::{ArtistId, Minor, OrderId, Payout, PayoutId, PayoutStatus, TimeMs};
use sqlx::Row;

impl Repository {
    /// Insert the payout rows scheduled for a freshly paid order.
    pub async fn insert_payouts(&self, payouts: &[Payout]) -> Result<(), sqlx::Error> {
        if payouts.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for payout in payouts {
            sqlx::query(
                r#"
                INSERT INTO payouts
                    (id, order_id, order_item_id, artist_id, amount, currency,
                     status, available_at, transfer_id, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(payout.id.to_string())
            .bind(payout.order_id.to_string())
            .bind(payout.order_item_id.to_string())
            .bind(payout.artist_id.to_string())
            .bind(payout.amount.as_i64())
            .bind(&payout.currency)
            .bind(payout.status.as_db())
            .bind(payout.available_at.map(|t| t.as_ms()))
            .bind(payout.transfer_id.as_deref())
            .bind(payout.created_at.as_ms())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn list_payouts_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<Payout>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, order_item_id, artist_id, amount, currency,
                   status, available_at, transfer_id, created_at
            FROM payouts WHERE order_id = ? ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(order_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(payout_from_row).collect()
    }

    /// Pending payouts whose availability delay has elapsed.
    pub async fn list_due_payouts(&self, now: TimeMs) -> Result<Vec<Payout>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, order_item_id, artist_id, amount, currency,
                   status, available_at, transfer_id, created_at
            FROM payouts
            WHERE status = 'pending' AND (available_at IS NULL OR available_at <= ?)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(now.as_ms())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(payout_from_row).collect()
    }

    /// Mark a pending payout paid, recording the provider transfer id.
    /// Returns false when the payout was not pending (already paid or
    /// reversed), which callers treat as a no-op.
    pub async fn mark_payout_paid(
        &self,
        payout_id: &PayoutId,
        transfer_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE payouts SET status = 'paid', transfer_id = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(transfer_id)
        .bind(payout_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark a paid payout reversed. Returns false unless it was paid.
    pub async fn mark_payout_reversed(&self, payout_id: &PayoutId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE payouts SET status = 'reversed' WHERE id = ? AND status = 'paid'")
                .bind(payout_id.to_string())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn payout_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Payout, sqlx::Error> {
    let id: String = row.get("id");
    let order_id: String = row.get("order_id");
    let order_item_id: String = row.get("order_item_id");
    let artist_id: String = row.get("artist_id");
    let status: String = row.get("status");

    Ok(Payout {
        id: PayoutId(parse_uuid(&id, "id")?),
        order_id: OrderId(parse_uuid(&order_id, "order_id")?),
        order_item_id: parse_uuid(&order_item_id, "order_item_id")?,
        artist_id: ArtistId(parse_uuid(&artist_id, "artist_id")?),
        amount: Minor::new(row.get::<i64, _>("amount")),
        currency: row.get("currency"),
        status: parse_enum(PayoutStatus::from_db(&status), &status, "status")?,
        available_at: row.get::<Option<i64>, _>("available_at").map(TimeMs::new),
        transfer_id: row.get("transfer_id"),
        created_at: TimeMs::new(row.get::<i64, _>("created_at")),
    })
}
