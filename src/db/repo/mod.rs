//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `catalog.rs` - artwork/edition snapshots, stock, entitlements
//! - `carts.rs` - cart load/clear
//! - `holds.rs` - exclusive artwork holds
//! - `orders.rs` - order ledger and the paid transition
//! - `payouts.rs` - artist payout rows

mod carts;
mod catalog;
mod holds;
mod orders;
mod payouts;

use crate::domain::{ArtistId, TimeMs};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use uuid::Uuid;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    // =========================================================================
    // Webhook idempotency ledger
    // =========================================================================

    /// Record a provider event id, insert-first.
    ///
    /// Returns false when the event was already recorded, which callers must
    /// treat as "already processed, do nothing".
    pub async fn record_webhook_event(
        &self,
        event_id: &str,
        event_type: &str,
        now: TimeMs,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_events (event_id, event_type, processed_at)
            VALUES (?, ?, ?)
            ON CONFLICT(event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .bind(now.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Forget a recorded event so a provider retry can reprocess it. Used
    /// when handling failed after the id was recorded.
    pub async fn delete_webhook_event(&self, event_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM webhook_events WHERE event_id = ?")
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // =========================================================================
    // Artist accounts
    // =========================================================================

    /// Register an artist and their (optional) provider payout account.
    pub async fn insert_artist(
        &self,
        artist_id: &ArtistId,
        display_name: &str,
        provider_account: Option<&str>,
        now: TimeMs,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO artists (id, display_name, provider_account, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(artist_id.to_string())
        .bind(display_name)
        .bind(provider_account)
        .bind(now.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The provider account transfers for this artist are routed to.
    pub async fn artist_provider_account(
        &self,
        artist_id: &ArtistId,
    ) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query("SELECT provider_account FROM artists WHERE id = ?")
            .bind(artist_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.and_then(|r| r.get::<Option<String>, _>("provider_account")))
    }

    // =========================================================================
    // VAT id validation cache
    // =========================================================================

    /// Cached validator verdict for (country, tax_id), with its check time.
    pub async fn get_tax_id_check(
        &self,
        country: &str,
        tax_id: &str,
    ) -> Result<Option<(bool, TimeMs)>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT valid, checked_at FROM tax_id_checks WHERE country = ? AND tax_id = ?",
        )
        .bind(country)
        .bind(tax_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            (
                r.get::<i64, _>("valid") != 0,
                TimeMs::new(r.get::<i64, _>("checked_at")),
            )
        }))
    }

    /// Upsert a validator verdict.
    pub async fn store_tax_id_check(
        &self,
        country: &str,
        tax_id: &str,
        valid: bool,
        now: TimeMs,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO tax_id_checks (country, tax_id, valid, checked_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(country, tax_id) DO UPDATE SET
                valid = excluded.valid,
                checked_at = excluded.checked_at
            "#,
        )
        .bind(country)
        .bind(tax_id)
        .bind(valid as i64)
        .bind(now.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Decode a uuid column, surfacing corruption as a column-decode error.
pub(crate) fn parse_uuid(value: &str, column: &'static str) -> Result<Uuid, sqlx::Error> {
    Uuid::parse_str(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Decode an enum column via its `from_db` parser.
pub(crate) fn parse_enum<T>(
    parsed: Option<T>,
    value: &str,
    column: &'static str,
) -> Result<T, sqlx::Error> {
    parsed.ok_or_else(|| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("unknown value: {}", value).into(),
    })
}
