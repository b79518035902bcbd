//! Exclusive artwork hold operations.
//!
//! Acquisition is a single atomic upsert: the PRIMARY KEY on artwork_id plus
//! the conditional DO UPDATE means concurrent claimants for the same artwork
//! have exactly one winner. Expiry is enforced here by comparing expires_at
//! against the caller's clock, never by a timer.

use super::{parse_uuid, Repository};
use crate::domain::{ArtworkHold, ArtworkId, OrderId, TimeMs};
use sqlx::Row;

impl Repository {
    /// Try to claim `artwork_id` for `order_id` until `now + ttl_minutes`.
    ///
    /// Returns false when an unexpired hold owned by a different order is in
    /// place; the caller surfaces this as an item-reserved validation error.
    /// Re-acquiring an own hold refreshes its expiry.
    pub async fn acquire_hold(
        &self,
        artwork_id: &ArtworkId,
        order_id: &OrderId,
        ttl_minutes: i64,
        now: TimeMs,
    ) -> Result<bool, sqlx::Error> {
        let expires_at = now.plus_minutes(ttl_minutes);

        let result = sqlx::query(
            r#"
            INSERT INTO artwork_holds (artwork_id, order_id, expires_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(artwork_id) DO UPDATE SET
                order_id = excluded.order_id,
                expires_at = excluded.expires_at
            WHERE artwork_holds.order_id = excluded.order_id
               OR artwork_holds.expires_at <= ?4
            "#,
        )
        .bind(artwork_id.to_string())
        .bind(order_id.to_string())
        .bind(expires_at.as_ms())
        .bind(now.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Release every hold owned by an order. Called on cancellation, payment
    /// failure, and rollback of a failed order creation.
    pub async fn release_holds_for_order(&self, order_id: &OrderId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM artwork_holds WHERE order_id = ?")
            .bind(order_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// The hold currently recorded on an artwork, expired or not.
    pub async fn get_hold(
        &self,
        artwork_id: &ArtworkId,
    ) -> Result<Option<ArtworkHold>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT artwork_id, order_id, expires_at FROM artwork_holds WHERE artwork_id = ?",
        )
        .bind(artwork_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let artwork: String = r.get("artwork_id");
            let order: String = r.get("order_id");
            Ok(ArtworkHold {
                artwork_id: ArtworkId(parse_uuid(&artwork, "artwork_id")?),
                order_id: OrderId(parse_uuid(&order, "order_id")?),
                expires_at: TimeMs::new(r.get::<i64, _>("expires_at")),
            })
        })
        .transpose()
    }

    /// Delete expired holds; run by an external periodic sweeper, which is
    /// the only proactive cleanup. Correctness never depends on it.
    pub async fn sweep_expired_holds(&self, now: TimeMs) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM artwork_holds WHERE expires_at <= ?")
            .bind(now.as_ms())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::setup_test_db;
    use crate::domain::{ArtworkId, OrderId, TimeMs};

    #[tokio::test]
    async fn test_acquire_then_foreign_acquire_fails() {
        let (repo, _temp) = setup_test_db().await;
        let artwork = ArtworkId::new();
        let first = OrderId::new();
        let second = OrderId::new();
        let now = TimeMs::new(1_000_000);

        assert!(repo.acquire_hold(&artwork, &first, 15, now).await.unwrap());
        assert!(!repo.acquire_hold(&artwork, &second, 15, now).await.unwrap());

        let hold = repo.get_hold(&artwork).await.unwrap().unwrap();
        assert_eq!(hold.order_id, first);
    }

    #[tokio::test]
    async fn test_reacquire_refreshes_expiry() {
        let (repo, _temp) = setup_test_db().await;
        let artwork = ArtworkId::new();
        let order = OrderId::new();

        assert!(repo
            .acquire_hold(&artwork, &order, 15, TimeMs::new(0))
            .await
            .unwrap());
        assert!(repo
            .acquire_hold(&artwork, &order, 15, TimeMs::new(60_000))
            .await
            .unwrap());

        let hold = repo.get_hold(&artwork).await.unwrap().unwrap();
        assert_eq!(hold.expires_at, TimeMs::new(60_000).plus_minutes(15));
    }

    #[tokio::test]
    async fn test_expired_hold_is_claimable() {
        let (repo, _temp) = setup_test_db().await;
        let artwork = ArtworkId::new();
        let first = OrderId::new();
        let second = OrderId::new();

        assert!(repo
            .acquire_hold(&artwork, &first, 15, TimeMs::new(0))
            .await
            .unwrap());

        // 15 minutes later the hold has lapsed; a new order may claim it.
        let later = TimeMs::new(0).plus_minutes(15);
        assert!(repo
            .acquire_hold(&artwork, &second, 15, later)
            .await
            .unwrap());

        let hold = repo.get_hold(&artwork).await.unwrap().unwrap();
        assert_eq!(hold.order_id, second);
    }

    #[tokio::test]
    async fn test_release_deletes_all_holds_of_order() {
        let (repo, _temp) = setup_test_db().await;
        let order = OrderId::new();
        let a = ArtworkId::new();
        let b = ArtworkId::new();
        let now = TimeMs::new(0);

        repo.acquire_hold(&a, &order, 15, now).await.unwrap();
        repo.acquire_hold(&b, &order, 15, now).await.unwrap();

        assert_eq!(repo.release_holds_for_order(&order).await.unwrap(), 2);
        assert!(repo.get_hold(&a).await.unwrap().is_none());
        assert!(repo.get_hold(&b).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let (repo, _temp) = setup_test_db().await;
        let stale = ArtworkId::new();
        let fresh = ArtworkId::new();
        let order = OrderId::new();

        repo.acquire_hold(&stale, &order, 15, TimeMs::new(0))
            .await
            .unwrap();
        repo.acquire_hold(&fresh, &order, 15, TimeMs::new(600_000))
            .await
            .unwrap();

        let swept = repo
            .sweep_expired_holds(TimeMs::new(0).plus_minutes(15))
            .await
            .unwrap();
        assert_eq!(swept, 1);
        assert!(repo.get_hold(&stale).await.unwrap().is_none());
        assert!(repo.get_hold(&fresh).await.unwrap().is_some());
    }
}
