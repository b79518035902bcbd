//! Catalog operations: listing snapshots for pricing, stock movements, and
//! digital entitlement minting.

use super::{parse_enum, parse_uuid, Repository};
use crate::domain::{
    Artwork, ArtistId, ArtworkId, CartItem, Edition, EditionId, ListingStatus, TimeMs,
};
use crate::engine::LineSnapshot;
use sqlx::Row;
use uuid::Uuid;

impl Repository {
    pub async fn insert_artwork(&self, artwork: &Artwork) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO artworks
                (id, artist_id, title, price, currency, status,
                 width_cm, height_cm, depth_cm, framed, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(artwork.id.to_string())
        .bind(artwork.artist_id.to_string())
        .bind(&artwork.title)
        .bind(artwork.price.as_i64())
        .bind(&artwork.currency)
        .bind(artwork.status.as_db())
        .bind(artwork.width_cm)
        .bind(artwork.height_cm)
        .bind(artwork.depth_cm)
        .bind(artwork.framed as i64)
        .bind(artwork.created_at.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_edition(&self, edition: &Edition) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO editions
                (id, artist_id, title, unit_price, currency, status,
                 available, digital, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(edition.id.to_string())
        .bind(edition.artist_id.to_string())
        .bind(&edition.title)
        .bind(edition.unit_price.as_i64())
        .bind(&edition.currency)
        .bind(edition.status.as_db())
        .bind(edition.available)
        .bind(edition.digital as i64)
        .bind(edition.created_at.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_artwork(&self, id: &ArtworkId) -> Result<Option<Artwork>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, artist_id, title, price, currency, status,
                   width_cm, height_cm, depth_cm, framed, created_at
            FROM artworks WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(artwork_from_row).transpose()
    }

    pub async fn get_edition(&self, id: &EditionId) -> Result<Option<Edition>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, artist_id, title, unit_price, currency, status,
                   available, digital, created_at
            FROM editions WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(edition_from_row).transpose()
    }

    /// Fetch the catalog state backing each cart line, in line order.
    ///
    /// Unique lines come back with any hold currently recorded on the
    /// artwork so the pricing engine can enforce reservation exclusivity.
    pub async fn line_snapshots(
        &self,
        items: &[CartItem],
    ) -> Result<Vec<LineSnapshot>, sqlx::Error> {
        let mut snapshots = Vec::with_capacity(items.len());

        for item in items {
            let snapshot = match item {
                CartItem::Unique { artwork_id, .. } => match self.get_artwork(artwork_id).await? {
                    Some(artwork) => {
                        let hold = self.get_hold(artwork_id).await?;
                        LineSnapshot::Unique { artwork, hold }
                    }
                    None => LineSnapshot::Missing,
                },
                CartItem::Print { edition_id, .. } | CartItem::Digital { edition_id, .. } => {
                    match self.get_edition(edition_id).await? {
                        Some(edition) => LineSnapshot::Edition { edition },
                        None => LineSnapshot::Missing,
                    }
                }
            };
            snapshots.push(snapshot);
        }

        Ok(snapshots)
    }

    /// Digital entitlement tokens minted for an order item, in serial order.
    pub async fn list_entitlements(
        &self,
        order_item_id: &Uuid,
    ) -> Result<Vec<String>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT token FROM entitlements WHERE order_item_id = ? ORDER BY serial ASC",
        )
        .bind(order_item_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get::<String, _>("token")).collect())
    }
}

pub(crate) fn artwork_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Artwork, sqlx::Error> {
    let id: String = row.get("id");
    let artist_id: String = row.get("artist_id");
    let status: String = row.get("status");

    Ok(Artwork {
        id: ArtworkId(parse_uuid(&id, "id")?),
        artist_id: ArtistId(parse_uuid(&artist_id, "artist_id")?),
        title: row.get("title"),
        price: crate::domain::Minor::new(row.get::<i64, _>("price")),
        currency: row.get("currency"),
        status: parse_enum(ListingStatus::from_db(&status), &status, "status")?,
        width_cm: row.get("width_cm"),
        height_cm: row.get("height_cm"),
        depth_cm: row.get("depth_cm"),
        framed: row.get::<i64, _>("framed") != 0,
        created_at: TimeMs::new(row.get::<i64, _>("created_at")),
    })
}

pub(crate) fn edition_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Edition, sqlx::Error> {
    let id: String = row.get("id");
    let artist_id: String = row.get("artist_id");
    let status: String = row.get("status");

    Ok(Edition {
        id: EditionId(parse_uuid(&id, "id")?),
        artist_id: ArtistId(parse_uuid(&artist_id, "artist_id")?),
        title: row.get("title"),
        unit_price: crate::domain::Minor::new(row.get::<i64, _>("unit_price")),
        currency: row.get("currency"),
        status: parse_enum(ListingStatus::from_db(&status), &status, "status")?,
        available: row.get("available"),
        digital: row.get::<i64, _>("digital") != 0,
        created_at: TimeMs::new(row.get::<i64, _>("created_at")),
    })
}
