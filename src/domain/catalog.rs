//! Catalog entities: unique artworks and print/digital editions.

use crate::domain::{Minor, TimeMs};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a one-of-a-kind artwork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtworkId(pub Uuid);

impl ArtworkId {
    pub fn new() -> Self {
        ArtworkId(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(ArtworkId)
    }
}

impl Default for ArtworkId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ArtworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a limited-print or digital edition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EditionId(pub Uuid);

impl EditionId {
    pub fn new() -> Self {
        EditionId(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(EditionId)
    }
}

impl Default for EditionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EditionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the artist who owns a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtistId(pub Uuid);

impl ArtistId {
    pub fn new() -> Self {
        ArtistId(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(ArtistId)
    }
}

impl Default for ArtistId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ArtistId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a catalog listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Draft,
    Published,
    Withdrawn,
    Sold,
}

impl ListingStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            ListingStatus::Draft => "draft",
            ListingStatus::Published => "published",
            ListingStatus::Withdrawn => "withdrawn",
            ListingStatus::Sold => "sold",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ListingStatus::Draft),
            "published" => Some(ListingStatus::Published),
            "withdrawn" => Some(ListingStatus::Withdrawn),
            "sold" => Some(ListingStatus::Sold),
            _ => None,
        }
    }

    /// Whether a buyer may currently purchase this listing.
    pub fn is_purchasable(&self) -> bool {
        matches!(self, ListingStatus::Published)
    }
}

/// A one-of-a-kind physical artwork.
#[derive(Debug, Clone, PartialEq)]
pub struct Artwork {
    pub id: ArtworkId,
    pub artist_id: ArtistId,
    pub title: String,
    pub price: Minor,
    pub currency: String,
    pub status: ListingStatus,
    pub width_cm: f64,
    pub height_cm: f64,
    pub depth_cm: f64,
    pub framed: bool,
    pub created_at: TimeMs,
}

/// A print or digital edition with optional stock limit.
///
/// `available == None` means unlimited supply; stock checks are skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Edition {
    pub id: EditionId,
    pub artist_id: ArtistId,
    pub title: String,
    pub unit_price: Minor,
    pub currency: String,
    pub status: ListingStatus,
    pub available: Option<i64>,
    pub digital: bool,
    pub created_at: TimeMs,
}

impl Edition {
    /// Whether `qty` units can be supplied right now.
    pub fn has_stock(&self, qty: i64) -> bool {
        match self.available {
            None => true,
            Some(available) => available >= qty,
        }
    }
}
