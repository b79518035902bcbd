//! Domain types for the checkout and settlement engine.
//!
//! This module provides:
//! - Money as integer minor units (`Minor`) and millisecond timestamps
//! - Catalog entities (unique artworks, print/digital editions)
//! - Cart, order, hold, tax, and payout types
//! - Typed payment-provider webhook events

pub mod address;
pub mod cart;
pub mod catalog;
pub mod event;
pub mod hold;
pub mod order;
pub mod payout;
pub mod primitives;
pub mod tax;

pub use address::Address;
pub use cart::{Cart, CartId, CartItem, CartOwner, ItemKind};
pub use catalog::{Artwork, ArtistId, ArtworkId, Edition, EditionId, ListingStatus};
pub use event::{EventParseError, ProviderEvent};
pub use hold::ArtworkHold;
pub use order::{Order, OrderId, OrderItem, OrderStatus};
pub use payout::{Payout, PayoutId, PayoutStatus};
pub use primitives::{Country, Minor, TimeMs};
pub use tax::{TaxBreakdown, TaxLine, TaxTreatment};
