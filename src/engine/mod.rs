//! Pure computation engines for pricing, tax, and payout math.

pub mod payout;
pub mod pricing;
pub mod tax;

pub use payout::{artist_share, compute_reversal};
pub use pricing::{price_cart, IssueKind, LineSnapshot, PricedCart, PricedLine, ValidationIssue};
pub use tax::{resolve_tax, TaxPolicy, ValidatedBusiness};
