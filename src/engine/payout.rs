//! Payout share and reversal math.
//!
//! Both functions are the single source of truth for their formula; the
//! settlement engine and tests call them rather than duplicating the math.

use crate::domain::Minor;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// The artist's net share of an item subtotal after the platform fee:
/// `floor(subtotal * (10000 - fee_bps) / 10000)`.
pub fn artist_share(subtotal: Minor, fee_bps: i64) -> Minor {
    let keep_bps = (10_000 - fee_bps).clamp(0, 10_000);
    Minor::new(subtotal.as_i64().saturating_mul(keep_bps) / 10_000)
}

/// Proportional reversal of one item's payout when `affected_amount` of an
/// original `charge_amount` is refunded or disputed:
/// `round(item_subtotal * affected / charge)`, clamped so a payout is never
/// reversed by more than was originally paid out.
///
/// Shared by the refund and dispute paths.
pub fn compute_reversal(
    item_subtotal: Minor,
    affected_amount: Minor,
    charge_amount: Minor,
    previously_paid: Minor,
) -> Minor {
    if charge_amount.is_zero() || !affected_amount.is_positive() {
        return Minor::zero();
    }

    let proportional = Decimal::from(item_subtotal.as_i64())
        * Decimal::from(affected_amount.as_i64())
        / Decimal::from(charge_amount.as_i64());
    let rounded = proportional.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    Minor::new(rounded.to_i64().unwrap_or(0).max(0)).min(previously_paid)
}
