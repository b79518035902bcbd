//! Destination-based VAT resolution.
//!
//! Rules in priority order: out-of-jurisdiction destinations are out of
//! scope; validated cross-border business buyers get the reverse-charge
//! treatment; everything else pays the standard rate per line. The total is
//! the sum of per-line roundings, never a re-rounding of the subtotal.

use crate::domain::{Country, Minor, TaxBreakdown, TaxLine, TaxTreatment};
use crate::engine::pricing::PricedLine;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Legal basis attached to reverse-charged breakdowns.
const REVERSE_CHARGE_NOTE: &str =
    "VAT reverse charged to the recipient under Article 196, Council Directive 2006/112/EC";

/// Seller-side tax policy, taken from configuration.
#[derive(Debug, Clone)]
pub struct TaxPolicy {
    /// Seller's home country.
    pub home_country: Country,
    /// Countries inside the tax jurisdiction (e.g. the EU-27).
    pub jurisdiction: Vec<Country>,
    /// Standard VAT rate in basis points.
    pub rate_bps: i64,
}

impl TaxPolicy {
    pub fn in_jurisdiction(&self, country: &Country) -> bool {
        self.jurisdiction.contains(country)
    }
}

/// A buyer-supplied business identity whose tax id has been checked.
#[derive(Debug, Clone)]
pub struct ValidatedBusiness {
    pub country: Country,
    pub tax_id: String,
    pub tax_id_valid: bool,
}

/// Round `subtotal * rate_bps / 10000` half away from zero.
fn line_tax(subtotal: Minor, rate_bps: i64) -> Minor {
    let tax = Decimal::from(subtotal.as_i64()) * Decimal::from(rate_bps) / Decimal::from(10_000);
    let rounded = tax.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    Minor::new(rounded.to_i64().unwrap_or(0))
}

/// Resolve the tax breakdown for a priced cart.
pub fn resolve_tax(
    lines: &[PricedLine],
    destination: &Country,
    business: Option<&ValidatedBusiness>,
    policy: &TaxPolicy,
) -> TaxBreakdown {
    if !policy.in_jurisdiction(destination) {
        return TaxBreakdown::zero(TaxTreatment::OutOfScope, lines.len());
    }

    if let Some(business) = business {
        if business.tax_id_valid && business.country != policy.home_country {
            return TaxBreakdown::zero(TaxTreatment::ReverseCharge, lines.len())
                .with_note(REVERSE_CHARGE_NOTE);
        }
    }

    let tax_lines: Vec<TaxLine> = lines
        .iter()
        .map(|line| TaxLine {
            line_subtotal: line.subtotal,
            tax: line_tax(line.subtotal, policy.rate_bps),
        })
        .collect();
    let total = tax_lines.iter().map(|l| l.tax).sum();

    TaxBreakdown {
        treatment: TaxTreatment::Standard,
        rate_bps: policy.rate_bps,
        lines: tax_lines,
        total,
        note: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArtistId, ItemKind};

    fn line(subtotal: i64) -> PricedLine {
        PricedLine {
            kind: ItemKind::Unique,
            artwork_id: None,
            edition_id: None,
            artist_id: ArtistId::new(),
            unit_price: Minor::new(subtotal),
            quantity: 1,
            subtotal: Minor::new(subtotal),
        }
    }

    fn policy() -> TaxPolicy {
        TaxPolicy {
            home_country: Country::new("PT"),
            jurisdiction: vec![Country::new("PT"), Country::new("DE"), Country::new("FR")],
            rate_bps: 2300,
        }
    }

    #[test]
    fn test_out_of_jurisdiction_is_out_of_scope() {
        let breakdown = resolve_tax(&[line(250_000)], &Country::new("US"), None, &policy());
        assert_eq!(breakdown.treatment, TaxTreatment::OutOfScope);
        assert_eq!(breakdown.total, Minor::zero());
    }

    #[test]
    fn test_cross_border_business_reverse_charge() {
        let business = ValidatedBusiness {
            country: Country::new("DE"),
            tax_id: "DE123456789".to_string(),
            tax_id_valid: true,
        };
        let breakdown = resolve_tax(
            &[line(250_000)],
            &Country::new("DE"),
            Some(&business),
            &policy(),
        );
        assert_eq!(breakdown.treatment, TaxTreatment::ReverseCharge);
        assert_eq!(breakdown.total, Minor::zero());
        assert!(breakdown.note.as_deref().unwrap().contains("2006/112/EC"));
    }

    #[test]
    fn test_domestic_business_pays_standard_rate() {
        let business = ValidatedBusiness {
            country: Country::new("PT"),
            tax_id: "PT500100200".to_string(),
            tax_id_valid: true,
        };
        let breakdown = resolve_tax(
            &[line(100_000)],
            &Country::new("PT"),
            Some(&business),
            &policy(),
        );
        assert_eq!(breakdown.treatment, TaxTreatment::Standard);
        assert_eq!(breakdown.total, Minor::new(23_000));
    }

    #[test]
    fn test_invalid_tax_id_falls_back_to_standard() {
        let business = ValidatedBusiness {
            country: Country::new("DE"),
            tax_id: "DE000".to_string(),
            tax_id_valid: false,
        };
        let breakdown = resolve_tax(
            &[line(100_000)],
            &Country::new("DE"),
            Some(&business),
            &policy(),
        );
        assert_eq!(breakdown.treatment, TaxTreatment::Standard);
    }

    #[test]
    fn test_standard_rate_on_single_artwork() {
        // 250000 at 23% -> 57500.
        let breakdown = resolve_tax(&[line(250_000)], &Country::new("PT"), None, &policy());
        assert_eq!(breakdown.treatment, TaxTreatment::Standard);
        assert_eq!(breakdown.total, Minor::new(57_500));
        assert_eq!(breakdown.lines[0].tax, Minor::new(57_500));
    }

    #[test]
    fn test_total_is_sum_of_line_roundings() {
        // Each 33 at 23% rounds to 8 (7.59 -> 8); three lines give 24,
        // whereas rounding the summed subtotal would give round(22.77) = 23.
        let lines = vec![line(33), line(33), line(33)];
        let breakdown = resolve_tax(&lines, &Country::new("PT"), None, &policy());
        for l in &breakdown.lines {
            assert_eq!(l.tax, Minor::new(8));
        }
        assert_eq!(breakdown.total, Minor::new(24));
    }

    #[test]
    fn test_half_rounds_away_from_zero() {
        // 50 at 23% = 11.5 -> 12, not banker's 11.
        let breakdown = resolve_tax(&[line(50)], &Country::new("PT"), None, &policy());
        assert_eq!(breakdown.total, Minor::new(12));
    }
}
