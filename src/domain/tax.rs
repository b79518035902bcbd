//! Tax treatment and breakdown types.

use crate::domain::Minor;
use serde::{Deserialize, Serialize};

/// How VAT applies to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxTreatment {
    /// Standard rate applied per line.
    Standard,
    /// Zero-rated: liability shifts to a validated cross-border business buyer.
    ReverseCharge,
    /// Destination outside the tax jurisdiction.
    OutOfScope,
}

impl TaxTreatment {
    pub fn as_db(&self) -> &'static str {
        match self {
            TaxTreatment::Standard => "standard",
            TaxTreatment::ReverseCharge => "reverse_charge",
            TaxTreatment::OutOfScope => "out_of_scope",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(TaxTreatment::Standard),
            "reverse_charge" => Some(TaxTreatment::ReverseCharge),
            "out_of_scope" => Some(TaxTreatment::OutOfScope),
            _ => None,
        }
    }
}

/// Tax computed for one priced cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxLine {
    pub line_subtotal: Minor,
    pub tax: Minor,
}

/// Full tax breakdown for an order.
///
/// The total is always the sum of per-line amounts, never a re-rounding of
/// the subtotal, so line and total figures cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBreakdown {
    pub treatment: TaxTreatment,
    pub rate_bps: i64,
    pub lines: Vec<TaxLine>,
    pub total: Minor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TaxBreakdown {
    /// A zero breakdown for the given treatment.
    pub fn zero(treatment: TaxTreatment, line_count: usize) -> Self {
        TaxBreakdown {
            treatment,
            rate_bps: 0,
            lines: vec![
                TaxLine {
                    line_subtotal: Minor::zero(),
                    tax: Minor::zero()
                };
                line_count
            ],
            total: Minor::zero(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
