//! Domain primitives: TimeMs, Minor, Country.

use serde::{Deserialize, Serialize};

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    /// Get the underlying milliseconds value.
    pub fn as_ms(&self) -> i64 {
        self.0
    }

    /// This time plus a number of whole minutes.
    pub fn plus_minutes(&self, minutes: i64) -> Self {
        TimeMs(self.0.saturating_add(minutes.saturating_mul(60_000)))
    }

    /// This time plus a number of whole days.
    pub fn plus_days(&self, days: i64) -> Self {
        TimeMs(self.0.saturating_add(days.saturating_mul(86_400_000)))
    }
}

/// Monetary amount in integer minor currency units (e.g. euro cents).
///
/// All persisted money in the system is carried as `Minor`; floating point
/// never touches an amount.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Minor(pub i64);

impl Minor {
    pub fn new(units: i64) -> Self {
        Minor(units)
    }

    pub fn zero() -> Self {
        Minor(0)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Saturating addition; amounts near i64::MAX are out of domain anyway.
    pub fn saturating_add(&self, other: Minor) -> Minor {
        Minor(self.0.saturating_add(other.0))
    }

    /// Subtraction clamped at zero.
    pub fn saturating_sub(&self, other: Minor) -> Minor {
        Minor(self.0.saturating_sub(other.0).max(0))
    }

    pub fn min(&self, other: Minor) -> Minor {
        Minor(self.0.min(other.0))
    }

    /// Multiply by an integer quantity.
    pub fn times(&self, qty: i64) -> Minor {
        Minor(self.0.saturating_mul(qty))
    }
}

impl std::ops::Add for Minor {
    type Output = Minor;

    fn add(self, rhs: Minor) -> Minor {
        Minor(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Minor {
    fn add_assign(&mut self, rhs: Minor) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Minor {
    type Output = Minor;

    fn sub(self, rhs: Minor) -> Minor {
        Minor(self.0 - rhs.0)
    }
}

impl std::iter::Sum for Minor {
    fn sum<I: Iterator<Item = Minor>>(iter: I) -> Minor {
        iter.fold(Minor::zero(), |acc, m| acc + m)
    }
}

impl std::fmt::Display for Minor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 3166-1 alpha-2 country code, normalized to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Country(pub String);

impl Country {
    /// Create a Country, uppercasing the input.
    pub fn new(code: &str) -> Self {
        Country(code.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Normalize on the way in so "pt" and "PT" compare equal everywhere.
impl<'de> Deserialize<'de> for Country {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let code = String::deserialize(deserializer)?;
        Ok(Country::new(&code))
    }
}

impl std::fmt::Display for Country {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
