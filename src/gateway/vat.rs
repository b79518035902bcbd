//! Business tax-id validation with a persistent cache.
//!
//! The registry check itself is an external black box behind the
//! `TaxIdValidator` trait. `CachingTaxIdValidator` wraps any validator with
//! the `tax_id_checks` table: fresh verdicts short-circuit the upstream
//! call, and a stale cached verdict is the fallback when the upstream is
//! unreachable.

use super::GatewayError;
use crate::db::Repository;
use crate::domain::{Country, TimeMs};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

#[async_trait]
pub trait TaxIdValidator: Send + Sync + fmt::Debug {
    /// Whether `tax_id` is a valid registered business id in `country`.
    async fn validate(&self, country: &Country, tax_id: &str) -> Result<bool, GatewayError>;
}

pub struct CachingTaxIdValidator {
    inner: Arc<dyn TaxIdValidator>,
    repo: Arc<Repository>,
    ttl_minutes: i64,
}

impl fmt::Debug for CachingTaxIdValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingTaxIdValidator")
            .field("inner", &self.inner)
            .field("ttl_minutes", &self.ttl_minutes)
            .finish()
    }
}

impl CachingTaxIdValidator {
    pub fn new(inner: Arc<dyn TaxIdValidator>, repo: Arc<Repository>, ttl_minutes: i64) -> Self {
        Self {
            inner,
            repo,
            ttl_minutes,
        }
    }
}

#[async_trait]
impl TaxIdValidator for CachingTaxIdValidator {
    async fn validate(&self, country: &Country, tax_id: &str) -> Result<bool, GatewayError> {
        let now = TimeMs::now();
        let cached = self
            .repo
            .get_tax_id_check(country.as_str(), tax_id)
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if let Some((valid, checked_at)) = cached {
            if checked_at.plus_minutes(self.ttl_minutes) > now {
                return Ok(valid);
            }
        }

        match self.inner.validate(country, tax_id).await {
            Ok(valid) => {
                if let Err(e) = self
                    .repo
                    .store_tax_id_check(country.as_str(), tax_id, valid, now)
                    .await
                {
                    warn!(country = %country, error = %e, "Failed to cache tax id verdict");
                }
                Ok(valid)
            }
            Err(err) => match cached {
                // Stale verdicts beat an outage.
                Some((valid, _)) => {
                    warn!(country = %country, error = %err, "Tax id validator failed, using stale cache");
                    Ok(valid)
                }
                None => Err(err),
            },
        }
    }
}
