use crate::domain::Country;
use std::collections::HashMap;
use thiserror::Error;

/// EU-27 member states, the default tax jurisdiction.
const EU_COUNTRIES: &str = "AT,BE,BG,HR,CY,CZ,DK,EE,FI,FR,DE,GR,HU,IE,IT,LV,LT,LU,MT,NL,PL,PT,RO,SK,SI,ES,SE";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub payment_api_url: String,
    pub payment_secret_key: String,
    pub payment_webhook_secret: String,
    pub shipping_api_url: Option<String>,
    pub platform_fee_bps: i64,
    /// Single source of truth for payout availability delay.
    pub payout_delay_days: i64,
    pub hold_ttl_minutes: i64,
    pub home_country: Country,
    pub tax_rate_bps: i64,
    pub tax_jurisdiction: Vec<Country>,
    pub flat_shipping_minor: i64,
    pub allow_guest_checkout: bool,
    pub vat_cache_ttl_minutes: i64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or(&env_map, "PORT", "8080")?;
        let database_path = required(&env_map, "DATABASE_PATH")?;
        let payment_api_url = env_map
            .get("PAYMENT_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://api.payments.example".to_string());
        let payment_secret_key = required(&env_map, "PAYMENT_SECRET_KEY")?;
        let payment_webhook_secret = required(&env_map, "PAYMENT_WEBHOOK_SECRET")?;
        let shipping_api_url = env_map.get("SHIPPING_API_URL").cloned();

        let platform_fee_bps: i64 = parse_or(&env_map, "PLATFORM_FEE_BPS", "3000")?;
        if !(0..=10_000).contains(&platform_fee_bps) {
            return Err(ConfigError::InvalidValue(
                "PLATFORM_FEE_BPS".to_string(),
                "must be between 0 and 10000".to_string(),
            ));
        }

        let payout_delay_days: i64 = parse_or(&env_map, "PAYOUT_DELAY_DAYS", "7")?;
        if payout_delay_days < 0 {
            return Err(ConfigError::InvalidValue(
                "PAYOUT_DELAY_DAYS".to_string(),
                "must be >= 0".to_string(),
            ));
        }

        let hold_ttl_minutes: i64 = parse_or(&env_map, "HOLD_TTL_MINUTES", "15")?;
        if hold_ttl_minutes <= 0 {
            return Err(ConfigError::InvalidValue(
                "HOLD_TTL_MINUTES".to_string(),
                "must be > 0".to_string(),
            ));
        }

        let home_country = Country::new(
            env_map
                .get("HOME_COUNTRY")
                .map(|s| s.as_str())
                .unwrap_or("PT"),
        );

        let tax_rate_bps: i64 = parse_or(&env_map, "TAX_RATE_BPS", "2300")?;
        let flat_shipping_minor: i64 = parse_or(&env_map, "FLAT_SHIPPING_MINOR", "2500")?;
        let vat_cache_ttl_minutes: i64 = parse_or(&env_map, "VAT_CACHE_TTL_MINUTES", "60")?;

        let tax_jurisdiction = env_map
            .get("TAX_JURISDICTION")
            .map(|s| s.as_str())
            .unwrap_or(EU_COUNTRIES)
            .split(',')
            .map(Country::new)
            .filter(|c| !c.as_str().is_empty())
            .collect();

        let allow_guest_checkout = match env_map
            .get("ALLOW_GUEST_CHECKOUT")
            .map(|s| s.as_str())
            .unwrap_or("true")
        {
            "true" | "1" => true,
            "false" | "0" => false,
            other => {
                return Err(ConfigError::InvalidValue(
                    "ALLOW_GUEST_CHECKOUT".to_string(),
                    format!("must be true or false, got {}", other),
                ))
            }
        };

        Ok(Config {
            port,
            database_path,
            payment_api_url,
            payment_secret_key,
            payment_webhook_secret,
            shipping_api_url,
            platform_fee_bps,
            payout_delay_days,
            hold_ttl_minutes,
            home_country,
            tax_rate_bps,
            tax_jurisdiction,
            flat_shipping_minor,
            allow_guest_checkout,
            vat_cache_ttl_minutes,
        })
    }
}

fn required(env_map: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    env_map
        .get(key)
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
}

fn parse_or<T: std::str::FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.as_str())
        .unwrap_or(default)
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), "failed to parse".to_string()))
}
