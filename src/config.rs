use std::time::Duration;

use crate::error::{AppError, Result};

pub const COMPS_API_URL: &str = "https://api.rentcast.io/v1/sales";
pub const LISTINGS_API_URL: &str = "https://api.rentcast.io/v1/listings/sale";

/// Lifetime of a cached comparables or listings result (seconds).
pub const CACHE_TTL_SECS: u64 = 3600;

/// Hard timeout on every outbound provider call (seconds).
pub const UPSTREAM_TIMEOUT_SECS: u64 = 10;

/// Comparable sales requested per ZIP code.
pub const DEFAULT_COMPS_LIMIT: usize = 20;

/// Listings requested from the provider per location.
pub const LISTINGS_FETCH_LIMIT: usize = 50;

pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const MAX_SEARCH_LIMIT: usize = 50;
pub const RECOMMENDATION_LIMIT: usize = 10;

/// Location used when a listing request names none.
pub const DEFAULT_CITY: &str = "Austin";
pub const DEFAULT_STATE: &str = "TX";

/// Channel capacity for the DB writer.
pub const CHANNEL_CAPACITY: usize = 1024;

/// Bucket boundaries used by the valuation report.
pub mod report_thresholds {
    /// |price_diff_pct| beyond this is outside the typical range. Exactly 10.0 is within.
    pub const POSITIONING_PCT: f64 = 10.0;
    /// Average days on market above this reads as a slower market.
    pub const SLOW_MARKET_DAYS: i64 = 60;
    /// Average days on market below this reads as a faster market.
    pub const FAST_MARKET_DAYS: i64 = 30;
    /// Value range is median × [LOW, HIGH]. ±7% covers unmeasured condition variance.
    pub const VALUE_RANGE_LOW: f64 = 0.93;
    pub const VALUE_RANGE_HIGH: f64 = 1.07;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Sold-homes-by-ZIP endpoint (COMPS_API_URL)
    pub comps_api_url: String,
    pub comps_api_key: Option<String>,
    /// Listing search endpoint (LISTINGS_API_URL)
    pub listings_api_url: String,
    /// When unset the listing client serves the bundled sample set (LISTINGS_API_KEY)
    pub listings_api_key: Option<String>,
    pub cache_ttl_secs: u64,
    pub upstream_timeout_secs: u64,
    pub comps_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "estateiq.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            comps_api_url: std::env::var("COMPS_API_URL")
                .unwrap_or_else(|_| COMPS_API_URL.to_string()),
            comps_api_key: non_empty_var("COMPS_API_KEY"),
            listings_api_url: std::env::var("LISTINGS_API_URL")
                .unwrap_or_else(|_| LISTINGS_API_URL.to_string()),
            listings_api_key: non_empty_var("LISTINGS_API_KEY"),
            cache_ttl_secs: std::env::var("CACHE_TTL_SECS")
                .unwrap_or_else(|_| CACHE_TTL_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(CACHE_TTL_SECS),
            upstream_timeout_secs: std::env::var("UPSTREAM_TIMEOUT_SECS")
                .unwrap_or_else(|_| UPSTREAM_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(UPSTREAM_TIMEOUT_SECS),
            comps_limit: std::env::var("COMPS_LIMIT")
                .unwrap_or_else(|_| DEFAULT_COMPS_LIMIT.to_string())
                .parse::<usize>()
                .unwrap_or(DEFAULT_COMPS_LIMIT),
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
