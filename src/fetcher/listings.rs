use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{info, warn};

use crate::api::health::HealthState;
use crate::api::latency::ProviderLatency;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::fetcher::{build_http_client, records_from_body};

/// Raw sample payloads served when no listings API key is configured.
const SAMPLE_LISTINGS: &str = include_str!("../../data/sample_listings.json");

/// Client for the listing search provider. Returns raw records; the
/// normalizer turns them into `Property` values.
pub struct ListingsClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    health: Arc<HealthState>,
    latency: Arc<ProviderLatency>,
}

impl ListingsClient {
    pub fn new(
        cfg: &Config,
        health: Arc<HealthState>,
        latency: Arc<ProviderLatency>,
    ) -> Result<Self> {
        Self::with_endpoint(
            cfg.listings_api_url.clone(),
            cfg.listings_api_key.clone(),
            cfg.upstream_timeout(),
            health,
            latency,
        )
    }

    pub fn with_endpoint(
        endpoint: String,
        api_key: Option<String>,
        timeout: Duration,
        health: Arc<HealthState>,
        latency: Arc<ProviderLatency>,
    ) -> Result<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            endpoint,
            api_key,
            health,
            latency,
        })
    }

    pub fn uses_sample_data(&self) -> bool {
        self.api_key.is_none()
    }

    /// Raw listings for a city. Failures are logged and come back empty.
    pub async fn fetch_listings(&self, city: &str, state: &str, limit: usize) -> Vec<Value> {
        if self.uses_sample_data() {
            info!(city = %city, state = %state, "LISTINGS_API_KEY not set, serving sample listings");
            return sample_listings(city);
        }

        let started = Instant::now();
        let result = self.fetch_raw(city, state, limit).await;
        self.latency.listings.record(started.elapsed());

        match result {
            Ok(records) => {
                self.health.record_upstream_ok();
                info!(city = %city, state = %state, count = records.len(), "Fetched listings");
                records
            }
            Err(e) => {
                self.health.record_upstream_failure();
                warn!(city = %city, state = %state, "Listings fetch failed: {e}");
                Vec::new()
            }
        }
    }

    async fn fetch_raw(&self, city: &str, state: &str, limit: usize) -> Result<Vec<Value>> {
        let limit = limit.to_string();
        let mut request = self.http.get(&self.endpoint).query(&[
            ("city", city),
            ("state", state),
            ("limit", limit.as_str()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }

        let body: Value = request.send().await?.error_for_status()?.json().await?;
        records_from_body(body)
    }
}

/// Bundled samples matching `city`, or all of them when none match.
pub fn sample_listings(city: &str) -> Vec<Value> {
    let parsed = serde_json::from_str::<Value>(SAMPLE_LISTINGS)
        .map_err(AppError::from)
        .and_then(records_from_body);
    let all = match parsed {
        Ok(records) => records,
        Err(e) => {
            warn!("Bundled sample listings unreadable: {e}");
            return Vec::new();
        }
    };

    let matching: Vec<Value> = all
        .iter()
        .filter(|raw| {
            raw.pointer("/address/city")
                .and_then(|c| c.as_str())
                .map_or(false, |c| c.eq_ignore_ascii_case(city.trim()))
        })
        .cloned()
        .collect();

    if matching.is_empty() {
        all
    } else {
        matching
    }
}
