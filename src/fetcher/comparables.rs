use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::health::HealthState;
use crate::api::latency::ProviderLatency;
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::{build_http_client, first_number, records_from_body};
use crate::types::ComparableSale;

const SOLD_PRICE_KEYS: &[&str] = &["soldPrice", "lastSalePrice"];
const LIST_PRICE_KEYS: &[&str] = &["listPrice", "price"];
/// Providers report living area under either key.
const AREA_KEYS: &[&str] = &["squareFootage", "livingArea"];
const DAYS_ON_MARKET_KEY: &str = "daysOnMarket";

/// Client for the sold-homes-by-ZIP provider.
pub struct ComparablesClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    health: Arc<HealthState>,
    latency: Arc<ProviderLatency>,
}

impl ComparablesClient {
    pub fn new(
        cfg: &Config,
        health: Arc<HealthState>,
        latency: Arc<ProviderLatency>,
    ) -> Result<Self> {
        Self::with_endpoint(
            cfg.comps_api_url.clone(),
            cfg.comps_api_key.clone(),
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

    /// Fetch and normalize recent sales for a ZIP code.
    ///
    /// Never fails: timeouts, non-2xx responses and unreadable bodies are
    /// logged and come back as an empty list, which callers treat as "no data".
    pub async fn fetch_comparables(&self, zip_code: &str, limit: usize) -> Vec<ComparableSale> {
        let started = Instant::now();
        let result = self.fetch_raw(zip_code, limit).await;
        self.latency.comparables.record(started.elapsed());

        match result {
            Ok(records) => {
                self.health.record_upstream_ok();
                let comps = normalize_comparables(&records);
                info!(
                    zip = %zip_code,
                    received = records.len(),
                    usable = comps.len(),
                    "Fetched comparable sales"
                );
                comps
            }
            Err(e) => {
                self.health.record_upstream_failure();
                warn!(zip = %zip_code, "Comparable sales fetch failed: {e}");
                Vec::new()
            }
        }
    }

    async fn fetch_raw(&self, zip_code: &str, limit: usize) -> Result<Vec<Value>> {
        let limit = limit.to_string();
        let mut request = self
            .http
            .get(&self.endpoint)
            .query(&[("zipCode", zip_code), ("limit", limit.as_str())]);
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }

        let body: Value = request.send().await?.error_for_status()?.json().await?;
        records_from_body(body)
    }
}

/// Normalize a batch, skipping records that are not JSON objects.
pub fn normalize_comparables(records: &[Value]) -> Vec<ComparableSale> {
    records
        .iter()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let comp = normalize_comparable(raw);
            if comp.is_none() {
                warn!(index = idx, "Skipping malformed comparable sale record");
            }
            comp
        })
        .collect()
}

/// Map one raw sale into the canonical shape. `None` only for non-object records.
///
/// Sold price wins over list price; non-positive prices and areas count as
/// absent; days on market is kept only when non-zero.
pub fn normalize_comparable(raw: &Value) -> Option<ComparableSale> {
    if !raw.is_object() {
        return None;
    }

    let price = first_number(raw, SOLD_PRICE_KEYS)
        .filter(|p| *p > 0.0)
        .or_else(|| first_number(raw, LIST_PRICE_KEYS).filter(|p| *p > 0.0));
    let square_feet = first_number(raw, AREA_KEYS).filter(|a| *a > 0.0);
    let price_per_sqft = match (price, square_feet) {
        (Some(p), Some(a)) => Some(p / a),
        _ => None,
    };
    let days_on_market = first_number(raw, &[DAYS_ON_MARKET_KEY]).filter(|d| *d != 0.0);

    let comp = ComparableSale {
        price,
        square_feet,
        price_per_sqft,
        days_on_market,
    };
    debug!(?comp, "Normalized comparable sale");
    Some(comp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_upstream;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    fn client(endpoint: String, timeout: Duration) -> (ComparablesClient, Arc<HealthState>) {
        let health = Arc::new(HealthState::new());
        let client = ComparablesClient::with_endpoint(
            endpoint,
            Some("secret".to_string()),
            timeout,
            Arc::clone(&health),
            Arc::new(ProviderLatency::new()),
        )
        .unwrap();
        (client, health)
    }

    #[test]
    fn sold_price_preferred_over_list_price() {
        let comp = normalize_comparable(&json!({"soldPrice": 500000, "listPrice": 520000})).unwrap();
        assert_eq!(comp.price, Some(500000.0));
    }

    #[test]
    fn list_price_used_when_sold_price_absent() {
        let comp = normalize_comparable(&json!({"listPrice": 520000})).unwrap();
        assert_eq!(comp.price, Some(520000.0));
        let comp = normalize_comparable(&json!({"soldPrice": null, "listPrice": "430,000"})).unwrap();
        assert_eq!(comp.price, Some(430000.0));
    }

    #[test]
    fn area_read_from_either_key() {
        let a = normalize_comparable(&json!({"price": 400000, "squareFootage": 2000})).unwrap();
        let b = normalize_comparable(&json!({"price": 400000, "livingArea": 2000})).unwrap();
        assert_eq!(a.square_feet, Some(2000.0));
        assert_eq!(b.square_feet, Some(2000.0));
        assert_eq!(a.price_per_sqft, Some(200.0));
        assert_eq!(b.price_per_sqft, Some(200.0));
    }

    #[test]
    fn price_per_sqft_requires_positive_area_and_price() {
        let zero_area = normalize_comparable(&json!({"price": 400000, "squareFootage": 0})).unwrap();
        assert_eq!(zero_area.square_feet, None);
        assert_eq!(zero_area.price_per_sqft, None);

        let no_price = normalize_comparable(&json!({"squareFootage": 1800})).unwrap();
        assert_eq!(no_price.price, None);
        assert_eq!(no_price.price_per_sqft, None);
    }

    #[test]
    fn zero_days_on_market_is_not_copied() {
        let zero = normalize_comparable(&json!({"price": 1, "daysOnMarket": 0})).unwrap();
        assert_eq!(zero.days_on_market, None);
        let some = normalize_comparable(&json!({"price": 1, "daysOnMarket": 21})).unwrap();
        assert_eq!(some.days_on_market, Some(21.0));
    }

    #[test]
    fn malformed_records_are_skipped_not_fatal() {
        let comps = normalize_comparables(&[
            json!({"soldPrice": 300000}),
            json!("garbage"),
            json!(null),
            json!({"soldPrice": 310000}),
        ]);
        assert_eq!(comps.len(), 2);
    }

    #[tokio::test]
    async fn fetch_sends_zip_limit_and_key() {
        let router = Router::new().route(
            "/sales",
            get(|Query(q): Query<HashMap<String, String>>, headers: HeaderMap| async move {
                let key_ok = headers.get("X-Api-Key").map(|v| v == "secret").unwrap_or(false);
                if q.get("zipCode").map(String::as_str) != Some("78701")
                    || q.get("limit").map(String::as_str) != Some("5")
                    || !key_ok
                {
                    return Json(json!([]));
                }
                Json(json!({"results": [
                    {"soldPrice": 900000, "squareFootage": 1800, "daysOnMarket": 12},
                    {"listPrice": 950000, "livingArea": 1900}
                ]}))
            }),
        );
        let base = spawn_upstream(router).await;
        let (client, health) = client(format!("{base}/sales"), Duration::from_secs(5));

        let comps = client.fetch_comparables("78701", 5).await;
        assert_eq!(comps.len(), 2);
        assert_eq!(comps[0].price, Some(900000.0));
        assert_eq!(comps[1].price_per_sqft, Some(500.0));
        assert_eq!(health.upstream_successes(), 1);
    }

    #[tokio::test]
    async fn non_2xx_yields_empty_list() {
        let router = Router::new().route(
            "/sales",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = spawn_upstream(router).await;
        let (client, health) = client(format!("{base}/sales"), Duration::from_secs(5));

        assert!(client.fetch_comparables("78701", 20).await.is_empty());
        assert_eq!(health.upstream_failures(), 1);
    }

    #[tokio::test]
    async fn malformed_body_yields_empty_list() {
        let router = Router::new().route("/sales", get(|| async { "<html>maintenance</html>" }));
        let base = spawn_upstream(router).await;
        let (client, _) = client(format!("{base}/sales"), Duration::from_secs(5));

        assert!(client.fetch_comparables("78701", 20).await.is_empty());
    }

    #[tokio::test]
    async fn timeout_yields_empty_list() {
        let router = Router::new().route(
            "/sales",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!([{"soldPrice": 1}]))
            }),
        );
        let base = spawn_upstream(router).await;
        let (client, health) = client(format!("{base}/sales"), Duration::from_millis(100));

        assert!(client.fetch_comparables("78701", 20).await.is_empty());
        assert_eq!(health.upstream_failures(), 1);
    }
}
