use std::sync::Arc;

use tracing::info;

use crate::config::{DEFAULT_SEARCH_LIMIT, LISTINGS_FETCH_LIMIT, MAX_SEARCH_LIMIT};
use crate::fetcher::ListingsClient;
use crate::normalizer;
use crate::state::TtlCache;
use crate::types::Property;

pub type ListingsCache = TtlCache<String, Arc<Vec<Property>>>;

/// Post-cache filters for a listing search. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct ListingFilters {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Exact bedroom count.
    pub bedrooms: Option<u32>,
    /// Case-insensitive match on `Property::property_type`.
    pub property_type: Option<String>,
    pub limit: Option<usize>,
}

impl ListingFilters {
    fn matches(&self, p: &Property) -> bool {
        self.min_price.map_or(true, |min| p.price >= min)
            && self.max_price.map_or(true, |max| p.price <= max)
            && self.bedrooms.map_or(true, |beds| p.bedrooms == beds)
            && self
                .property_type
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map_or(true, |t| p.property_type.eq_ignore_ascii_case(t))
    }

    fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT)
    }
}

/// Normalized listings per location, cached for the TTL window.
pub struct ListingService {
    client: ListingsClient,
    cache: Arc<ListingsCache>,
}

impl ListingService {
    pub fn new(client: ListingsClient, cache: Arc<ListingsCache>) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &ListingsCache {
        &self.cache
    }

    /// Every normalized listing for a location, served from cache within the TTL.
    pub async fn listings_for(&self, city: &str, state: &str) -> Arc<Vec<Property>> {
        let key = location_key(city, state);
        self.cache
            .get_or_fetch(key, || async {
                let raw = self
                    .client
                    .fetch_listings(city.trim(), state.trim(), LISTINGS_FETCH_LIMIT)
                    .await;
                Arc::new(normalizer::normalize_batch(&raw))
            })
            .await
    }

    /// One listing by `Property::id` within a location. Case-insensitive.
    pub async fn find(&self, city: &str, state: &str, id: &str) -> Option<Property> {
        let id = id.trim().to_ascii_lowercase();
        let all = self.listings_for(city, state).await;
        all.iter().find(|p| p.id == id).cloned()
    }

    /// Filtered listings for a location, best AI score first.
    pub async fn search_listings(
        &self,
        city: &str,
        state: &str,
        filters: &ListingFilters,
    ) -> Vec<Property> {
        let all = self.listings_for(city, state).await;
        let mut hits: Vec<Property> = all.iter().filter(|p| filters.matches(p)).cloned().collect();
        sort_by_ai_score(&mut hits);
        hits.truncate(filters.effective_limit());

        info!(
            city = %city,
            state = %state,
            available = all.len(),
            returned = hits.len(),
            "Listing search"
        );
        hits
    }
}

/// Cache key for a location: `"{city}|{state}"`, trimmed and lower-cased.
pub fn location_key(city: &str, state: &str) -> String {
    format!("{}|{}", city.trim(), state.trim()).to_lowercase()
}

pub(crate) fn sort_by_ai_score(listings: &mut [Property]) {
    listings.sort_by(|a, b| b.ai_score.total_cmp(&a.ai_score));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::health::HealthState;
    use crate::api::latency::ProviderLatency;
    use crate::test_support::spawn_upstream;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn sample_service() -> ListingService {
        let client = ListingsClient::with_endpoint(
            "http://127.0.0.1:9".to_string(),
            None,
            Duration::from_secs(1),
            Arc::new(HealthState::new()),
            Arc::new(ProviderLatency::new()),
        )
        .unwrap();
        ListingService::new(client, Arc::new(TtlCache::new(Duration::from_secs(3600))))
    }

    #[test]
    fn location_key_is_case_and_whitespace_insensitive() {
        assert_eq!(location_key(" Austin ", "tx"), "austin|tx");
        assert_eq!(location_key("AUSTIN", "TX"), location_key("austin", "tx"));
    }

    #[tokio::test]
    async fn results_are_sorted_by_ai_score() {
        let svc = sample_service();
        let hits = svc.search_listings("Austin", "TX", &ListingFilters::default()).await;
        assert_eq!(hits.len(), 3);
        assert!(hits.windows(2).all(|w| w[0].ai_score >= w[1].ai_score));
    }

    #[tokio::test]
    async fn filters_apply_after_cache() {
        let svc = sample_service();
        let all = svc.search_listings("Nowhere", "TX", &ListingFilters::default()).await;
        assert_eq!(all.len(), 6);

        let max_price = all.iter().map(|p| p.price).fold(f64::MIN, f64::max);
        let filters = ListingFilters {
            max_price: Some(max_price - 1.0),
            ..Default::default()
        };
        let cheaper = svc.search_listings("Nowhere", "TX", &filters).await;
        assert!(cheaper.len() < all.len());
        assert!(cheaper.iter().all(|p| p.price < max_price));

        let beds = all[0].bedrooms;
        let filters = ListingFilters {
            bedrooms: Some(beds),
            ..Default::default()
        };
        let exact = svc.search_listings("Nowhere", "TX", &filters).await;
        assert!(!exact.is_empty());
        assert!(exact.iter().all(|p| p.bedrooms == beds));

        assert_eq!(svc.cache().len(), 1);
    }

    #[tokio::test]
    async fn property_type_matches_case_insensitively() {
        let svc = sample_service();
        let all = svc.search_listings("Nowhere", "TX", &ListingFilters::default()).await;
        let wanted = all[0].property_type.to_uppercase();
        let filters = ListingFilters {
            property_type: Some(wanted.clone()),
            ..Default::default()
        };
        let hits = svc.search_listings("Nowhere", "TX", &filters).await;
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|p| p.property_type.to_uppercase() == wanted));
    }

    #[tokio::test]
    async fn limit_defaults_and_caps() {
        let svc = sample_service();
        let one = ListingFilters {
            limit: Some(1),
            ..Default::default()
        };
        assert_eq!(svc.search_listings("Nowhere", "TX", &one).await.len(), 1);
        assert_eq!(ListingFilters::default().effective_limit(), DEFAULT_SEARCH_LIMIT);
        let huge = ListingFilters {
            limit: Some(10_000),
            ..Default::default()
        };
        assert_eq!(huge.effective_limit(), MAX_SEARCH_LIMIT);
    }

    #[tokio::test]
    async fn provider_is_called_once_per_location_within_ttl() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/listings",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!([{"address": {"city": "Austin"}, "price": 400000}]))
                }
            }),
        );
        let base = spawn_upstream(router).await;
        let client = ListingsClient::with_endpoint(
            format!("{base}/listings"),
            Some("key".to_string()),
            Duration::from_secs(2),
            Arc::new(HealthState::new()),
            Arc::new(ProviderLatency::new()),
        )
        .unwrap();
        let svc = ListingService::new(client, Arc::new(TtlCache::new(Duration::from_secs(3600))));

        svc.search_listings("Austin", "TX", &ListingFilters::default()).await;
        svc.search_listings("austin", "tx", &ListingFilters::default()).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
