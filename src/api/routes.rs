use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::health::HealthState;
use crate::api::latency::{LatencySnapshot, ProviderLatency};
use crate::config::{DEFAULT_CITY, DEFAULT_STATE};
use crate::db::models::ActivityRow;
use crate::db::writer::{activity_counts, lead_count};
use crate::error::AppError;
use crate::listings::{self, location_key, ListingFilters, ListingService, MarketOverview, Preferences};
use crate::pricing::{parse_zip, PricingAnalysis, PricingService};
use crate::types::{DbEvent, NewLead, Property, PropertyInput};

const MAX_EMAIL_LEN: usize = 254;

#[derive(Clone)]
pub struct ApiState {
    pub pricing: Arc<PricingService>,
    pub listings: Arc<ListingService>,
    pub health: Arc<HealthState>,
    pub latency: Arc<ProviderLatency>,
    pub db_tx: mpsc::Sender<DbEvent>,
    pub pool: sqlx::SqlitePool,
}

impl ApiState {
    /// Queue a DB event without waiting. A full channel drops the event.
    fn queue(&self, event: DbEvent) {
        match self.db_tx.try_send(event) {
            Ok(()) => self.health.inc_write_queue_pending(),
            Err(e) => warn!("DB writer channel full: {e}"),
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .route("/stats/activity", get(get_stats_activity))
        .route("/api/pricing/analyze", post(post_pricing_analyze))
        .route("/api/properties", get(get_properties))
        .route("/api/property/:id", get(get_property))
        .route("/api/market-analytics", get(get_market_analytics))
        .route("/api/recommendations", post(post_recommendations))
        .route("/api/leads", post(post_lead))
        .route("/api/cache/invalidate", post(post_cache_invalidate))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param / body structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct PropertiesQuery {
    pub city: Option<String>,
    pub state: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub bedrooms: Option<u32>,
    pub property_type: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct LocationQuery {
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Deserialize)]
pub struct LeadRequest {
    pub email: String,
    pub session_id: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheScope {
    Comparables,
    Listings,
    All,
}

#[derive(Deserialize)]
pub struct InvalidateRequest {
    pub scope: CacheScope,
    /// ZIP for comparables, "city|state" for listings. Absent clears the whole scope.
    pub key: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub upstream_successes: u64,
    pub upstream_failures: u64,
    pub last_upstream_ok_at: u64,
    pub write_queue_pending: u64,
    pub cache_ttl_secs: u64,
    pub comparables_cached: usize,
    pub listings_cached: usize,
}

#[derive(Serialize)]
pub struct LatencyResponse {
    pub comparables: LatencySnapshot,
    pub listings: LatencySnapshot,
}

#[derive(Serialize)]
pub struct ActivityResponse {
    pub leads: i64,
    pub activity: Vec<ActivityRow>,
}

#[derive(Serialize)]
pub struct PropertiesResponse {
    pub properties: Vec<Property>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct MarketAnalyticsResponse {
    pub city: String,
    pub state: String,
    #[serde(flatten)]
    pub overview: MarketOverview,
}

#[derive(Serialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<Property>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct InvalidateResponse {
    pub scope: CacheScope,
    pub removed: usize,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        upstream_successes: state.health.upstream_successes(),
        upstream_failures: state.health.upstream_failures(),
        last_upstream_ok_at: state.health.last_upstream_ok_at(),
        write_queue_pending: state.health.write_queue_pending(),
        cache_ttl_secs: state.pricing.cache().ttl().as_secs(),
        comparables_cached: state.pricing.cache().len(),
        listings_cached: state.listings.cache().len(),
    })
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    Json(LatencyResponse {
        comparables: state.latency.comparables.snapshot(),
        listings: state.latency.listings.snapshot(),
    })
}

async fn get_stats_activity(
    State(state): State<ApiState>,
) -> Result<Json<ActivityResponse>, AppError> {
    Ok(Json(ActivityResponse {
        leads: lead_count(&state.pool).await?,
        activity: activity_counts(&state.pool).await?,
    }))
}

async fn post_pricing_analyze(
    State(state): State<ApiState>,
    payload: Result<Json<PropertyInput>, JsonRejection>,
) -> Result<Json<PricingAnalysis>, AppError> {
    let Json(input) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let analysis = state.pricing.analyze_pricing(input).await?;
    state.queue(DbEvent::Activity("pricing_analysis"));
    Ok(Json(analysis))
}

async fn get_properties(
    State(state): State<ApiState>,
    Query(params): Query<PropertiesQuery>,
) -> Json<PropertiesResponse> {
    let filters = ListingFilters {
        min_price: params.min_price,
        max_price: params.max_price,
        bedrooms: params.bedrooms,
        property_type: params.property_type,
        limit: params.limit,
    };
    let (city, st) = location(params.city, params.state);
    let properties = state.listings.search_listings(&city, &st, &filters).await;
    state.queue(DbEvent::Activity("listing_search"));
    Json(PropertiesResponse {
        count: properties.len(),
        properties,
    })
}

async fn get_property(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(params): Query<LocationQuery>,
) -> Result<Json<Property>, AppError> {
    let (city, st) = location(params.city, params.state);
    state
        .listings
        .find(&city, &st, &id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Property not found".to_string()))
}

async fn get_market_analytics(
    State(state): State<ApiState>,
    Query(params): Query<LocationQuery>,
) -> Json<MarketAnalyticsResponse> {
    let (city, st) = location(params.city, params.state);
    let all = state.listings.listings_for(&city, &st).await;
    Json(MarketAnalyticsResponse {
        overview: listings::summarize(&all),
        city,
        state: st,
    })
}

async fn post_recommendations(
    State(state): State<ApiState>,
    payload: Result<Json<Preferences>, JsonRejection>,
) -> Result<Json<RecommendationsResponse>, AppError> {
    let Json(prefs) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let st = prefs
        .state
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_STATE.to_string());

    let mut seen = HashSet::new();
    let cities: Vec<String> = if prefs.cities.is_empty() {
        vec![DEFAULT_CITY.to_string()]
    } else {
        prefs
            .cities
            .iter()
            .filter(|c| !c.trim().is_empty())
            .filter(|c| seen.insert(location_key(c, &st)))
            .cloned()
            .collect()
    };

    let batches = join_all(cities.iter().map(|c| state.listings.listings_for(c, &st))).await;
    let candidates: Vec<Property> = batches.iter().flat_map(|b| b.iter().cloned()).collect();
    let recommendations = listings::recommend(&candidates, &prefs);
    info!(
        cities = cities.len(),
        candidates = candidates.len(),
        returned = recommendations.len(),
        "Recommendations"
    );

    Ok(Json(RecommendationsResponse {
        count: recommendations.len(),
        recommendations,
    }))
}

async fn post_lead(
    State(state): State<ApiState>,
    payload: Result<Json<LeadRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let email = req.email.trim().to_lowercase();
    if !looks_like_email(&email) {
        return Err(AppError::BadRequest("email must be a valid address".to_string()));
    }
    state.queue(DbEvent::Lead(NewLead {
        email,
        session_id: non_empty(req.session_id),
        source: non_empty(req.source),
    }));
    Ok(StatusCode::ACCEPTED)
}

async fn post_cache_invalidate(
    State(state): State<ApiState>,
    payload: Result<Json<InvalidateRequest>, JsonRejection>,
) -> Result<Json<InvalidateResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let comps = state.pricing.cache();
    let listings = state.listings.cache();

    let removed = match (req.scope, non_empty(req.key)) {
        (CacheScope::Comparables, Some(zip)) => usize::from(comps.invalidate(&parse_zip(&zip)?)),
        (CacheScope::Listings, Some(key)) => usize::from(listings.invalidate(&key.to_lowercase())),
        (CacheScope::All, Some(_)) => {
            return Err(AppError::BadRequest(
                "key is not allowed with scope \"all\"".to_string(),
            ))
        }
        (CacheScope::Comparables, None) => {
            let n = comps.len();
            comps.invalidate_all();
            n
        }
        (CacheScope::Listings, None) => {
            let n = listings.len();
            listings.invalidate_all();
            n
        }
        (CacheScope::All, None) => {
            let n = comps.len() + listings.len();
            comps.invalidate_all();
            listings.invalidate_all();
            n
        }
    };
    info!(scope = ?req.scope, removed, "Cache invalidated");

    Ok(Json(InvalidateResponse {
        scope: req.scope,
        removed,
    }))
}

fn location(city: Option<String>, state: Option<String>) -> (String, String) {
    (
        non_empty(city).unwrap_or_else(|| DEFAULT_CITY.to_string()),
        non_empty(state).unwrap_or_else(|| DEFAULT_STATE.to_string()),
    )
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    email.len() <= MAX_EMAIL_LEN
        && !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}
