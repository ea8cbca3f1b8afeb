mod api;
mod config;
mod db;
mod error;
mod fetcher;
mod listings;
mod normalizer;
mod pricing;
mod scorer;
mod state;
mod types;

#[cfg(test)]
mod test_support;

use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::ProviderLatency;
use crate::api::{router, ApiState};
use crate::config::{Config, CHANNEL_CAPACITY};
use crate::db::DbWriter;
use crate::error::Result;
use crate::fetcher::{ComparablesClient, ListingsClient};
use crate::listings::ListingService;
use crate::pricing::PricingService;
use crate::state::TtlCache;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", cfg.db_path))?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready at {}", cfg.db_path);

    // --- Shared state ---
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(ProviderLatency::new());
    let comps_cache = Arc::new(TtlCache::new(cfg.cache_ttl()));
    let listings_cache = Arc::new(TtlCache::new(cfg.cache_ttl()));

    // --- DB writer ---
    let (db_tx, db_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let writer = DbWriter::new(pool.clone(), db_rx, Arc::clone(&health));
    tokio::spawn(async move { writer.run().await });

    // --- Provider clients and services ---
    if cfg.comps_api_key.is_none() {
        warn!("COMPS_API_KEY not set, comparable sales requests will be unauthenticated");
    }
    let comps = ComparablesClient::new(&cfg, Arc::clone(&health), Arc::clone(&latency))?;
    let listings = ListingsClient::new(&cfg, Arc::clone(&health), Arc::clone(&latency))?;
    if listings.uses_sample_data() {
        warn!("LISTINGS_API_KEY not set, listing endpoints will serve bundled sample data");
    }

    let pricing = PricingService::new(comps, comps_cache, cfg.comps_limit);
    let listing_service = ListingService::new(listings, listings_cache);
    info!(
        ttl_secs = cfg.cache_ttl_secs,
        timeout_secs = cfg.upstream_timeout_secs,
        comps_limit = cfg.comps_limit,
        "Services ready"
    );

    // --- HTTP API server ---
    let api_state = ApiState {
        pricing: Arc::new(pricing),
        listings: Arc::new(listing_service),
        health,
        latency,
        db_tx,
        pool,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
