use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::fetcher::ComparablesClient;
use crate::pricing::metrics::{self, MarketMetrics};
use crate::pricing::report::{self, ValuationReport};
use crate::state::TtlCache;
use crate::types::{ComparableSale, PropertyInput};

pub type ComparablesCache = TtlCache<String, Arc<Vec<ComparableSale>>>;

#[derive(Debug, Clone, Serialize)]
pub struct PricingAnalysis {
    pub analysis: ValuationReport,
    /// `analysis` rendered as plain text.
    pub report_text: String,
    pub metrics: MarketMetrics,
    pub comp_count: usize,
}

/// Comparables fetch, metrics and report for one subject property.
pub struct PricingService {
    comps: ComparablesClient,
    cache: Arc<ComparablesCache>,
    comps_limit: usize,
}

impl PricingService {
    pub fn new(comps: ComparablesClient, cache: Arc<ComparablesCache>, comps_limit: usize) -> Self {
        Self {
            comps,
            cache,
            comps_limit,
        }
    }

    pub fn cache(&self) -> &ComparablesCache {
        &self.cache
    }

    pub async fn analyze_pricing(&self, input: PropertyInput) -> Result<PricingAnalysis> {
        let zip = validate(&input)?;

        let comps = self
            .cache
            .get_or_fetch(zip.clone(), || async {
                Arc::new(self.comps.fetch_comparables(&zip, self.comps_limit).await)
            })
            .await;

        let Some(metrics) = metrics::compute(&comps, &input) else {
            warn!(zip = %zip, fetched = comps.len(), "No usable comparable sales");
            return Err(AppError::InsufficientData(zip));
        };

        if !metrics.deviation_pct.is_finite() {
            return Err(AppError::Computation(format!(
                "non-finite price deviation for ZIP {zip}"
            )));
        }

        let analysis = report::render(&input, &metrics);
        info!(
            zip = %zip,
            comps = metrics.comp_count,
            pct = metrics.price_diff_pct,
            score = metrics.alignment_score,
            "Pricing analysis complete"
        );

        Ok(PricingAnalysis {
            comp_count: metrics.comp_count,
            report_text: analysis.to_text(),
            analysis,
            metrics,
        })
    }
}

/// Check the subject and return its 5-digit ZIP.
pub fn validate(input: &PropertyInput) -> Result<String> {
    let zip = parse_zip(&input.zip_code)?;
    if !input.price.is_finite() || input.price <= 0.0 {
        return Err(AppError::BadRequest("price must be a positive number".to_string()));
    }
    if let Some(area) = input.square_feet {
        if !area.is_finite() || area < 0.0 {
            return Err(AppError::BadRequest(
                "square_feet must not be negative".to_string(),
            ));
        }
    }
    Ok(zip)
}

/// The 5-digit cache key for a ZIP. Surrounding whitespace is ignored and
/// ZIP+4 is trimmed to its first five digits.
pub fn parse_zip(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let (zip, plus_four_ok) = match raw.split_once('-') {
        Some((zip, ext)) => (zip, ext.len() == 4 && ext.bytes().all(|b| b.is_ascii_digit())),
        None => (raw, true),
    };
    if zip.len() != 5 || !zip.bytes().all(|b| b.is_ascii_digit()) || !plus_four_ok {
        return Err(AppError::BadRequest(
            "zip_code must be a 5-digit US ZIP code".to_string(),
        ));
    }
    Ok(zip.to_string())
}
