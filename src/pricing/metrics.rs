use serde::Serialize;

use crate::scorer::alignment_score;
use crate::types::{ComparableSale, PropertyInput};

/// Aggregate statistics for one subject against its comparable sales.
///
/// Averages only cover comparables that reported the field. A field with no
/// data points is `None`, never `0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketMetrics {
    pub median_sold_price: i64,
    pub avg_price_per_sqft: Option<i64>,
    pub subject_price_per_sqft: Option<i64>,
    pub avg_days_on_market: Option<i64>,
    /// Comparables that contributed a price to the median.
    pub comp_count: usize,
    /// (subject price − median) / median × 100, two decimals. Display only.
    pub price_diff_pct: f64,
    /// Unrounded deviation. Scores and buckets are classified from this, so a
    /// value just past a breakpoint is never rounded back inside it.
    #[serde(skip)]
    pub deviation_pct: f64,
    /// 1-10, price alignment with comparables only.
    pub alignment_score: u8,
}

/// Compute market metrics, or `None` when there is nothing to compare against:
/// no comparables at all, or none that reported a usable price.
pub fn compute(comparables: &[ComparableSale], subject: &PropertyInput) -> Option<MarketMetrics> {
    if comparables.is_empty() {
        return None;
    }

    let prices: Vec<f64> = comparables
        .iter()
        .filter_map(|c| c.price)
        .filter(|p| p.is_finite() && *p > 0.0)
        .collect();
    let prices_per_sqft: Vec<f64> = comparables
        .iter()
        .filter_map(|c| c.price_per_sqft)
        .filter(|v| v.is_finite())
        .collect();
    let days_on_market: Vec<f64> = comparables
        .iter()
        .filter_map(|c| c.days_on_market)
        .filter(|v| v.is_finite())
        .collect();

    let median_sold_price = median(&prices)?.round() as i64;
    if median_sold_price <= 0 {
        return None;
    }

    let subject_price_per_sqft = subject
        .positive_area()
        .map(|area| (subject.price / area).round() as i64);

    let median = median_sold_price as f64;
    let deviation_pct = (subject.price - median) / median * 100.0;

    Some(MarketMetrics {
        median_sold_price,
        avg_price_per_sqft: mean(&prices_per_sqft).map(|v| v.round() as i64),
        subject_price_per_sqft,
        avg_days_on_market: mean(&days_on_market).map(|v| v.round() as i64),
        comp_count: prices.len(),
        price_diff_pct: round_2dp(deviation_pct),
        deviation_pct,
        alignment_score: alignment_score(deviation_pct),
    })
}

/// Middle value, or the mean of the two middle values for an even count.
fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn round_2dp(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
