use std::collections::HashMap;

use serde::Serialize;

use crate::types::{Property, Trend};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendCounts {
    pub rising: usize,
    pub stable: usize,
    pub declining: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityBreakdown {
    pub city: String,
    pub avg_price: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketOverview {
    pub avg_price: f64,
    pub total_listings: usize,
    pub avg_ai_score: f64,
    /// Over listings that report days on market; `None` when none do.
    pub avg_days_on_market: Option<f64>,
    pub sentiment: TrendCounts,
    /// Highest average price first.
    pub cities: Vec<CityBreakdown>,
}

/// Aggregate view over a set of listings.
pub fn summarize(listings: &[Property]) -> MarketOverview {
    if listings.is_empty() {
        return MarketOverview::default();
    }
    let n = listings.len() as f64;

    let reported_dom: Vec<f64> = listings
        .iter()
        .filter(|p| p.days_on_market > 0)
        .map(|p| f64::from(p.days_on_market))
        .collect();
    let avg_days_on_market = (!reported_dom.is_empty())
        .then(|| round_to(reported_dom.iter().sum::<f64>() / reported_dom.len() as f64, 1));

    let mut sentiment = TrendCounts::default();
    for p in listings {
        match p.trend {
            Trend::Rising => sentiment.rising += 1,
            Trend::Stable => sentiment.stable += 1,
            Trend::Declining => sentiment.declining += 1,
        }
    }

    // (display name, price sum, count), keyed case-insensitively
    let mut by_city: HashMap<String, (String, f64, usize)> = HashMap::new();
    for p in listings {
        let entry = by_city
            .entry(p.city.to_lowercase())
            .or_insert_with(|| (p.city.clone(), 0.0, 0));
        entry.1 += p.price;
        entry.2 += 1;
    }
    let mut cities: Vec<CityBreakdown> = by_city
        .into_values()
        .map(|(city, sum, count)| CityBreakdown {
            city,
            avg_price: round_to(sum / count as f64, 2),
            count,
        })
        .collect();
    cities.sort_by(|a, b| {
        b.avg_price
            .total_cmp(&a.avg_price)
            .then_with(|| a.city.cmp(&b.city))
    });

    MarketOverview {
        avg_price: round_to(listings.iter().map(|p| p.price).sum::<f64>() / n, 2),
        total_listings: listings.len(),
        avg_ai_score: round_to(listings.iter().map(|p| p.ai_score).sum::<f64>() / n, 1),
        avg_days_on_market,
        sentiment,
        cities,
    }
}

fn round_to(v: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (v * factor).round() / factor
}
