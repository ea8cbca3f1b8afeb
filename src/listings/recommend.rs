use serde::Deserialize;

use crate::config::RECOMMENDATION_LIMIT;
use crate::listings::search::sort_by_ai_score;
use crate::types::Property;

const DEFAULT_BUDGET_MAX: f64 = 1_000_000.0;

fn default_budget_max() -> f64 {
    DEFAULT_BUDGET_MAX
}

#[derive(Debug, Clone, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub budget_min: f64,
    #[serde(default = "default_budget_max")]
    pub budget_max: f64,
    /// Minimum bedrooms; 0 accepts any.
    #[serde(default)]
    pub bedrooms: u32,
    /// Empty accepts any city.
    #[serde(default)]
    pub cities: Vec<String>,
    /// State used to look listings up for each city.
    #[serde(default)]
    pub state: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            budget_min: 0.0,
            budget_max: DEFAULT_BUDGET_MAX,
            bedrooms: 0,
            cities: Vec::new(),
            state: None,
        }
    }
}

impl Preferences {
    fn accepts(&self, p: &Property) -> bool {
        p.price >= self.budget_min
            && p.price <= self.budget_max
            && p.bedrooms >= self.bedrooms
            && (self.cities.is_empty()
                || self
                    .cities
                    .iter()
                    .any(|c| c.trim().eq_ignore_ascii_case(p.city.trim())))
    }
}

/// Listings matching the preferences, best AI score first, at most ten.
pub fn recommend(listings: &[Property], prefs: &Preferences) -> Vec<Property> {
    let mut picks: Vec<Property> = listings.iter().filter(|p| prefs.accepts(p)).cloned().collect();
    sort_by_ai_score(&mut picks);
    picks.truncate(RECOMMENDATION_LIMIT);
    picks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;
    use serde_json::json;

    fn listing(city: &str, price: f64, beds: u32, dom: u32) -> Property {
        normalize(&json!({
            "address": {"city": city},
            "price": price,
            "bedrooms": beds,
            "daysOnMarket": dom,
        }))
        .unwrap()
    }

    #[test]
    fn defaults_deserialize_from_empty_body() {
        let prefs: Preferences = serde_json::from_value(json!({})).unwrap();
        assert_eq!(prefs.budget_min, 0.0);
        assert_eq!(prefs.budget_max, 1_000_000.0);
        assert_eq!(prefs.bedrooms, 0);
        assert!(prefs.cities.is_empty());
    }

    #[test]
    fn filters_budget_bedrooms_and_city() {
        let listings = vec![
            listing("Austin", 500_000.0, 3, 10),
            listing("Austin", 1_500_000.0, 4, 10),
            listing("Austin", 450_000.0, 1, 10),
            listing("Dallas", 400_000.0, 3, 10),
        ];
        let prefs = Preferences {
            bedrooms: 2,
            cities: vec!["AUSTIN".to_string()],
            ..Default::default()
        };
        let picks = recommend(&listings, &prefs);
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].price, 500_000.0);
    }

    #[test]
    fn sorted_by_score_and_capped() {
        let mut listings: Vec<Property> = (0..15)
            .map(|i| listing("Austin", 500_000.0, 2, 5 + i * 10))
            .collect();
        listings.reverse();
        let picks = recommend(&listings, &Preferences::default());
        assert_eq!(picks.len(), RECOMMENDATION_LIMIT);
        assert!(picks.windows(2).all(|w| w[0].ai_score >= w[1].ai_score));
        assert_eq!(picks[0].days_on_market, 5);
    }
}
