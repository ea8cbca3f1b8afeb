use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Property: canonical listing record
// ---------------------------------------------------------------------------

/// A listing after normalization. Everything from `ai_score` down is derived
/// by the normalizer and recomputed on every fetch, never taken from a payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Slug of address and ZIP, stable across refetches of the same listing.
    pub id: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub price: f64,
    pub bedrooms: u32,
    /// Half baths count as 0.5.
    pub bathrooms: f64,
    pub square_feet: f64,
    pub property_type: String,
    pub listing_date: Option<NaiveDate>,
    pub days_on_market: u32,
    pub description: String,
    pub photo_url: Option<String>,
    pub listing_url: Option<String>,

    // Neighborhood enrichment. Providers rarely send these, so each one has a
    // neutral default.
    pub amenities: Vec<String>,
    pub neighborhood_score: f64,
    pub walkability_score: f64,
    pub school_rating: f64,
    pub crime_rating: String,

    pub ai_score: f64,
    pub trend: Trend,
    pub investment_potential: InvestmentTier,
    pub rental_estimate: f64,
    pub cap_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Rising,
    Stable,
    Declining,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Trend::Rising => "Rising",
            Trend::Stable => "Stable",
            Trend::Declining => "Declining",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvestmentTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl std::fmt::Display for InvestmentTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InvestmentTier::Excellent => "Excellent",
            InvestmentTier::Good => "Good",
            InvestmentTier::Fair => "Fair",
            InvestmentTier::Poor => "Poor",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Comparable sales
// ---------------------------------------------------------------------------

/// A normalized comparable sale. `None` means the provider did not supply the
/// field; aggregates skip it instead of counting it as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparableSale {
    /// Sold price, or list price when no sold price was reported.
    pub price: Option<f64>,
    pub square_feet: Option<f64>,
    /// Only set when both price and a positive area are present.
    pub price_per_sqft: Option<f64>,
    pub days_on_market: Option<f64>,
}

// ---------------------------------------------------------------------------
// Pricing request
// ---------------------------------------------------------------------------

/// Subject property submitted for a pricing analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInput {
    #[serde(default)]
    pub address: Option<String>,
    pub zip_code: String,
    pub price: f64,
    #[serde(default)]
    pub square_feet: Option<f64>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<f64>,
    #[serde(default)]
    pub property_type: Option<String>,
}

impl PropertyInput {
    /// Area usable as a divisor, if any.
    pub fn positive_area(&self) -> Option<f64> {
        self.square_feet.filter(|a| *a > 0.0)
    }
}

// ---------------------------------------------------------------------------
// Persistence events (HTTP layer → DB writer)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct NewLead {
    pub email: String,
    pub session_id: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DbEvent {
    Lead(NewLead),
    /// Bump the counter for a named activity, e.g. `pricing_analysis`.
    Activity(&'static str),
}
