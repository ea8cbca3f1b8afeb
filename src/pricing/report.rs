use serde::Serialize;

use crate::config::report_thresholds::{
    FAST_MARKET_DAYS, POSITIONING_PCT, SLOW_MARKET_DAYS, VALUE_RANGE_HIGH, VALUE_RANGE_LOW,
};
use crate::pricing::metrics::MarketMetrics;
use crate::scorer::ALIGNMENT_RUBRIC;
use crate::types::PropertyInput;

/// Fixed text attached to every report.
pub const DISCLAIMERS: &[&str] = &[
    "This is an automated comparison of the list price with recent comparable sales. It is not an appraisal.",
    "Condition, renovations, lot, view and other features that affect value are not measured.",
    "Comparable sales data comes from third-party providers and may be incomplete or out of date.",
    "This report does not tell you to buy, sell or make an offer. Consult a licensed real estate professional or appraiser before making decisions.",
];

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Positioning {
    AboveTypicalRange,
    WithinTypicalRange,
    BelowTypicalRange,
}

impl Positioning {
    /// Exactly ±10% counts as within.
    pub fn from_price_diff_pct(pct: f64) -> Self {
        if pct > POSITIONING_PCT {
            Positioning::AboveTypicalRange
        } else if pct < -POSITIONING_PCT {
            Positioning::BelowTypicalRange
        } else {
            Positioning::WithinTypicalRange
        }
    }
}

impl std::fmt::Display for Positioning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Positioning::AboveTypicalRange => "above typical range",
            Positioning::WithinTypicalRange => "within typical range",
            Positioning::BelowTypicalRange => "below typical range",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketSpeed {
    Slower,
    Average,
    Faster,
    /// No comparable reported days on market.
    Unreported,
}

impl MarketSpeed {
    pub fn from_avg_days(avg_days_on_market: Option<i64>) -> Self {
        match avg_days_on_market {
            None => MarketSpeed::Unreported,
            Some(d) if d > SLOW_MARKET_DAYS => MarketSpeed::Slower,
            Some(d) if d < FAST_MARKET_DAYS => MarketSpeed::Faster,
            Some(_) => MarketSpeed::Average,
        }
    }
}

impl std::fmt::Display for MarketSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MarketSpeed::Slower => "slower",
            MarketSpeed::Average => "average",
            MarketSpeed::Faster => "faster",
            MarketSpeed::Unreported => "unreported",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSnapshot {
    pub subject_price: i64,
    pub median_sold_price: i64,
    pub price_diff_pct: f64,
    pub subject_price_per_sqft: Option<i64>,
    pub avg_price_per_sqft: Option<i64>,
    pub avg_days_on_market: Option<i64>,
    pub comp_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValueRange {
    pub low: i64,
    pub high: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentSummary {
    pub score: u8,
    pub rubric: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationReport {
    pub subject_address: Option<String>,
    pub snapshot: MarketSnapshot,
    pub positioning: Positioning,
    pub positioning_statement: String,
    pub market_speed: MarketSpeed,
    pub speed_statement: String,
    pub value_range: ValueRange,
    pub value_range_statement: String,
    pub alignment: AlignmentSummary,
    pub disclaimers: &'static [&'static str],
}

impl ValuationReport {
    /// Plain-text rendering, one section per paragraph.
    pub fn to_text(&self) -> String {
        let s = &self.snapshot;
        let mut out = String::new();
        if let Some(addr) = &self.subject_address {
            out.push_str(&format!("Pricing analysis for {addr}\n\n"));
        }
        out.push_str(&format!(
            "List price {} vs median sold price {} across {} comparable sales ({:+.2}%).\n",
            format_usd(s.subject_price),
            format_usd(s.median_sold_price),
            s.comp_count,
            s.price_diff_pct
        ));
        if let (Some(subject), Some(avg)) = (s.subject_price_per_sqft, s.avg_price_per_sqft) {
            out.push_str(&format!(
                "Price per sq ft {} vs comparable average {}.\n",
                format_usd(subject),
                format_usd(avg)
            ));
        }
        out.push('\n');
        for section in [
            &self.positioning_statement,
            &self.speed_statement,
            &self.value_range_statement,
        ] {
            out.push_str(section);
            out.push_str("\n\n");
        }
        out.push_str(&format!(
            "Market Alignment Score: {}/10. {}\n\n",
            self.alignment.score, self.alignment.rubric
        ));
        for line in self.disclaimers {
            out.push_str("- ");
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Build the structured report. Pure: no I/O, no clock.
pub fn render(subject: &PropertyInput, metrics: &MarketMetrics) -> ValuationReport {
    let median = metrics.median_sold_price;
    let subject_price = subject.price.round() as i64;
    let positioning = Positioning::from_price_diff_pct(metrics.deviation_pct);
    let market_speed = MarketSpeed::from_avg_days(metrics.avg_days_on_market);
    let value_range = ValueRange {
        low: (median as f64 * VALUE_RANGE_LOW).round() as i64,
        high: (median as f64 * VALUE_RANGE_HIGH).round() as i64,
    };

    ValuationReport {
        subject_address: subject
            .address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string),
        snapshot: MarketSnapshot {
            subject_price,
            median_sold_price: median,
            price_diff_pct: metrics.price_diff_pct,
            subject_price_per_sqft: metrics.subject_price_per_sqft,
            avg_price_per_sqft: metrics.avg_price_per_sqft,
            avg_days_on_market: metrics.avg_days_on_market,
            comp_count: metrics.comp_count,
        },
        positioning,
        positioning_statement: positioning_statement(positioning, subject_price, median, metrics.price_diff_pct),
        market_speed,
        speed_statement: speed_statement(market_speed, metrics.avg_days_on_market),
        value_range,
        value_range_statement: format!(
            "Based on the median of recent comparable sales, a reasonable value range is {} to {}. \
             The ±7% spread allows for condition and features these figures do not capture.",
            format_usd(value_range.low),
            format_usd(value_range.high)
        ),
        alignment: AlignmentSummary {
            score: metrics.alignment_score,
            rubric: ALIGNMENT_RUBRIC,
        },
        disclaimers: DISCLAIMERS,
    }
}

fn positioning_statement(positioning: Positioning, price: i64, median: i64, pct: f64) -> String {
    let relation = if pct > 0.0 {
        format!("{:.2}% above", pct)
    } else if pct < 0.0 {
        format!("{:.2}% below", pct.abs())
    } else {
        "equal to".to_string()
    };
    format!(
        "At {}, the list price is {positioning} of recent comparable sales: {relation} the median sold price of {}.",
        format_usd(price),
        format_usd(median)
    )
}

fn speed_statement(speed: MarketSpeed, avg_days: Option<i64>) -> String {
    match (speed, avg_days) {
        (MarketSpeed::Unreported, _) | (_, None) => {
            "Comparable sales did not report days on market, so market speed could not be assessed."
                .to_string()
        }
        (MarketSpeed::Average, Some(d)) => format!(
            "Comparable homes spent an average of {d} days on market, about average for this area."
        ),
        (speed, Some(d)) => format!(
            "Comparable homes spent an average of {d} days on market, a {speed} than average market."
        ),
    }
}

/// Whole-dollar USD with thousands separators, e.g. `$1,043,250`.
pub fn format_usd(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}
