use crate::types::{InvestmentTier, Trend};

// Hand-tuned additive heuristic. Not a model.
const BASE_SCORE: f64 = 7.0;
const MIN_SCORE: f64 = 1.0;
const MAX_SCORE: f64 = 10.0;

const AFFORDABLE_PRICE: f64 = 350_000.0;
const PREMIUM_PRICE: f64 = 1_000_000.0;
const PRICE_BAND_ADJ: f64 = 0.5;

const LARGE_SQFT: f64 = 2_500.0;
const SMALL_SQFT: f64 = 900.0;
const SIZE_ADJ: f64 = 0.5;

const FAMILY_BEDROOMS: u32 = 3;
const FAMILY_BATHROOMS: f64 = 2.0;
const LAYOUT_ADJ: f64 = 0.5;

const RISING_MAX_DAYS: u32 = 30;
const DECLINING_MIN_DAYS: u32 = 90;

/// Monthly rent assumed when the provider gives none: 0.6% of price.
const RENT_TO_PRICE_MONTHLY: f64 = 0.006;
/// Share of gross rent left after taxes, insurance, maintenance and vacancy.
const NOI_SHARE: f64 = 0.75;
const DEFAULT_CAP_RATE: f64 = 6.0;

/// Heuristic 1-10 listing score. Zero inputs mean "not reported" and leave the
/// score untouched.
pub fn ai_score(price: f64, square_feet: f64, days_on_market: u32, bedrooms: u32, bathrooms: f64) -> f64 {
    let mut score = BASE_SCORE;

    if price > 0.0 {
        if price < AFFORDABLE_PRICE {
            score += PRICE_BAND_ADJ;
        } else if price > PREMIUM_PRICE {
            score -= PRICE_BAND_ADJ;
        }
    }

    if square_feet >= LARGE_SQFT {
        score += SIZE_ADJ;
    } else if square_feet > 0.0 && square_feet < SMALL_SQFT {
        score -= SIZE_ADJ;
    }

    score += match days_on_market {
        0 => 0.0,
        1..=14 => 1.0,
        15..=29 => 0.5,
        30..=60 => 0.0,
        61..=90 => -0.5,
        _ => -1.0,
    };

    if bedrooms >= FAMILY_BEDROOMS && bathrooms >= FAMILY_BATHROOMS {
        score += LAYOUT_ADJ;
    }

    round_1dp(score.clamp(MIN_SCORE, MAX_SCORE))
}

pub fn trend(days_on_market: u32) -> Trend {
    if days_on_market < RISING_MAX_DAYS {
        Trend::Rising
    } else if days_on_market > DECLINING_MIN_DAYS {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

pub fn investment_tier(ai_score: f64) -> InvestmentTier {
    if ai_score >= 8.5 {
        InvestmentTier::Excellent
    } else if ai_score >= 7.5 {
        InvestmentTier::Good
    } else if ai_score >= 6.5 {
        InvestmentTier::Fair
    } else {
        InvestmentTier::Poor
    }
}

/// Provider rent when positive, else 0.6% of price per month (whole dollars).
pub fn rental_estimate(price: f64, reported_rent: Option<f64>) -> f64 {
    match reported_rent {
        Some(rent) if rent > 0.0 => rent,
        _ => (price.max(0.0) * RENT_TO_PRICE_MONTHLY).round(),
    }
}

/// Annual NOI over price, as a percentage to one decimal. 6.0 when either input is missing.
pub fn cap_rate(price: f64, monthly_rent: f64) -> f64 {
    if price > 0.0 && monthly_rent > 0.0 {
        let noi = monthly_rent * 12.0 * NOI_SHARE;
        round_1dp(noi / price * 100.0)
    } else {
        DEFAULT_CAP_RATE
    }
}

fn round_1dp(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
