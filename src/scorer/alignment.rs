/// What the alignment score means. Shipped with every report.
pub const ALIGNMENT_RUBRIC: &str = "The Market Alignment Score (1-10) reflects only how closely the \
list price matches recent comparable sales in the same ZIP code: 10 is within 2% of the median sold \
price, 8 within 3%, 7 within 5%, 6 within 10%, 5 within 12%, 4 within 15%, 3 within 20%, 2 within \
25%, and 1 beyond that. It does not assess condition, quality, location within the ZIP code, or \
suitability as an investment.";

/// (max |price_diff_pct|, score), checked in order. Coarse on purpose; keep it a step function.
const ALIGNMENT_STEPS: &[(f64, u8)] = &[
    (2.0, 10),
    (3.0, 8),
    (5.0, 7),
    (10.0, 6),
    (12.0, 5),
    (15.0, 4),
    (20.0, 3),
    (25.0, 2),
];

pub const MIN_ALIGNMENT_SCORE: u8 = 1;

/// Market Alignment Score for a percentage deviation from the comparable median.
/// Non-increasing in `|price_diff_pct|`; NaN scores the minimum.
pub fn alignment_score(price_diff_pct: f64) -> u8 {
    let deviation = price_diff_pct.abs();
    ALIGNMENT_STEPS
        .iter()
        .find(|(max_pct, _)| deviation <= *max_pct)
        .map(|(_, score)| *score)
        .unwrap_or(MIN_ALIGNMENT_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_ALIGNMENT_SCORE: u8 = 10;

    #[test]
    fn breakpoints_are_inclusive() {
        assert_eq!(alignment_score(0.0), 10);
        assert_eq!(alignment_score(2.0), 10);
        assert_eq!(alignment_score(3.0), 8);
        assert_eq!(alignment_score(5.0), 7);
        assert_eq!(alignment_score(10.0), 6);
        assert_eq!(alignment_score(12.0), 5);
        assert_eq!(alignment_score(15.0), 4);
        assert_eq!(alignment_score(20.0), 3);
        assert_eq!(alignment_score(25.0), 2);
        assert_eq!(alignment_score(25.01), 1);
    }

    #[test]
    fn sign_of_deviation_does_not_matter() {
        assert_eq!(alignment_score(-2.56), alignment_score(2.56));
        assert_eq!(alignment_score(-11.0), 5);
    }

    #[test]
    fn score_is_bounded_and_non_increasing() {
        let mut previous = MAX_ALIGNMENT_SCORE;
        let mut pct = 0.0;
        while pct <= 60.0 {
            let score = alignment_score(pct);
            assert!((MIN_ALIGNMENT_SCORE..=MAX_ALIGNMENT_SCORE).contains(&score));
            assert!(score <= previous, "score rose from {previous} to {score} at {pct}%");
            previous = score;
            pct += 0.01;
        }
    }

    #[test]
    fn nan_scores_minimum() {
        assert_eq!(alignment_score(f64::NAN), MIN_ALIGNMENT_SCORE);
    }
}
