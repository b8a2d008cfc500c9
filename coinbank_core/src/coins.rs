//! Weight to coin-count conversion for a single denomination.

use crate::util::{round_mg, whole_units};

/// At or below this weight the bank is treated as empty.
pub const EMPTY_BANK_G: f64 = 0.001;

/// Derived view of a weight; recomputed on every query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoinBreakdown {
    pub count: u64,
    pub value: f64,
    pub weight_used_g: f64,
    pub weight_remaining_g: f64,
    pub total_weight_g: f64,
}

impl CoinBreakdown {
    fn empty(weight_g: f64) -> Self {
        Self {
            count: 0,
            value: 0.0,
            weight_used_g: 0.0,
            weight_remaining_g: 0.0,
            total_weight_g: weight_g,
        }
    }
}

/// Count whole coins of `coin_mass_g` in `weight_g`.
///
/// Weights at or below [`EMPTY_BANK_G`] give a zero breakdown that carries
/// `weight_g` through unchanged, so a negative input stays visible to the
/// caller. Displayed fields are rounded to milligrams; the count is taken
/// from the unrounded quotient.
pub fn breakdown(weight_g: f64, coin_mass_g: f64, coin_value: f64) -> CoinBreakdown {
    if weight_g.is_nan() || weight_g <= EMPTY_BANK_G {
        return CoinBreakdown::empty(weight_g);
    }
    let count = whole_units(weight_g, coin_mass_g);
    let used = count as f64 * coin_mass_g;
    CoinBreakdown {
        count,
        value: round_mg(count as f64 * coin_value),
        weight_used_g: round_mg(used),
        weight_remaining_g: round_mg(weight_g - used),
        total_weight_g: round_mg(weight_g),
    }
}

/// Progress towards a savings goal priced at `prize`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalProgress {
    /// Percent of the prize already saved, capped at 100, one decimal.
    pub percent: f64,
    /// Value still missing, never negative.
    pub remaining_value: f64,
    /// Additional coins needed to cover `remaining_value`, rounded up.
    pub coins_needed: u64,
}

pub fn goal_progress(saved: &CoinBreakdown, prize: f64, coin_value: f64) -> GoalProgress {
    if !prize.is_finite() || prize <= 0.0 {
        return GoalProgress {
            percent: 0.0,
            remaining_value: 0.0,
            coins_needed: 0,
        };
    }
    let percent = ((saved.value / prize) * 100.0).min(100.0);
    let remaining_value = (prize - saved.value).max(0.0);
    let coins_needed = if coin_value > 0.0 {
        (remaining_value / coin_value).ceil() as u64
    } else {
        0
    };
    GoalProgress {
        percent: (percent * 10.0).round() / 10.0,
        remaining_value,
        coins_needed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const RS2_MASS_G: f64 = 0.008;

    #[test]
    fn reference_breakdown() {
        let b = breakdown(12.345, RS2_MASS_G, 2.0);
        assert_eq!(b.count, 1543);
        assert_eq!(b.value, 3086.0);
        assert_eq!(b.weight_used_g, 12.344);
        assert_eq!(b.weight_remaining_g, 0.001);
        assert_eq!(b.total_weight_g, 12.345);
    }

    #[rstest]
    #[case(0.0)]
    #[case(0.001)]
    #[case(-0.5)]
    fn empty_bank_keeps_total(#[case] w: f64) {
        let b = breakdown(w, RS2_MASS_G, 2.0);
        assert_eq!(b.count, 0);
        assert_eq!(b.value, 0.0);
        assert_eq!(b.total_weight_g, w);
    }

    #[test]
    fn nan_weight_is_empty() {
        let b = breakdown(f64::NAN, RS2_MASS_G, 2.0);
        assert_eq!(b.count, 0);
        assert!(b.total_weight_g.is_nan());
    }

    #[test]
    fn less_than_one_coin() {
        let b = breakdown(0.005, RS2_MASS_G, 2.0);
        assert_eq!(b.count, 0);
        assert_eq!(b.weight_remaining_g, 0.005);
    }

    #[rstest]
    #[case(3086.0, 5000.0, 61.7, 957)]
    #[case(3086.0, 3000.0, 100.0, 0)]
    #[case(3086.0, 3087.0, 100.0, 1)]
    #[case(0.0, 10.0, 0.0, 5)]
    fn goal_progress_cases(
        #[case] saved_value: f64,
        #[case] prize: f64,
        #[case] percent: f64,
        #[case] needed: u64,
    ) {
        let saved = CoinBreakdown {
            count: (saved_value / 2.0) as u64,
            value: saved_value,
            weight_used_g: 0.0,
            weight_remaining_g: 0.0,
            total_weight_g: 0.0,
        };
        let g = goal_progress(&saved, prize, 2.0);
        assert_eq!(g.percent, percent);
        assert_eq!(g.coins_needed, needed);
    }

    #[test]
    fn non_positive_prize_has_no_progress() {
        let saved = breakdown(1.0, RS2_MASS_G, 2.0);
        let g = goal_progress(&saved, 0.0, 2.0);
        assert_eq!(g.percent, 0.0);
        assert_eq!(g.coins_needed, 0);
    }
}
