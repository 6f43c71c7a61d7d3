//! Flex payout expectation.
//!
//! Computes the expected value of a slip under a partial-payout schedule:
//! a full multiplier when every leg hits, a consolation multiplier when
//! exactly one leg misses, nothing otherwise.

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Payout multipliers for one slip size.
#[derive(Debug, Clone)]
pub struct FlexPayout {
    /// Multiplier applied to the stake when all legs hit.
    pub full_hit_mult: f64,
    /// Multiplier when exactly one leg misses.
    pub one_miss_mult: f64,
}

impl Default for FlexPayout {
    fn default() -> Self {
        Self {
            full_hit_mult: 3.0,
            one_miss_mult: 1.0,
        }
    }
}

impl FlexPayout {
    /// Expected profit of a slip with the given per-leg hit probabilities
    /// and stake.
    ///
    /// Legs are treated as independent events. Legs sharing a game or team
    /// are correlated in reality; that is a knowing approximation, not
    /// corrected here.
    pub fn expected_value(&self, probabilities: &[f64], stake: f64) -> f64 {
        let probs: Vec<f64> = probabilities.iter().map(|p| p.clamp(0.0, 1.0)).collect();

        let p_all: f64 = probs.iter().product();

        // exactly one miss: each leg misses while every other leg hits
        let mut p_one_miss = 0.0;
        for (i, pi) in probs.iter().enumerate() {
            let mut term = 1.0 - pi;
            for (j, pj) in probs.iter().enumerate() {
                if j != i {
                    term *= pj;
                }
            }
            p_one_miss += term;
        }

        stake * (self.full_hit_mult * p_all + self.one_miss_mult * p_one_miss) - stake
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_three_leg_value() {
        let payout = FlexPayout::default();
        // P(all) = 0.216, P(exactly 2) = 3 * 0.6 * 0.6 * 0.4 = 0.432
        // EV = 10 * (3 * 0.216 + 1 * 0.432) - 10 = 0.80
        let ev = payout.expected_value(&[0.6, 0.6, 0.6], 10.0);
        assert!((ev - 0.80).abs() < 1e-9, "ev = {ev}");
    }

    #[test]
    fn test_certain_legs_pay_full_multiplier() {
        let payout = FlexPayout::default();
        let ev = payout.expected_value(&[1.0, 1.0, 1.0], 10.0);
        assert!((ev - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_hopeless_legs_lose_stake() {
        let payout = FlexPayout::default();
        let ev = payout.expected_value(&[0.0, 0.0, 0.0], 10.0);
        assert!((ev - (-10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_single_certain_miss_pays_consolation() {
        let payout = FlexPayout::default();
        // two locks and one certain miss: exactly-one-miss with certainty
        let ev = payout.expected_value(&[1.0, 1.0, 0.0], 10.0);
        assert!((ev - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_probabilities_clamped() {
        let payout = FlexPayout::default();
        let clamped = payout.expected_value(&[1.7, 1.2, -0.3], 10.0);
        let explicit = payout.expected_value(&[1.0, 1.0, 0.0], 10.0);
        assert!((clamped - explicit).abs() < 1e-9);
    }

    #[test]
    fn test_ev_monotone_in_probability() {
        let payout = FlexPayout::default();
        let low = payout.expected_value(&[0.55, 0.55, 0.55], 10.0);
        let high = payout.expected_value(&[0.60, 0.60, 0.60], 10.0);
        assert!(high > low);
    }

    #[test]
    fn test_ev_scales_with_stake() {
        let payout = FlexPayout::default();
        let one = payout.expected_value(&[0.6, 0.6, 0.6], 1.0);
        let ten = payout.expected_value(&[0.6, 0.6, 0.6], 10.0);
        assert!((ten - one * 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_alternate_multipliers() {
        let payout = FlexPayout {
            full_hit_mult: 5.0,
            one_miss_mult: 0.5,
        };
        let ev = payout.expected_value(&[0.6, 0.6, 0.6], 10.0);
        let expected = 10.0 * (5.0 * 0.216 + 0.5 * 0.432) - 10.0;
        assert!((ev - expected).abs() < 1e-9);
    }

    #[test]
    fn test_generalizes_to_four_legs() {
        let payout = FlexPayout::default();
        let p = 0.7_f64;
        let p_all = p.powi(4);
        let p_one_miss = 4.0 * (1.0 - p) * p.powi(3);
        let expected = 10.0 * (3.0 * p_all + 1.0 * p_one_miss) - 10.0;
        let ev = payout.expected_value(&[p, p, p, p], 10.0);
        assert!((ev - expected).abs() < 1e-9);
    }
}
