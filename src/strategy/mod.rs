//! Slate strategy — pool filtering, slip selection, and relaxation control.

pub mod filter;
pub mod payout;
pub mod selector;

use std::collections::HashSet;
use tracing::{info, warn};

use crate::types::{Leg, SlateError, Slip, TierAttempt, TierOutcome};
use filter::{filter_pool, precheck, PoolTier};
use selector::SlipSelector;

// ---------------------------------------------------------------------------
// Slate builder
// ---------------------------------------------------------------------------

/// Builds a full slate of slips by walking relaxation tiers from strict to
/// loose.
///
/// Each tier runs the cheap feasibility precheck first; selection is only
/// attempted when it passes. Within a tier the build is a sequential greedy
/// loop: every built slip's leg keys leave the pool before the next slip is
/// selected, so no leg key repeats across the slate. A tier either fills the
/// whole slate or contributes nothing.
///
/// Greedy-per-slip is a heuristic, not a joint optimizer over all N slips;
/// a stronger solver can replace `SlipSelector` behind the same contract.
pub struct SlateBuilder {
    tiers: Vec<PoolTier>,
    target_slips: usize,
    selector: SlipSelector,
}

impl SlateBuilder {
    pub fn new(tiers: Vec<PoolTier>, target_slips: usize, selector: SlipSelector) -> Self {
        Self {
            tiers,
            target_slips,
            selector,
        }
    }

    /// Build exactly `target_slips` slips, or fail with every tier's
    /// diagnosis. Success also returns the tier log for reporting.
    pub fn build_slate(
        &self,
        legs: &[Leg],
        stake: f64,
    ) -> Result<(Vec<Slip>, Vec<TierAttempt>), SlateError> {
        let legs_per_slip = self.selector.config().legs_per_slip;
        let mut attempts: Vec<TierAttempt> = Vec::new();

        for tier in &self.tiers {
            let pool = filter_pool(legs, tier);

            match precheck(&pool, self.target_slips, legs_per_slip) {
                Err((have, required)) => {
                    warn!(
                        floor = tier.probability_floor,
                        cap = tier.pool_cap,
                        have,
                        required,
                        "Tier precheck failed, relaxing"
                    );
                    attempts.push(TierAttempt {
                        probability_floor: tier.probability_floor,
                        pool_cap: tier.pool_cap,
                        outcome: TierOutcome::PrecheckFailed {
                            distinct_keys: have,
                            required,
                        },
                    });
                    continue;
                }
                Ok(distinct) => {
                    info!(
                        floor = tier.probability_floor,
                        cap = tier.pool_cap,
                        distinct,
                        "Tier precheck passed, selecting"
                    );
                }
            }

            match self.build_at_tier(&pool, stake) {
                Ok(mut slips) => {
                    // best slips first, ids follow the final order
                    slips.sort_by(|a, b| {
                        b.expected_value
                            .partial_cmp(&a.expected_value)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    });
                    for (i, slip) in slips.iter_mut().enumerate() {
                        slip.slip_id = (i + 1) as u32;
                    }
                    attempts.push(TierAttempt {
                        probability_floor: tier.probability_floor,
                        pool_cap: tier.pool_cap,
                        outcome: TierOutcome::Succeeded {
                            slips_built: slips.len(),
                        },
                    });
                    info!(
                        floor = tier.probability_floor,
                        slips = slips.len(),
                        total_ev = format!(
                            "{:+.4}",
                            slips.iter().map(|s| s.expected_value).sum::<f64>()
                        ),
                        "Slate filled"
                    );
                    return Ok((slips, attempts));
                }
                Err(built) => {
                    warn!(
                        floor = tier.probability_floor,
                        cap = tier.pool_cap,
                        built,
                        target = self.target_slips,
                        "Tier ran dry mid-build, discarding partial slate"
                    );
                    attempts.push(TierAttempt {
                        probability_floor: tier.probability_floor,
                        pool_cap: tier.pool_cap,
                        outcome: TierOutcome::SelectionStalled { slips_built: built },
                    });
                }
            }
        }

        Err(SlateError::InsufficientPool { attempts })
    }

    /// Greedy loop at one tier. Returns the slip count reached on a stall.
    fn build_at_tier(&self, pool: &[Leg], stake: f64) -> Result<Vec<Slip>, usize> {
        let mut available: Vec<Leg> = pool.to_vec();
        let mut slips: Vec<Slip> = Vec::with_capacity(self.target_slips);

        for _ in 0..self.target_slips {
            match self.selector.select(&available, stake) {
                Some(slip) => {
                    let used: HashSet<String> = slip.leg_keys().into_iter().collect();
                    available.retain(|l| !used.contains(&l.key()));
                    slips.push(slip);
                }
                None => return Err(slips.len()),
            }
        }
        Ok(slips)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::payout::FlexPayout;
    use crate::strategy::selector::SelectorConfig;
    use crate::types::{Direction, PropType};

    // ---- helpers -----------------------------------------------------------

    fn make_leg(player: &str, team: &str, prop: PropType, p: f64) -> Leg {
        Leg {
            player: player.to_string(),
            team: team.to_string(),
            prop,
            direction: if p >= 0.6 {
                Direction::Over
            } else {
                Direction::Under
            },
            line: Some(20.5),
            edge: 1.0,
            probability: p,
            rank_score: p,
        }
    }

    /// 12 legs over 4 players x 4 teams x 3 props, all compatible.
    fn rich_board() -> Vec<Leg> {
        let props = [PropType::Pts, PropType::Reb, PropType::Ast];
        let mut legs = Vec::new();
        for (pi, player) in ["A", "B", "C", "D"].iter().enumerate() {
            for (si, prop) in props.iter().enumerate() {
                let p = 0.55 + 0.01 * (pi * 3 + si) as f64;
                legs.push(make_leg(
                    player,
                    &format!("T{pi}"),
                    prop.clone(),
                    p,
                ));
            }
        }
        legs
    }

    fn make_builder(tiers: Vec<PoolTier>, target: usize) -> SlateBuilder {
        SlateBuilder::new(
            tiers,
            target,
            SlipSelector::new(SelectorConfig::default(), FlexPayout::default()),
        )
    }

    fn tier(floor: f64, cap: usize) -> PoolTier {
        PoolTier {
            probability_floor: floor,
            pool_cap: cap,
        }
    }

    // ---- tests -------------------------------------------------------------

    #[test]
    fn test_builds_target_slip_count() {
        let builder = make_builder(vec![tier(0.50, 120)], 2);
        let (slips, attempts) = builder.build_slate(&rich_board(), 10.0).unwrap();
        assert_eq!(slips.len(), 2);
        assert_eq!(attempts.len(), 1);
        assert!(matches!(
            attempts[0].outcome,
            TierOutcome::Succeeded { slips_built: 2 }
        ));
    }

    #[test]
    fn test_no_leg_key_reused_across_slips() {
        let builder = make_builder(vec![tier(0.50, 120)], 3);
        let (slips, _) = builder.build_slate(&rich_board(), 10.0).unwrap();
        let keys: Vec<String> = slips.iter().flat_map(|s| s.leg_keys()).collect();
        let distinct: HashSet<&String> = keys.iter().collect();
        assert_eq!(keys.len(), distinct.len());
    }

    #[test]
    fn test_intra_slip_uniqueness_holds() {
        let builder = make_builder(vec![tier(0.50, 120)], 2);
        let (slips, _) = builder.build_slate(&rich_board(), 10.0).unwrap();
        for slip in &slips {
            let players: HashSet<&String> = slip.legs.iter().map(|l| &l.player).collect();
            let teams: HashSet<&String> = slip.legs.iter().map(|l| &l.team).collect();
            let props: HashSet<&PropType> = slip.legs.iter().map(|l| &l.prop).collect();
            assert_eq!(players.len(), slip.legs.len());
            assert_eq!(teams.len(), slip.legs.len());
            assert_eq!(props.len(), slip.legs.len());
        }
    }

    #[test]
    fn test_slips_sorted_by_ev_with_fresh_ids() {
        let builder = make_builder(vec![tier(0.50, 120)], 3);
        let (slips, _) = builder.build_slate(&rich_board(), 10.0).unwrap();
        for (i, slip) in slips.iter().enumerate() {
            assert_eq!(slip.slip_id, (i + 1) as u32);
        }
        for pair in slips.windows(2) {
            assert!(pair[0].expected_value >= pair[1].expected_value);
        }
    }

    #[test]
    fn test_tight_tier_skipped_loose_tier_fills() {
        // the strict floor leaves too few keys; the loose tier succeeds
        let builder = make_builder(vec![tier(0.80, 120), tier(0.50, 120)], 2);
        let (slips, attempts) = builder.build_slate(&rich_board(), 10.0).unwrap();
        assert_eq!(slips.len(), 2);
        assert_eq!(attempts.len(), 2);
        assert!(matches!(
            attempts[0].outcome,
            TierOutcome::PrecheckFailed { .. }
        ));
        assert!(matches!(attempts[1].outcome, TierOutcome::Succeeded { .. }));
    }

    #[test]
    fn test_tiers_tried_in_order() {
        let builder = make_builder(vec![tier(0.90, 10), tier(0.80, 20), tier(0.50, 120)], 2);
        let (_, attempts) = builder.build_slate(&rich_board(), 10.0).unwrap();
        let floors: Vec<f64> = attempts.iter().map(|a| a.probability_floor).collect();
        assert_eq!(floors, vec![0.90, 0.80, 0.50]);
    }

    #[test]
    fn test_exhaustion_reports_every_tier() {
        let legs = vec![
            make_leg("A", "T1", PropType::Pts, 0.60),
            make_leg("B", "T2", PropType::Reb, 0.60),
        ];
        let builder = make_builder(vec![tier(0.56, 60), tier(0.52, 120)], 1);
        let err = builder.build_slate(&legs, 10.0).unwrap_err();
        match err {
            SlateError::InsufficientPool { attempts } => {
                assert_eq!(attempts.len(), 2);
                for a in &attempts {
                    assert!(matches!(a.outcome, TierOutcome::PrecheckFailed { .. }));
                }
            }
            other => panic!("expected InsufficientPool, got {other}"),
        }
    }

    #[test]
    fn test_precheck_pass_selection_stall_discards_partial() {
        // 6 distinct keys pass the precheck for 2x3, but every leg shares a
        // team, so not even one slip can be formed
        let legs: Vec<Leg> = (0..6)
            .map(|i| {
                make_leg(
                    &format!("P{i}"),
                    "SAME",
                    [PropType::Pts, PropType::Reb, PropType::Ast][i % 3].clone(),
                    0.60,
                )
            })
            .collect();
        let builder = make_builder(vec![tier(0.50, 120)], 2);
        let err = builder.build_slate(&legs, 10.0).unwrap_err();
        match err {
            SlateError::InsufficientPool { attempts } => {
                assert_eq!(attempts.len(), 1);
                assert!(matches!(
                    attempts[0].outcome,
                    TierOutcome::SelectionStalled { slips_built: 0 }
                ));
            }
            other => panic!("expected InsufficientPool, got {other}"),
        }
    }

    #[test]
    fn test_stall_after_first_slip_reports_progress() {
        // enough keys for the precheck (2x3=6), and one slip is buildable,
        // but the remainder collapses onto two teams
        let legs = vec![
            make_leg("A", "T1", PropType::Pts, 0.60),
            make_leg("B", "T2", PropType::Reb, 0.60),
            make_leg("C", "T3", PropType::Ast, 0.60),
            make_leg("D", "T4", PropType::Pts, 0.60),
            make_leg("E", "T4", PropType::Reb, 0.60),
            make_leg("F", "T4", PropType::Ast, 0.60),
        ];
        let builder = make_builder(vec![tier(0.50, 120)], 2);
        let err = builder.build_slate(&legs, 10.0).unwrap_err();
        match err {
            SlateError::InsufficientPool { attempts } => {
                assert!(matches!(
                    attempts[0].outcome,
                    TierOutcome::SelectionStalled { slips_built: 1 }
                ));
            }
            other => panic!("expected InsufficientPool, got {other}"),
        }
    }

    #[test]
    fn test_no_tiers_is_exhaustion() {
        let builder = make_builder(vec![], 2);
        let err = builder.build_slate(&rich_board(), 10.0).unwrap_err();
        assert!(matches!(err, SlateError::InsufficientPool { .. }));
    }

    #[test]
    fn test_stake_carried_onto_every_slip() {
        let builder = make_builder(vec![tier(0.50, 120)], 2);
        let (slips, _) = builder.build_slate(&rich_board(), 7.5).unwrap();
        assert!(slips.iter().all(|s| (s.stake - 7.5).abs() < 1e-10));
    }
}
