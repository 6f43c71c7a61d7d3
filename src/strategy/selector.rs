//! Slip selection.
//!
//! Picks the best slip from an available pool by enumerating leg
//! combinations inside a bounded rank-score window, filtering on the
//! uniqueness constraints, and scoring survivors by flex expected value.

use tracing::debug;

use super::payout::FlexPayout;
use crate::types::{Leg, Slip};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SelectorConfig {
    pub legs_per_slip: usize,
    /// Only the top `candidate_cap` legs by rank score are enumerated.
    /// Legs below the window are never considered for this slip.
    pub candidate_cap: usize,
    /// Hard cap on combinations evaluated; the sole worst-case bound.
    pub max_combinations: usize,
    /// Whether legs must carry pairwise-distinct prop types.
    pub distinct_props: bool,
    /// Flat score penalty when every leg shares one direction. 0 = off.
    pub same_direction_penalty: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            legs_per_slip: 3,
            candidate_cap: 45,
            max_combinations: 20_000,
            distinct_props: true,
            same_direction_penalty: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

pub struct SlipSelector {
    config: SelectorConfig,
    payout: FlexPayout,
}

impl SlipSelector {
    pub fn new(config: SelectorConfig, payout: FlexPayout) -> Self {
        Self { config, payout }
    }

    /// Access the selector configuration.
    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Pick the best slip from `available`, or None when no valid
    /// combination exists — a normal outcome the caller must handle.
    ///
    /// `available` must already be sorted by rank score descending; the
    /// window is its prefix. Enumeration is lexicographic over candidate
    /// indices, so for a fixed pool the result is deterministic up to the
    /// combination cap. Ties keep the first combination found.
    pub fn select(&self, available: &[Leg], stake: f64) -> Option<Slip> {
        let k = self.config.legs_per_slip;
        if k == 0 || available.len() < k {
            return None;
        }

        let window = &available[..available.len().min(self.config.candidate_cap)];
        let n = window.len();
        if n < k {
            return None;
        }

        let mut indices: Vec<usize> = (0..k).collect();
        let mut evaluated = 0usize;
        let mut best: Option<(Vec<usize>, f64, f64)> = None; // (indices, score, ev)

        loop {
            evaluated += 1;
            if evaluated > self.config.max_combinations {
                debug!(
                    cap = self.config.max_combinations,
                    "Combination cap reached"
                );
                break;
            }

            if self.satisfies_constraints(window, &indices) {
                let probs: Vec<f64> = indices.iter().map(|&i| window[i].probability).collect();
                let ev = self.payout.expected_value(&probs, stake);
                let mut score = ev;
                if self.config.same_direction_penalty > 0.0 && self.uniform_direction(window, &indices)
                {
                    score -= self.config.same_direction_penalty;
                }
                if best.as_ref().map_or(true, |(_, s, _)| score > *s) {
                    best = Some((indices.clone(), score, ev));
                }
            }

            if !next_combination(&mut indices, n, k) {
                break;
            }
        }

        let (chosen, _, ev) = best?;
        let legs: Vec<Leg> = chosen.iter().map(|&i| window[i].clone()).collect();
        debug!(
            evaluated,
            ev = format!("{ev:+.4}"),
            legs = legs.len(),
            "Slip selected"
        );
        Some(Slip {
            slip_id: 0,
            legs,
            stake,
            expected_value: ev,
        })
    }

    /// Players, teams, and (optionally) prop types must be pairwise distinct.
    fn satisfies_constraints(&self, window: &[Leg], indices: &[usize]) -> bool {
        for (a, &i) in indices.iter().enumerate() {
            for &j in &indices[a + 1..] {
                let x = &window[i];
                let y = &window[j];
                if x.player == y.player || x.team == y.team {
                    return false;
                }
                if self.config.distinct_props && x.prop == y.prop {
                    return false;
                }
            }
        }
        true
    }

    fn uniform_direction(&self, window: &[Leg], indices: &[usize]) -> bool {
        let first = window[indices[0]].direction;
        indices.iter().all(|&i| window[i].direction == first)
    }
}

/// Advance `indices` to the next k-combination of `0..n` in lexicographic
/// order. Returns false once exhausted.
fn next_combination(indices: &mut [usize], n: usize, k: usize) -> bool {
    let mut i = k;
    while i > 0 {
        i -= 1;
        if indices[i] < n - k + i {
            indices[i] += 1;
            for j in i + 1..k {
                indices[j] = indices[j - 1] + 1;
            }
            return true;
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
