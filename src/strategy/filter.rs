//! Candidate pool filtering.
//!
//! Bounds the selector's search space: keep legs above the tier's
//! probability floor, rank them, cap the pool, and run the cheap
//! feasibility precheck before any enumeration is spent.

use std::collections::HashSet;
use tracing::debug;

use crate::types::Leg;

/// One relaxation tier: a probability floor and pool cap pair.
#[derive(Debug, Clone, Copy)]
pub struct PoolTier {
    pub probability_floor: f64,
    pub pool_cap: usize,
}

/// Filter the normalized board down to one tier's candidate pool, sorted by
/// rank score descending. Rank ties break on leg key so the ordering is
/// stable across runs.
pub fn filter_pool(legs: &[Leg], tier: &PoolTier) -> Vec<Leg> {
    let mut pool: Vec<Leg> = legs
        .iter()
        .filter(|l| l.probability >= tier.probability_floor)
        .cloned()
        .collect();

    pool.sort_by(|a, b| {
        b.rank_score
            .partial_cmp(&a.rank_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.key().cmp(&b.key()))
    });
    pool.truncate(tier.pool_cap);

    debug!(
        floor = tier.probability_floor,
        cap = tier.pool_cap,
        pool = pool.len(),
        "Pool filtered"
    );

    pool
}

/// Feasibility precheck: the pool must hold enough distinct leg keys to fill
/// every slip. O(n); must run before selection, which is not.
///
/// Returns the distinct-key count on success, `(have, required)` on failure.
pub fn precheck(
    pool: &[Leg],
    target_slips: usize,
    legs_per_slip: usize,
) -> Result<usize, (usize, usize)> {
    let required = target_slips * legs_per_slip;
    let distinct: HashSet<String> = pool.iter().map(|l| l.key()).collect();
    if distinct.len() >= required {
        Ok(distinct.len())
    } else {
        Err((distinct.len(), required))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
