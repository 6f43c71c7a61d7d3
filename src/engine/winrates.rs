//! Bucketed win-rate estimation.
//!
//! Pools sparse settled outcomes by (prop type, direction, edge bucket)
//! and derives an empirical hit rate per group. Pushes settle no money
//! and are excluded from both sides of the rate.

use std::collections::HashMap;
use std::fmt;

use tracing::info;

use crate::types::{Direction, OutcomeRecord, OutcomeResult, PropType};

/// Edges within this distance of zero land in the `=0` bucket.
const EPS: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Edge buckets
// ---------------------------------------------------------------------------

/// Discrete, ordered partition of the edge axis.
///
/// Boundaries are fixed: changing them invalidates every historical
/// grouping, so treat the set as frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeBucket {
    BelowNeg5,
    Neg5ToNeg3,
    Neg3ToNeg2,
    Neg2ToNeg1,
    Neg1ToNegQuarter,
    NegQuarterToZero,
    Zero,
    ZeroToQuarter,
    QuarterToOne,
    OneToTwo,
    TwoToThree,
    ThreeToFive,
    FivePlus,
    Unknown,
}

impl EdgeBucket {
    /// All buckets in ascending edge order (useful for iteration).
    pub const ALL: &'static [EdgeBucket] = &[
        EdgeBucket::BelowNeg5,
        EdgeBucket::Neg5ToNeg3,
        EdgeBucket::Neg3ToNeg2,
        EdgeBucket::Neg2ToNeg1,
        EdgeBucket::Neg1ToNegQuarter,
        EdgeBucket::NegQuarterToZero,
        EdgeBucket::Zero,
        EdgeBucket::ZeroToQuarter,
        EdgeBucket::QuarterToOne,
        EdgeBucket::OneToTwo,
        EdgeBucket::TwoToThree,
        EdgeBucket::ThreeToFive,
        EdgeBucket::FivePlus,
        EdgeBucket::Unknown,
    ];

    /// Map an edge magnitude to its bucket.
    pub fn from_edge(e: f64) -> Self {
        if !e.is_finite() {
            return EdgeBucket::Unknown;
        }
        if e.abs() <= EPS {
            return EdgeBucket::Zero;
        }
        if e < -5.0 {
            EdgeBucket::BelowNeg5
        } else if e < -3.0 {
            EdgeBucket::Neg5ToNeg3
        } else if e < -2.0 {
            EdgeBucket::Neg3ToNeg2
        } else if e < -1.0 {
            EdgeBucket::Neg2ToNeg1
        } else if e < -0.25 {
            EdgeBucket::Neg1ToNegQuarter
        } else if e < 0.0 {
            EdgeBucket::NegQuarterToZero
        } else if e <= 0.25 {
            EdgeBucket::ZeroToQuarter
        } else if e < 1.0 {
            EdgeBucket::QuarterToOne
        } else if e < 2.0 {
            EdgeBucket::OneToTwo
        } else if e < 3.0 {
            EdgeBucket::TwoToThree
        } else if e < 5.0 {
            EdgeBucket::ThreeToFive
        } else {
            EdgeBucket::FivePlus
        }
    }

    /// Human-readable bucket label.
    pub fn label(&self) -> &'static str {
        match self {
            EdgeBucket::BelowNeg5 => "<-5",
            EdgeBucket::Neg5ToNeg3 => "-5 to -3",
            EdgeBucket::Neg3ToNeg2 => "-3 to -2",
            EdgeBucket::Neg2ToNeg1 => "-2 to -1",
            EdgeBucket::Neg1ToNegQuarter => "-1 to -0.25",
            EdgeBucket::NegQuarterToZero => "-0.25 to 0",
            EdgeBucket::Zero => "=0",
            EdgeBucket::ZeroToQuarter => "0 to 0.25",
            EdgeBucket::QuarterToOne => "0.25 to 1",
            EdgeBucket::OneToTwo => "1 to 2",
            EdgeBucket::TwoToThree => "2 to 3",
            EdgeBucket::ThreeToFive => "3 to 5",
            EdgeBucket::FivePlus => "5+",
            EdgeBucket::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EdgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// Win-rate table
// ---------------------------------------------------------------------------

/// Decided-outcome counts for one group.
#[derive(Debug, Clone, Copy, Default)]
pub struct BucketStats {
    pub n: u32,
    pub wins: u32,
}

impl BucketStats {
    pub fn win_rate(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            f64::from(self.wins) / f64::from(self.n)
        }
    }
}

/// Empirical win rates keyed by (prop type, direction, edge bucket).
///
/// Rebuilt in full on every invocation; immutable for the duration of a
/// build.
#[derive(Debug, Clone)]
pub struct WinRateTable {
    groups: HashMap<(PropType, Direction, EdgeBucket), BucketStats>,
    min_samples: u32,
}

impl WinRateTable {
    /// Aggregate settled outcomes into a fresh table.
    pub fn build(records: &[OutcomeRecord], min_samples: u32) -> Self {
        let mut groups: HashMap<(PropType, Direction, EdgeBucket), BucketStats> = HashMap::new();

        for rec in records {
            let won = match rec.result {
                OutcomeResult::Win => true,
                OutcomeResult::Loss => false,
                OutcomeResult::Push => continue,
            };
            let key = (
                rec.prop.clone(),
                rec.direction,
                EdgeBucket::from_edge(rec.edge),
            );
            let stats = groups.entry(key).or_default();
            stats.n += 1;
            if won {
                stats.wins += 1;
            }
        }

        info!(
            records = records.len(),
            groups = groups.len(),
            min_samples,
            "Win-rate table built"
        );

        Self {
            groups,
            min_samples,
        }
    }

    /// An empty table (no history available).
    pub fn empty() -> Self {
        Self {
            groups: HashMap::new(),
            min_samples: 0,
        }
    }

    /// Empirical win rate for a group, or None when the group has fewer
    /// decided outcomes than the sample floor ("no data").
    pub fn lookup(&self, prop: &PropType, direction: Direction, bucket: EdgeBucket) -> Option<f64> {
        let stats = self.groups.get(&(prop.clone(), direction, bucket))?;
        if stats.n < self.min_samples {
            return None;
        }
        Some(stats.win_rate())
    }

    /// Number of populated groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
