//! Shared types for the SLIPFORGE engine.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that storage, engine,
//! and strategy modules can depend on them without circular references.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Pick direction relative to the book line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Over,
    Under,
}

impl Direction {
    /// The opposite direction.
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Over => Direction::Under,
            Direction::Under => Direction::Over,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Over => write!(f, "OVER"),
            Direction::Under => write!(f, "UNDER"),
        }
    }
}

/// Attempt to parse a string into a Direction (case-insensitive).
impl std::str::FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "OVER" | "O" => Ok(Direction::Over),
            "UNDER" | "U" => Ok(Direction::Under),
            _ => Err(anyhow::anyhow!("Unknown direction: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Prop type
// ---------------------------------------------------------------------------

/// Normalized statistic category for a prop.
///
/// Books publish the same stat under many labels ("Points", "PTS",
/// "Pts+Rebs+Asts"); everything funnels through `normalize` so that
/// equal stats compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropType {
    Pts,
    Reb,
    Ast,
    Stl,
    Blk,
    Tov,
    Pr,
    Pa,
    Ra,
    Pra,
    Fantasy,
    /// Anything we don't recognize, kept verbatim (upper-cased).
    Other(String),
}

impl PropType {
    /// Canonical short code.
    pub fn code(&self) -> &str {
        match self {
            PropType::Pts => "PTS",
            PropType::Reb => "REB",
            PropType::Ast => "AST",
            PropType::Stl => "STL",
            PropType::Blk => "BLK",
            PropType::Tov => "TO",
            PropType::Pr => "PR",
            PropType::Pa => "PA",
            PropType::Ra => "RA",
            PropType::Pra => "PRA",
            PropType::Fantasy => "FANTASY",
            PropType::Other(s) => s,
        }
    }

    /// Normalize a raw prop label into a canonical type.
    ///
    /// Combo props may arrive as "PTS+REB+AST" or long-form
    /// "Points+Rebounds+Assists"; the component set decides the combo code.
    pub fn normalize(raw: &str) -> Self {
        let cleaned = raw.trim().to_uppercase().replace(' ', "");
        match cleaned.as_str() {
            "POINTS" | "PTS" => return PropType::Pts,
            "REBOUNDS" | "REB" => return PropType::Reb,
            "ASSISTS" | "AST" => return PropType::Ast,
            "STEALS" | "STL" => return PropType::Stl,
            "BLOCKS" | "BLK" => return PropType::Blk,
            "TURNOVERS" | "TO" | "TOV" => return PropType::Tov,
            "PR" => return PropType::Pr,
            "PA" => return PropType::Pa,
            "RA" => return PropType::Ra,
            "PRA" => return PropType::Pra,
            "FANTASY" | "FANTASYPOINTS" => return PropType::Fantasy,
            _ => {}
        }

        if cleaned.contains('+') {
            let parts: std::collections::HashSet<String> = cleaned
                .split('+')
                .map(|p| {
                    p.replace("POINTS", "PTS")
                        .replace("REBOUNDS", "REB")
                        .replace("ASSISTS", "AST")
                })
                .collect();
            let has = |s: &str| parts.contains(s);
            if has("PTS") && has("REB") && has("AST") {
                return PropType::Pra;
            }
            if has("PTS") && has("REB") {
                return PropType::Pr;
            }
            if has("PTS") && has("AST") {
                return PropType::Pa;
            }
            if has("REB") && has("AST") {
                return PropType::Ra;
            }
        }

        PropType::Other(cleaned)
    }
}

impl fmt::Display for PropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ---------------------------------------------------------------------------
// Leg
// ---------------------------------------------------------------------------

/// One candidate proposition bet, fully normalized and scored.
///
/// Immutable after construction; the selector consumes legs but never
/// mutates them.
#[derive(Debug, Clone)]
pub struct Leg {
    pub player: String,
    pub team: String,
    pub prop: PropType,
    pub direction: Direction,
    /// Book threshold. Absent lines collapse into a shared sentinel key.
    pub line: Option<f64>,
    /// Signed model-vs-line gap, oriented so positive favors the pick.
    pub edge: f64,
    /// Estimated hit probability, clamped into the configured band.
    pub probability: f64,
    /// Ordering score only — never persisted as ground truth.
    pub rank_score: f64,
}

impl Leg {
    /// Uniqueness identity: `player|prop|direction|line`.
    ///
    /// Two lineless legs for the same player/prop/direction share a key.
    pub fn key(&self) -> String {
        let line = match self.line {
            Some(l) => format!("{l:.2}"),
            None => "NL".to_string(),
        };
        format!("{}|{}|{}|{}", self.player, self.prop, self.direction, line)
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = match self.line {
            Some(l) => format!("{l:.1}"),
            None => "—".to_string(),
        };
        write!(
            f,
            "{} {} {} {} (p={:.3}, edge={:+.2})",
            self.player, self.prop, self.direction, line, self.probability, self.edge,
        )
    }
}

// ---------------------------------------------------------------------------
// Slip
// ---------------------------------------------------------------------------

/// A fixed-size bundle of legs wagered together under a flex payout.
#[derive(Debug, Clone)]
pub struct Slip {
    /// 1-based id, reassigned in descending-EV order once a slate is final.
    pub slip_id: u32,
    pub legs: Vec<Leg>,
    pub stake: f64,
    pub expected_value: f64,
}

impl Slip {
    /// Leg keys in slip order.
    pub fn leg_keys(&self) -> Vec<String> {
        self.legs.iter().map(|l| l.key()).collect()
    }

    /// Diagnostic direction split, e.g. `2O/1U`.
    pub fn direction_mix(&self) -> String {
        let overs = self
            .legs
            .iter()
            .filter(|l| l.direction == Direction::Over)
            .count();
        format!("{}O/{}U", overs, self.legs.len() - overs)
    }

    /// Join a per-leg field with the output separator.
    pub fn joined<F>(&self, f: F) -> String
    where
        F: Fn(&Leg) -> String,
    {
        self.legs.iter().map(f).collect::<Vec<_>>().join(" | ")
    }
}

impl fmt::Display for Slip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} ${:.2} EV={:+.4} [{}] {}",
            self.slip_id,
            self.stake,
            self.expected_value,
            self.direction_mix(),
            self.joined(|l| format!("{} {} {}", l.player, l.prop, l.direction)),
        )
    }
}

// ---------------------------------------------------------------------------
// Settled outcomes
// ---------------------------------------------------------------------------

/// Terminal result of a previously offered leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeResult {
    Win,
    Loss,
    Push,
}

impl fmt::Display for OutcomeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeResult::Win => write!(f, "WIN"),
            OutcomeResult::Loss => write!(f, "LOSS"),
            OutcomeResult::Push => write!(f, "PUSH"),
        }
    }
}

impl std::str::FromStr for OutcomeResult {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "WIN" => Ok(OutcomeResult::Win),
            "LOSS" => Ok(OutcomeResult::Loss),
            "PUSH" => Ok(OutcomeResult::Push),
            _ => Err(anyhow::anyhow!("Unknown result: {s}")),
        }
    }
}

/// One settled leg, read-only input to the win-rate estimator.
#[derive(Debug, Clone)]
pub struct OutcomeRecord {
    pub prop: PropType,
    pub direction: Direction,
    pub edge: f64,
    pub result: OutcomeResult,
}

// ---------------------------------------------------------------------------
// Bankroll ledger
// ---------------------------------------------------------------------------

/// One day in the bankroll ledger. Written by the settlement process,
/// read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankrollDay {
    pub date: NaiveDate,
    pub bankroll_start: f64,
    pub bankroll_end: f64,
}

// ---------------------------------------------------------------------------
// Tier diagnostics
// ---------------------------------------------------------------------------

/// What happened when one relaxation tier was attempted.
#[derive(Debug, Clone, Serialize)]
pub struct TierAttempt {
    pub probability_floor: f64,
    pub pool_cap: usize,
    pub outcome: TierOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub enum TierOutcome {
    /// Too few distinct leg keys to even start selection.
    PrecheckFailed { distinct_keys: usize, required: usize },
    /// Selection started but ran dry before the target slip count.
    SelectionStalled { slips_built: usize },
    /// The tier produced a full slate.
    Succeeded { slips_built: usize },
}

impl fmt::Display for TierAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tier(floor={:.2}, cap={}): ",
            self.probability_floor, self.pool_cap
        )?;
        match &self.outcome {
            TierOutcome::PrecheckFailed {
                distinct_keys,
                required,
            } => write!(f, "precheck failed ({distinct_keys} keys, need {required})"),
            TierOutcome::SelectionStalled { slips_built } => {
                write!(f, "selection stalled after {slips_built} slip(s)")
            }
            TierOutcome::Succeeded { slips_built } => {
                write!(f, "built {slips_built} slip(s)")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// Per-slip summary persisted in the run report.
#[derive(Debug, Clone, Serialize)]
pub struct SlipSummary {
    pub slip_id: u32,
    pub expected_value: f64,
    pub direction_mix: String,
}

/// Persistent record of one build, success or failure, for post-hoc
/// diagnosis of why a slate did or did not fill.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub date: NaiveDate,
    pub bankroll_start: f64,
    pub daily_risk: f64,
    pub stake_per_slip: f64,
    pub target_slips: usize,
    pub board_rows: usize,
    pub rows_dropped: usize,
    pub duplicate_keys: usize,
    pub legs_normalized: usize,
    pub tiers: Vec<TierAttempt>,
    pub succeeded: bool,
    pub slips: Vec<SlipSummary>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for SLIPFORGE.
#[derive(Debug, thiserror::Error)]
pub enum SlateError {
    #[error("Schema error in {source_file}: {detail}")]
    Schema { source_file: String, detail: String },

    #[error("Insufficient candidate pool: all {} relaxation tier(s) exhausted", .attempts.len())]
    InsufficientPool { attempts: Vec<TierAttempt> },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
