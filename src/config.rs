//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section carries defaults, so a missing or partial file still
//! yields a runnable configuration; per-run overrides go through the file
//! rather than compile-time constants.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub bankroll: BankrollConfig,
    pub board: BoardConfig,
    pub estimator: EstimatorConfig,
    pub selection: SelectionConfig,
    pub paths: PathsConfig,
}

/// Bankroll sizing knobs.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BankrollConfig {
    /// Starting bankroll when no ledger exists yet.
    pub initial_bankroll: f64,
    /// Fraction of the day's bankroll put at risk.
    pub daily_risk_pct: f64,
    /// Stake floor per slip; sets how many slips the daily risk buys.
    pub min_slip_stake: f64,
}

impl Default for BankrollConfig {
    fn default() -> Self {
        Self {
            initial_bankroll: 200.0,
            daily_risk_pct: 0.30,
            min_slip_stake: 5.0,
        }
    }
}

/// Board normalization and ranking knobs.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BoardConfig {
    /// Weight of probability in the rank score.
    pub prob_weight: f64,
    /// Weight of directional edge in the rank score.
    pub edge_weight: f64,
    /// Half-width of the uniform rank jitter. 0 disables jitter entirely.
    pub jitter_strength: f64,
    /// Fixed jitter seed. None draws a fresh seed per run for slate variety.
    pub jitter_seed: Option<u64>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            prob_weight: 1.0,
            edge_weight: 0.05,
            jitter_strength: 0.01,
            jitter_seed: None,
        }
    }
}

/// Win-rate estimator knobs.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Decided outcomes required before a bucket's win rate is trusted.
    pub min_bucket_samples: u32,
    /// Clamp band for estimator-derived probabilities.
    pub estimated_prob_floor: f64,
    pub estimated_prob_ceiling: f64,
    /// Tighter clamp band for the edge heuristic used without history.
    pub heuristic_prob_floor: f64,
    pub heuristic_prob_ceiling: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            min_bucket_samples: 20,
            estimated_prob_floor: 0.35,
            estimated_prob_ceiling: 0.75,
            heuristic_prob_floor: 0.40,
            heuristic_prob_ceiling: 0.65,
        }
    }
}

/// One relaxation tier: a probability floor and pool cap pair.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct TierConfig {
    pub probability_floor: f64,
    pub pool_cap: usize,
}

/// Slip selection knobs.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SelectionConfig {
    pub legs_per_slip: usize,
    /// Rank-score window the selector enumerates within.
    pub candidate_cap: usize,
    /// Hard cap on combinations evaluated per slip.
    pub max_combinations: usize,
    /// Whether a slip may carry two legs of the same prop type.
    pub distinct_props: bool,
    /// Flat score penalty when every leg shares one direction. 0 = off.
    pub same_direction_penalty: f64,
    /// Payout multiplier when all legs hit.
    pub payout_full_hit: f64,
    /// Payout multiplier when exactly one leg misses.
    pub payout_one_miss: f64,
    /// Relaxation tiers, strictest first.
    pub tiers: Vec<TierConfig>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            legs_per_slip: 3,
            candidate_cap: 45,
            max_combinations: 20_000,
            distinct_props: true,
            same_direction_penalty: 0.0,
            payout_full_hit: 3.0,
            payout_one_miss: 1.0,
            tiers: vec![
                TierConfig {
                    probability_floor: 0.56,
                    pool_cap: 60,
                },
                TierConfig {
                    probability_floor: 0.54,
                    pool_cap: 90,
                },
                TierConfig {
                    probability_floor: 0.52,
                    pool_cap: 120,
                },
            ],
        }
    }
}

/// Input/output file locations.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    pub board: String,
    pub settled_dir: String,
    pub ledger: String,
    pub slips_dir: String,
    pub bet_log: String,
    pub reports_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            board: "data/processed/calibrated_board.csv".to_string(),
            settled_dir: "data/history/settled".to_string(),
            ledger: "data/bankroll_builder/daily_performance.csv".to_string(),
            slips_dir: "data/bankroll_builder/daily_slips".to_string(),
            bet_log: "data/bankroll/bet_log.csv".to_string(),
            reports_dir: "data/bankroll_builder/run_reports".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is absent.
    /// A present-but-malformed file is still an error.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
