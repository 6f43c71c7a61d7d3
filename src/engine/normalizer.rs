//! Board normalization.
//!
//! Turns the raw candidate table into validated `Leg` records: cleans
//! identity fields, orients the edge toward the pick, attaches a hit
//! probability (estimator first, smooth heuristic when no history), and
//! derives the rank score used for ordering.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::engine::winrates::{EdgeBucket, WinRateTable};
use crate::storage::BoardTable;
use crate::types::{Direction, Leg, PropType, SlateError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Normalizer knobs, assembled from the board and estimator config sections.
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    pub prob_weight: f64,
    pub edge_weight: f64,
    /// Half-width of the uniform rank jitter; 0 draws nothing.
    pub jitter_strength: f64,
    pub estimated_prob_floor: f64,
    pub estimated_prob_ceiling: f64,
    pub heuristic_prob_floor: f64,
    pub heuristic_prob_ceiling: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            prob_weight: 1.0,
            edge_weight: 0.05,
            jitter_strength: 0.01,
            estimated_prob_floor: 0.35,
            estimated_prob_ceiling: 0.75,
            heuristic_prob_floor: 0.40,
            heuristic_prob_ceiling: 0.65,
        }
    }
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

/// Result of one normalization pass.
#[derive(Debug, Clone)]
pub struct NormalizedBoard {
    pub legs: Vec<Leg>,
    pub rows_in: usize,
    /// Rows discarded for unparseable numerics or blank identity fields.
    pub dropped_rows: usize,
    /// Rows discarded because an earlier row already claimed the leg key.
    pub duplicate_keys: usize,
}

pub struct Normalizer {
    config: NormalizerConfig,
    winrates: WinRateTable,
    rng: ChaCha8Rng,
}

impl Normalizer {
    /// Build a normalizer. A fixed seed makes the jitter, and therefore the
    /// whole build, reproducible.
    pub fn new(config: NormalizerConfig, winrates: WinRateTable, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            config,
            winrates,
            rng,
        }
    }

    /// Access the normalizer configuration.
    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize a raw board into scored legs.
    ///
    /// Individual bad rows are dropped and counted; a board with no way to
    /// obtain a directional edge is a schema failure.
    pub fn normalize(&mut self, table: &BoardTable) -> Result<NormalizedBoard, SlateError> {
        if !table.has_edge && !table.has_raw_edge && !table.has_model_and_line {
            return Err(SlateError::Schema {
                source_file: table.source.clone(),
                detail: "no true_edge_for_pick column, no raw edge column, and no model_prediction/book_line pair to derive one".to_string(),
            });
        }

        let mut legs: Vec<Leg> = Vec::with_capacity(table.rows.len());
        let mut seen_keys: HashSet<String> = HashSet::new();
        let mut dropped_rows = 0usize;
        let mut duplicate_keys = 0usize;

        for row in &table.rows {
            let player = row.player.trim();
            let team = row.team.trim().to_uppercase();
            if player.is_empty() || team.is_empty() {
                dropped_rows += 1;
                continue;
            }

            let prop = PropType::normalize(&row.prop);
            let direction: Direction = match row.direction.parse() {
                Ok(d) => d,
                Err(_) => {
                    dropped_rows += 1;
                    continue;
                }
            };

            let line = match parse_optional(&row.book_line) {
                Ok(l) => l,
                Err(()) => {
                    dropped_rows += 1;
                    continue;
                }
            };

            let edge = if table.has_edge {
                match parse_optional(&row.edge_for_pick) {
                    Ok(Some(e)) => e,
                    _ => {
                        dropped_rows += 1;
                        continue;
                    }
                }
            } else if table.has_raw_edge {
                // raw edge is model minus line; orient it toward the pick
                match parse_optional(&row.raw_edge) {
                    Ok(Some(e)) => match direction {
                        Direction::Over => e,
                        Direction::Under => -e,
                    },
                    _ => {
                        dropped_rows += 1;
                        continue;
                    }
                }
            } else {
                let model = match parse_optional(&row.model_prediction) {
                    Ok(Some(m)) => m,
                    _ => {
                        dropped_rows += 1;
                        continue;
                    }
                };
                let Some(line) = line else {
                    dropped_rows += 1;
                    continue;
                };
                match direction {
                    Direction::Under => line - model,
                    Direction::Over => model - line,
                }
            };

            let probability = match self.attach_probability(table, row, &prop, direction, edge) {
                Ok(p) => p,
                Err(()) => {
                    dropped_rows += 1;
                    continue;
                }
            };

            let jitter = if self.config.jitter_strength > 0.0 {
                let s = self.config.jitter_strength;
                self.rng.gen_range(-s..=s)
            } else {
                0.0
            };
            let rank_score =
                probability * self.config.prob_weight + edge * self.config.edge_weight + jitter;

            let leg = Leg {
                player: player.to_string(),
                team,
                prop,
                direction,
                line,
                edge,
                probability,
                rank_score,
            };

            if !seen_keys.insert(leg.key()) {
                duplicate_keys += 1;
                debug!(key = %leg.key(), "Duplicate leg key dropped");
                continue;
            }
            legs.push(leg);
        }

        if dropped_rows > 0 || duplicate_keys > 0 {
            warn!(
                dropped_rows,
                duplicate_keys,
                rows_in = table.rows.len(),
                "Board rows discarded during normalization"
            );
        }
        info!(
            rows_in = table.rows.len(),
            legs = legs.len(),
            winrate_groups = self.winrates.len(),
            "Board normalized"
        );

        Ok(NormalizedBoard {
            rows_in: table.rows.len(),
            legs,
            dropped_rows,
            duplicate_keys,
        })
    }

    /// Probability precedence: explicit column, estimator, smooth heuristic.
    fn attach_probability(
        &self,
        table: &BoardTable,
        row: &crate::storage::BoardRow,
        prop: &PropType,
        direction: Direction,
        edge: f64,
    ) -> Result<f64, ()> {
        if table.has_probability {
            match parse_optional(&row.probability) {
                Ok(Some(p)) => return Ok(p.clamp(0.0, 1.0)),
                Ok(None) => {} // blank cell: fall through to estimation
                Err(()) => return Err(()),
            }
        }

        let bucket = EdgeBucket::from_edge(edge);
        match self.winrates.lookup(prop, direction, bucket) {
            Some(rate) => Ok(rate.clamp(
                self.config.estimated_prob_floor,
                self.config.estimated_prob_ceiling,
            )),
            None => Ok(self.heuristic_probability(edge)),
        }
    }

    /// Saturating edge transform for legs with no historical signal.
    /// Symmetric around 0.5; the clamp band keeps an untrained signal from
    /// ever looking confident.
    fn heuristic_probability(&self, edge: f64) -> f64 {
        (0.5 + (edge / 2.0).tanh() * 0.08).clamp(
            self.config.heuristic_prob_floor,
            self.config.heuristic_prob_ceiling,
        )
    }
}

/// Parse an optional numeric cell. Blank cells are absent, not errors.
fn parse_optional(cell: &Option<String>) -> Result<Option<f64>, ()> {
    match cell {
        None => Ok(None),
        Some(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                trimmed.parse::<f64>().map(Some).map_err(|_| ())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
