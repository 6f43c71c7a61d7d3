//! Bankroll allocation.
//!
//! Resolves the day's starting bankroll from the ledger, sizes the total
//! amount at risk, and splits it into equal per-slip stakes. The ledger is
//! written by the settlement process; this engine only reads it.

use chrono::NaiveDate;
use std::fmt;
use tracing::info;

use crate::types::BankrollDay;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AllocatorConfig {
    /// Bankroll assumed when no ledger exists.
    pub initial_bankroll: f64,
    /// Fraction of the starting bankroll risked per day.
    pub daily_risk_pct: f64,
    /// Stake floor; the daily risk buys `floor(risk / min_slip_stake)` slips.
    pub min_slip_stake: f64,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            initial_bankroll: 200.0,
            daily_risk_pct: 0.30,
            min_slip_stake: 5.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

/// The day's stake plan. Equal sizing across slips; confidence does not
/// change stakes.
#[derive(Debug, Clone)]
pub struct Allocation {
    pub bankroll_start: f64,
    pub daily_risk: f64,
    pub slip_count: usize,
    pub stake_per_slip: f64,
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bankroll=${:.2} risk=${:.2} slips={} stake=${:.2}",
            self.bankroll_start, self.daily_risk, self.slip_count, self.stake_per_slip,
        )
    }
}

/// Compute the day's allocation.
///
/// Bankroll resolution order: the ledger row for `date` (so a re-run of an
/// already-settled day is idempotent), else the last recorded `bankroll_end`,
/// else the configured initial bankroll. The slip count is clamped to at
/// least one so a collapsed bankroll still sizes a single slip.
pub fn allocate(date: NaiveDate, ledger: &[BankrollDay], config: &AllocatorConfig) -> Allocation {
    let bankroll_start = ledger
        .iter()
        .find(|d| d.date == date)
        .map(|d| d.bankroll_start)
        .or_else(|| ledger.last().map(|d| d.bankroll_end))
        .unwrap_or(config.initial_bankroll);

    let daily_risk = bankroll_start * config.daily_risk_pct;
    let slip_count = ((daily_risk / config.min_slip_stake).floor() as usize).max(1);
    let stake_per_slip = daily_risk / slip_count as f64;

    let allocation = Allocation {
        bankroll_start,
        daily_risk,
        slip_count,
        stake_per_slip,
    };

    info!(
        date = %date,
        bankroll_start = format!("${:.2}", bankroll_start),
        daily_risk = format!("${:.2}", daily_risk),
        slip_count,
        stake_per_slip = format!("${:.2}", stake_per_slip),
        "Bankroll allocated"
    );

    allocation
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
