//! SLIPFORGE — Flex-Payout Prop Slip Construction Engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! resolves the day's bankroll, and runs the board → estimate → select
//! pipeline once for the requested date. A day either gets a full slate
//! or a named failure — there is no partial-output mode.

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::{error, info, warn};

use slipforge::config::AppConfig;
use slipforge::engine::bankroll::{self, AllocatorConfig};
use slipforge::engine::normalizer::{Normalizer, NormalizerConfig};
use slipforge::engine::winrates::WinRateTable;
use slipforge::storage;
use slipforge::strategy::filter::PoolTier;
use slipforge::strategy::payout::FlexPayout;
use slipforge::strategy::selector::{SelectorConfig, SlipSelector};
use slipforge::strategy::SlateBuilder;
use slipforge::types::{RunReport, SlateError, SlipSummary};

const BANNER: &str = r#"
 ------------------------------------------
   S L I P F O R G E
   Flex-Payout Prop Slip Construction
   v0.1.0 — Daily Batch
 ------------------------------------------
"#;

/// Build the day's slate of flex prop slips.
#[derive(Parser)]
#[command(name = "slipforge", about = "Flex-payout prop slip construction engine", long_about = None)]
struct Cli {
    /// Slate date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Config file path.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = AppConfig::load_or_default(&cli.config)?;

    init_logging();
    println!("{BANNER}");

    let date = cli.date.unwrap_or_else(|| Local::now().date_naive());
    info!(date = %date, config = %cli.config, "SLIPFORGE starting");

    // -- Bankroll --------------------------------------------------------

    let ledger = storage::read_ledger(&cfg.paths.ledger)?;
    let allocation = bankroll::allocate(
        date,
        &ledger,
        &AllocatorConfig {
            initial_bankroll: cfg.bankroll.initial_bankroll,
            daily_risk_pct: cfg.bankroll.daily_risk_pct,
            min_slip_stake: cfg.bankroll.min_slip_stake,
        },
    );

    // -- Probability inputs ----------------------------------------------

    let history = storage::read_settled_history(&cfg.paths.settled_dir)?;
    let winrates = WinRateTable::build(&history, cfg.estimator.min_bucket_samples);

    let board = storage::read_board(&cfg.paths.board)?;
    let mut normalizer = Normalizer::new(
        NormalizerConfig {
            prob_weight: cfg.board.prob_weight,
            edge_weight: cfg.board.edge_weight,
            jitter_strength: cfg.board.jitter_strength,
            estimated_prob_floor: cfg.estimator.estimated_prob_floor,
            estimated_prob_ceiling: cfg.estimator.estimated_prob_ceiling,
            heuristic_prob_floor: cfg.estimator.heuristic_prob_floor,
            heuristic_prob_ceiling: cfg.estimator.heuristic_prob_ceiling,
        },
        winrates,
        cfg.board.jitter_seed,
    );
    let normalized = normalizer.normalize(&board)?;

    // -- Slate construction ----------------------------------------------

    let tiers: Vec<PoolTier> = cfg
        .selection
        .tiers
        .iter()
        .map(|t| PoolTier {
            probability_floor: t.probability_floor,
            pool_cap: t.pool_cap,
        })
        .collect();
    let selector = SlipSelector::new(
        SelectorConfig {
            legs_per_slip: cfg.selection.legs_per_slip,
            candidate_cap: cfg.selection.candidate_cap,
            max_combinations: cfg.selection.max_combinations,
            distinct_props: cfg.selection.distinct_props,
            same_direction_penalty: cfg.selection.same_direction_penalty,
        },
        FlexPayout {
            full_hit_mult: cfg.selection.payout_full_hit,
            one_miss_mult: cfg.selection.payout_one_miss,
        },
    );
    let builder = SlateBuilder::new(tiers, allocation.slip_count, selector);

    let mut report = RunReport {
        date,
        bankroll_start: allocation.bankroll_start,
        daily_risk: allocation.daily_risk,
        stake_per_slip: allocation.stake_per_slip,
        target_slips: allocation.slip_count,
        board_rows: board.rows.len(),
        rows_dropped: normalized.dropped_rows + board.unreadable_rows,
        duplicate_keys: normalized.duplicate_keys,
        legs_normalized: normalized.legs.len(),
        tiers: Vec::new(),
        succeeded: false,
        slips: Vec::new(),
    };

    match builder.build_slate(&normalized.legs, allocation.stake_per_slip) {
        Ok((slips, attempts)) => {
            report.tiers = attempts;
            report.succeeded = true;
            report.slips = slips
                .iter()
                .map(|s| SlipSummary {
                    slip_id: s.slip_id,
                    expected_value: s.expected_value,
                    direction_mix: s.direction_mix(),
                })
                .collect();

            let out_path = storage::write_slips(&cfg.paths.slips_dir, date, &slips, &allocation)?;
            storage::append_bet_log(&cfg.paths.bet_log, date, &slips)?;
            storage::save_run_report(&cfg.paths.reports_dir, &report)?;

            for slip in &slips {
                info!(slip = %slip, "Slip");
            }
            info!(
                slips = slips.len(),
                total_ev = format!(
                    "{:+.4}",
                    slips.iter().map(|s| s.expected_value).sum::<f64>()
                ),
                output = %out_path.display(),
                "Slate complete"
            );
            Ok(())
        }
        Err(SlateError::InsufficientPool { attempts }) => {
            for attempt in &attempts {
                warn!(attempt = %attempt, "Relaxation tier failed");
            }
            report.tiers = attempts.clone();
            storage::save_run_report(&cfg.paths.reports_dir, &report)?;
            error!(
                date = %date,
                legs = normalized.legs.len(),
                target = allocation.slip_count,
                "No feasible slate under any relaxation tier"
            );
            Err(SlateError::InsufficientPool { attempts }.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("slipforge=info"));

    let json_logging = std::env::var("SLIPFORGE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
