//! End-to-end slate construction through the public API: board CSV in,
//! slip CSV out, with determinism and exhaustion coverage.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use slipforge::engine::bankroll::Allocation;
use slipforge::engine::normalizer::{Normalizer, NormalizerConfig};
use slipforge::engine::winrates::WinRateTable;
use slipforge::storage;
use slipforge::strategy::filter::PoolTier;
use slipforge::strategy::payout::FlexPayout;
use slipforge::strategy::selector::{SelectorConfig, SlipSelector};
use slipforge::strategy::SlateBuilder;
use slipforge::types::{SlateError, Slip};

fn temp_dir() -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("slipforge_e2e_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&p).unwrap();
    p
}

/// 12 legs across 4 players / 4 teams / 3 prop types, probabilities >= 0.55.
fn board_csv() -> String {
    let players = [("Ant", "MIN"), ("Luka", "DAL"), ("Tatum", "BOS"), ("Shai", "OKC")];
    let props = ["PTS", "REB", "AST"];
    let mut out = String::from("player,team,prop,direction,book_line,true_edge_for_pick,p_leg\n");
    for (pi, (player, team)) in players.iter().enumerate() {
        for (si, prop) in props.iter().enumerate() {
            let n = pi * 3 + si;
            let direction = if n % 2 == 0 { "OVER" } else { "UNDER" };
            let line = 10.5 + n as f64;
            let edge = 0.5 + 0.1 * n as f64;
            let p = 0.55 + 0.01 * n as f64;
            out.push_str(&format!(
                "{player},{team},{prop},{direction},{line},{edge:.2},{p:.2}\n"
            ));
        }
    }
    out
}

fn build_slate_from_csv(
    csv_path: &str,
    seed: u64,
    target_slips: usize,
) -> Result<(Vec<Slip>, Vec<slipforge::types::TierAttempt>), SlateError> {
    let board = storage::read_board(csv_path).unwrap();
    let mut normalizer = Normalizer::new(
        NormalizerConfig {
            jitter_strength: 0.02,
            ..NormalizerConfig::default()
        },
        WinRateTable::empty(),
        Some(seed),
    );
    let normalized = normalizer.normalize(&board)?;

    let tiers = vec![
        PoolTier {
            probability_floor: 0.56,
            pool_cap: 60,
        },
        PoolTier {
            probability_floor: 0.52,
            pool_cap: 120,
        },
    ];
    let builder = SlateBuilder::new(
        tiers,
        target_slips,
        SlipSelector::new(SelectorConfig::default(), FlexPayout::default()),
    );
    builder.build_slate(&normalized.legs, 10.0)
}

#[test]
fn full_board_fills_two_slips_with_unique_legs() {
    let dir = temp_dir();
    let board_path = dir.join("board.csv");
    fs::write(&board_path, board_csv()).unwrap();

    let (slips, _) = build_slate_from_csv(board_path.to_str().unwrap(), 42, 2).unwrap();

    assert_eq!(slips.len(), 2);

    // six distinct leg keys across the slate
    let keys: Vec<String> = slips.iter().flat_map(|s| s.leg_keys()).collect();
    assert_eq!(keys.len(), 6);
    assert_eq!(keys.iter().collect::<HashSet<_>>().len(), 6);

    // each slip internally unique on player, team, and prop
    for slip in &slips {
        assert_eq!(slip.legs.len(), 3);
        let players: HashSet<_> = slip.legs.iter().map(|l| &l.player).collect();
        let teams: HashSet<_> = slip.legs.iter().map(|l| &l.team).collect();
        let props: HashSet<_> = slip.legs.iter().map(|l| &l.prop).collect();
        assert_eq!(players.len(), 3);
        assert_eq!(teams.len(), 3);
        assert_eq!(props.len(), 3);
    }

    // expected value matches the flex formula over the chosen legs
    let payout = FlexPayout::default();
    for slip in &slips {
        let probs: Vec<f64> = slip.legs.iter().map(|l| l.probability).collect();
        let expected = payout.expected_value(&probs, slip.stake);
        assert!((slip.expected_value - expected).abs() < 1e-9);
    }

    // slate is ordered best-first with fresh ids
    assert!(slips[0].expected_value >= slips[1].expected_value);
    assert_eq!(slips[0].slip_id, 1);
    assert_eq!(slips[1].slip_id, 2);
}

#[test]
fn fixed_seed_produces_byte_identical_output() {
    let dir = temp_dir();
    let board_path = dir.join("board.csv");
    fs::write(&board_path, board_csv()).unwrap();
    let date: chrono::NaiveDate = "2026-01-15".parse().unwrap();
    let allocation = Allocation {
        bankroll_start: 200.0,
        daily_risk: 60.0,
        slip_count: 2,
        stake_per_slip: 10.0,
    };

    let mut outputs = Vec::new();
    for run in 0..2 {
        let (slips, _) = build_slate_from_csv(board_path.to_str().unwrap(), 42, 2).unwrap();
        let out_dir = dir.join(format!("run{run}"));
        let path =
            storage::write_slips(out_dir.to_str().unwrap(), date, &slips, &allocation).unwrap();
        outputs.push(fs::read(path).unwrap());
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn different_seeds_may_reorder_but_keep_invariants() {
    let dir = temp_dir();
    let board_path = dir.join("board.csv");
    fs::write(&board_path, board_csv()).unwrap();

    for seed in [1, 2, 3] {
        let (slips, _) = build_slate_from_csv(board_path.to_str().unwrap(), seed, 2).unwrap();
        let keys: Vec<String> = slips.iter().flat_map(|s| s.leg_keys()).collect();
        assert_eq!(keys.iter().collect::<HashSet<_>>().len(), keys.len());
    }
}

#[test]
fn short_board_exhausts_every_tier() {
    let dir = temp_dir();
    let board_path = dir.join("board.csv");
    // five legs can never fill two three-leg slips
    fs::write(
        &board_path,
        "player,team,prop,direction,book_line,true_edge_for_pick,p_leg\n\
         Ant,MIN,PTS,OVER,25.5,1.0,0.60\n\
         Luka,DAL,REB,UNDER,9.5,0.8,0.60\n\
         Tatum,BOS,AST,OVER,4.5,0.6,0.60\n\
         Shai,OKC,PTS,UNDER,31.5,0.4,0.60\n\
         Jokic,DEN,REB,OVER,12.5,0.2,0.60\n",
    )
    .unwrap();

    let err = build_slate_from_csv(board_path.to_str().unwrap(), 42, 2).unwrap_err();
    match err {
        SlateError::InsufficientPool { attempts } => {
            // both tiers attempted, both failed the precheck before selection
            assert_eq!(attempts.len(), 2);
            for attempt in &attempts {
                assert!(matches!(
                    attempt.outcome,
                    slipforge::types::TierOutcome::PrecheckFailed {
                        distinct_keys: 5,
                        required: 6
                    }
                ));
            }
        }
        other => panic!("expected InsufficientPool, got {other}"),
    }
}
