//! Persistence layer.
//!
//! Flat-file I/O for everything the engine touches: the candidate board,
//! the settled-outcome history, the bankroll ledger, the slip output, the
//! cumulative bet log, and the JSON run report. All reads are simple
//! blocking reads; the engine assumes exclusive access for one run.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::engine::bankroll::Allocation;
use crate::types::{BankrollDay, OutcomeRecord, RunReport, SlateError, Slip};

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// One raw board row, untyped. Numeric parsing happens in the normalizer so
/// that bad cells become counted row drops rather than read failures.
#[derive(Debug, Clone)]
pub struct BoardRow {
    pub player: String,
    pub team: String,
    pub prop: String,
    pub direction: String,
    pub book_line: Option<String>,
    pub model_prediction: Option<String>,
    pub probability: Option<String>,
    pub edge_for_pick: Option<String>,
    pub raw_edge: Option<String>,
}

/// The raw board plus which optional columns it actually carries.
#[derive(Debug, Clone)]
pub struct BoardTable {
    pub source: String,
    pub rows: Vec<BoardRow>,
    pub has_probability: bool,
    pub has_edge: bool,
    pub has_raw_edge: bool,
    pub has_model_and_line: bool,
    /// Rows the CSV reader could not decode at all.
    pub unreadable_rows: usize,
}

/// Lower-cased header name → column index.
fn header_index(headers: &csv::StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_lowercase(), i))
        .collect()
}

fn cell(record: &csv::StringRecord, idx: usize) -> String {
    record.get(idx).unwrap_or("").to_string()
}

fn opt_cell(record: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    idx.map(|i| cell(record, i))
}

/// Read the candidate board.
///
/// Identity columns are required; probability/edge columns are reported as
/// presence flags and judged by the normalizer, which owns the rule for
/// what combination of them is sufficient.
pub fn read_board(path: &str) -> Result<BoardTable> {
    let mut rdr =
        csv::Reader::from_path(path).with_context(|| format!("Failed to open board: {path}"))?;
    let headers = rdr
        .headers()
        .with_context(|| format!("Failed to read board headers: {path}"))?
        .clone();
    let idx = header_index(&headers);
    let col = |names: &[&str]| names.iter().find_map(|n| idx.get(*n).copied());

    for required in ["player", "team", "prop", "direction"] {
        if !idx.contains_key(required) {
            return Err(SlateError::Schema {
                source_file: path.to_string(),
                detail: format!("missing column: {required}"),
            }
            .into());
        }
    }

    let player_col = idx["player"];
    let team_col = idx["team"];
    let prop_col = idx["prop"];
    let direction_col = idx["direction"];
    let probability_col = col(&["probability", "p_leg"]);
    let edge_col = col(&["true_edge_for_pick"]);
    let raw_edge_col = col(&["true_edge", "edge"]);
    let model_col = col(&["model_prediction"]);
    let line_col = col(&["book_line"]);

    let mut rows = Vec::new();
    let mut unreadable_rows = 0usize;
    for record in rdr.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "Unreadable board row skipped");
                unreadable_rows += 1;
                continue;
            }
        };
        rows.push(BoardRow {
            player: cell(&record, player_col),
            team: cell(&record, team_col),
            prop: cell(&record, prop_col),
            direction: cell(&record, direction_col),
            book_line: opt_cell(&record, line_col),
            model_prediction: opt_cell(&record, model_col),
            probability: opt_cell(&record, probability_col),
            edge_for_pick: opt_cell(&record, edge_col),
            raw_edge: opt_cell(&record, raw_edge_col),
        });
    }

    if unreadable_rows > 0 {
        warn!(unreadable_rows, path, "Board rows could not be decoded");
    }
    info!(path, rows = rows.len(), "Board loaded");

    Ok(BoardTable {
        source: path.to_string(),
        rows,
        has_probability: probability_col.is_some(),
        has_edge: edge_col.is_some(),
        has_raw_edge: raw_edge_col.is_some(),
        has_model_and_line: model_col.is_some() && line_col.is_some(),
        unreadable_rows,
    })
}

// ---------------------------------------------------------------------------
// Settled history
// ---------------------------------------------------------------------------

/// Read every `settled_*.csv` under `dir` into outcome records.
///
/// A missing directory simply means no history. A settled file missing its
/// required columns is a schema failure; individual bad rows are dropped.
pub fn read_settled_history(dir: &str) -> Result<Vec<OutcomeRecord>> {
    let dir_path = Path::new(dir);
    if !dir_path.exists() {
        info!(dir, "No settled history directory, estimator will be empty");
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read settled directory: {dir}"))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("settled_") && n.ends_with(".csv"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();

    let mut records = Vec::new();
    let mut dropped = 0usize;

    for file in &files {
        let name = file.display().to_string();
        let mut rdr = csv::Reader::from_path(file)
            .with_context(|| format!("Failed to open settled file: {name}"))?;
        let headers = rdr
            .headers()
            .with_context(|| format!("Failed to read settled headers: {name}"))?
            .clone();
        let idx = header_index(&headers);

        for required in ["prop", "direction", "result"] {
            if !idx.contains_key(required) {
                return Err(SlateError::Schema {
                    source_file: name.clone(),
                    detail: format!("missing column: {required}"),
                }
                .into());
            }
        }
        let edge_col = ["true_edge_for_pick", "true_edge", "edge"]
            .iter()
            .find_map(|n| idx.get(*n).copied())
            .ok_or_else(|| SlateError::Schema {
                source_file: name.clone(),
                detail: "missing edge column (true_edge_for_pick / true_edge / edge)".to_string(),
            })?;

        for record in rdr.records() {
            let Ok(record) = record else {
                dropped += 1;
                continue;
            };
            let direction = match cell(&record, idx["direction"]).parse() {
                Ok(d) => d,
                Err(_) => {
                    dropped += 1;
                    continue;
                }
            };
            let result = match cell(&record, idx["result"]).parse() {
                Ok(r) => r,
                Err(_) => {
                    dropped += 1;
                    continue;
                }
            };
            let Ok(edge) = cell(&record, edge_col).trim().parse::<f64>() else {
                dropped += 1;
                continue;
            };
            records.push(OutcomeRecord {
                prop: crate::types::PropType::normalize(&cell(&record, idx["prop"])),
                direction,
                edge,
                result,
            });
        }
    }

    info!(
        dir,
        files = files.len(),
        records = records.len(),
        dropped,
        "Settled history loaded"
    );
    Ok(records)
}

// ---------------------------------------------------------------------------
// Bankroll ledger
// ---------------------------------------------------------------------------

/// Read the bankroll ledger. A missing file means a fresh bankroll.
pub fn read_ledger(path: &str) -> Result<Vec<BankrollDay>> {
    if !Path::new(path).exists() {
        info!(path, "No bankroll ledger, starting from the configured bankroll");
        return Ok(Vec::new());
    }

    let mut rdr =
        csv::Reader::from_path(path).with_context(|| format!("Failed to open ledger: {path}"))?;
    let headers = rdr
        .headers()
        .with_context(|| format!("Failed to read ledger headers: {path}"))?
        .clone();
    let idx = header_index(&headers);
    for required in ["date", "bankroll_start", "bankroll_end"] {
        if !idx.contains_key(required) {
            return Err(SlateError::Schema {
                source_file: path.to_string(),
                detail: format!("missing column: {required}"),
            }
            .into());
        }
    }

    let mut days = Vec::new();
    let mut dropped = 0usize;
    for row in rdr.deserialize::<BankrollDay>() {
        match row {
            Ok(day) => days.push(day),
            Err(e) => {
                debug!(error = %e, "Unreadable ledger row skipped");
                dropped += 1;
            }
        }
    }
    if dropped > 0 {
        warn!(dropped, path, "Ledger rows could not be decoded");
    }
    info!(path, days = days.len(), "Bankroll ledger loaded");
    Ok(days)
}

// ---------------------------------------------------------------------------
// Slip output
// ---------------------------------------------------------------------------

fn line_label(line: Option<f64>) -> String {
    match line {
        Some(l) => format!("{l:.2}"),
        None => "NL".to_string(),
    }
}

/// Write the per-date slip file. One row per slip; every leg remains
/// re-identifiable by key from the joined columns.
pub fn write_slips(
    dir: &str,
    date: chrono::NaiveDate,
    slips: &[Slip],
    allocation: &Allocation,
) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create slips dir: {dir}"))?;
    let path = Path::new(dir).join(format!("builder_slips_{date}.csv"));

    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create slips file: {}", path.display()))?;
    writer.write_record([
        "date",
        "slip_id",
        "bankroll_start",
        "daily_risk",
        "slip_size",
        "legs",
        "players",
        "teams",
        "props",
        "directions",
        "lines",
        "p_legs",
        "expected_value",
    ])?;

    for slip in slips {
        writer.write_record(&[
            date.to_string(),
            slip.slip_id.to_string(),
            format!("{:.2}", allocation.bankroll_start),
            format!("{:.2}", allocation.daily_risk),
            format!("{:.2}", slip.stake),
            slip.legs.len().to_string(),
            slip.joined(|l| l.player.clone()),
            slip.joined(|l| l.team.clone()),
            slip.joined(|l| l.prop.to_string()),
            slip.joined(|l| l.direction.to_string()),
            slip.joined(|l| line_label(l.line)),
            slip.joined(|l| format!("{:.4}", l.probability)),
            format!("{:.4}", slip.expected_value),
        ])?;
    }
    writer.flush()?;

    info!(path = %path.display(), slips = slips.len(), "Slips written");
    Ok(path)
}

/// Append one pending row per slip to the cumulative bet log, creating the
/// file (with headers) on first use. Settlement fills in result and pnl.
pub fn append_bet_log(path: &str, date: chrono::NaiveDate, slips: &[Slip]) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create bet log dir: {}", parent.display()))?;
    }

    let fresh = !Path::new(path).exists();
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open bet log: {path}"))?;
    let mut writer = csv::Writer::from_writer(file);

    if fresh {
        writer.write_record([
            "date",
            "slip_id",
            "players",
            "props",
            "directions",
            "stake",
            "expected_value",
            "result",
            "pnl",
        ])?;
    }
    for slip in slips {
        writer.write_record(&[
            date.to_string(),
            slip.slip_id.to_string(),
            slip.joined(|l| l.player.clone()),
            slip.joined(|l| l.prop.to_string()),
            slip.joined(|l| l.direction.to_string()),
            format!("{:.2}", slip.stake),
            format!("{:.4}", slip.expected_value),
            "PENDING".to_string(),
            "0.0".to_string(),
        ])?;
    }
    writer.flush()?;

    debug!(path, slips = slips.len(), "Bet log appended");
    Ok(())
}

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// Persist the JSON run report for this date, success or failure.
pub fn save_run_report(dir: &str, report: &RunReport) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create reports dir: {dir}"))?;
    let path = Path::new(dir).join(format!("run_report_{}.json", report.date));
    let json =
        serde_json::to_string_pretty(report).context("Failed to serialise run report")?;
    fs::write(&path, &json)
        .with_context(|| format!("Failed to write run report: {}", path.display()))?;
    debug!(path = %path.display(), succeeded = report.succeeded, "Run report saved");
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
