// Scored-table CSV export and JSON run summaries.

use crate::pipeline::PipelineOutput;
use crate::record::RECORD_COLUMNS;
use crate::scoring::{group_summary, GroupSummary, ScoredPlayerSeason, ScoredTable};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to write CSV {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("failed to write JSON {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

const IDENTITY_COLUMNS: &[&str] = &[
    "player_id",
    "player_name",
    "season",
    "position",
    "pos_group",
    "recent_team",
];

const SCORE_COLUMNS: &[&str] = &[
    "contract_type",
    "performance_zscore",
    "salary_zscore",
    "value_score",
    "value_percentile",
    "is_bargain",
    "is_overpaid",
];

fn num(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

fn text(v: Option<&str>) -> String {
    v.unwrap_or_default().to_string()
}

/// Stat columns written after the fixed ones, in sorted order.
fn extra_columns(table: &ScoredTable) -> Vec<&str> {
    table
        .stat_columns
        .iter()
        .map(String::as_str)
        .filter(|c| {
            !IDENTITY_COLUMNS.contains(c)
                && !RECORD_COLUMNS.contains(c)
                && !SCORE_COLUMNS.contains(c)
        })
        .collect()
}

fn record_fields(row: &ScoredPlayerSeason, extras: &[&str]) -> Vec<String> {
    let rec = &row.record;
    let mut fields = vec![
        rec.player_id.clone(),
        text(rec.player_name.as_deref()),
        rec.season.to_string(),
        text(rec.position.as_deref()),
        rec.pos_group.to_string(),
        text(rec.recent_team.as_deref()),
    ];
    fields.extend(RECORD_COLUMNS.iter().map(|c| num(rec.value_of(c))));
    fields.push(
        rec.contract
            .as_ref()
            .map(|c| c.contract_type.to_string())
            .unwrap_or_default(),
    );
    fields.extend([
        num(row.performance_zscore),
        num(row.salary_zscore),
        num(row.value_score),
        num(row.value_percentile),
        row.is_bargain.to_string(),
        row.is_overpaid.to_string(),
    ]);
    fields.extend(extras.iter().map(|c| num(rec.stat(c))));
    fields
}

/// Write one CSV row per scored record. Nulls become empty cells.
pub fn write_scored_csv<W: Write>(writer: W, table: &ScoredTable) -> Result<(), csv::Error> {
    let extras = extra_columns(table);
    let mut wtr = csv::Writer::from_writer(writer);

    let header: Vec<&str> = IDENTITY_COLUMNS
        .iter()
        .chain(RECORD_COLUMNS)
        .chain(SCORE_COLUMNS)
        .copied()
        .chain(extras.iter().copied())
        .collect();
    wtr.write_record(&header)?;

    for row in &table.rows {
        wtr.write_record(record_fields(row, &extras))?;
    }
    wtr.flush()?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), ExportError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|e| ExportError::Io {
                path: dir.display().to_string(),
                source: e,
            })
        }
        _ => Ok(()),
    }
}

pub fn write_scored_csv_file(path: &Path, table: &ScoredTable) -> Result<(), ExportError> {
    ensure_parent(path)?;
    let file = std::fs::File::create(path).map_err(|e| ExportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    write_scored_csv(file, table).map_err(|e| ExportError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub weights_version: String,
    pub merged_rows: usize,
    pub analysis_ready_rows: usize,
    pub scored_rows: usize,
    pub groups: Vec<GroupSummary>,
}

pub fn summarize(output: &PipelineOutput) -> RunSummary {
    RunSummary {
        weights_version: output.weights_version.clone(),
        merged_rows: output.merged.len(),
        analysis_ready_rows: output.analysis_ready_rows,
        scored_rows: output.scored.rows.iter().filter(|r| r.value_score.is_some()).count(),
        groups: group_summary(&output.scored),
    }
}

pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<(), ExportError> {
    ensure_parent(path)?;
    let file = std::fs::File::create(path).map_err(|e| ExportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::to_writer_pretty(file, summary).map_err(|e| ExportError::Json {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
