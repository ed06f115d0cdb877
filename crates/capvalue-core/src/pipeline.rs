// End-to-end batch: aggregate → normalize contracts → merge → filter → score.

use crate::aggregate::aggregate_weekly;
use crate::config::Config;
use crate::contracts::normalize_contracts;
use crate::merge::{get_analysis_ready, merge_all, MergeInputs};
use crate::record::PlayerSeasonTable;
use crate::scoring::{score_players, ScoredTable, ScoringError};
use crate::sources::{load_sources, SourceError, Sources};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error("no player-seasons are analysis-ready (need a contract, enough snaps and a known position)")]
    EmptyPopulation,
}

/// Results of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Every merged player-season, before the analysis-ready filter.
    pub merged: PlayerSeasonTable,
    pub analysis_ready_rows: usize,
    pub scored: ScoredTable,
    pub weights_version: String,
}

/// Run the full transform over already-loaded sources.
///
/// Pure in its inputs: the same sources and config always give the same
/// output.
pub fn run_pipeline(sources: &Sources, config: &Config) -> Result<PipelineOutput, PipelineError> {
    let seasonal = aggregate_weekly(&sources.weekly);
    info!(
        "Aggregated {} weekly rows into {} player-seasons",
        sources.weekly.rows.len(),
        seasonal.len()
    );

    let contracts = normalize_contracts(&sources.contracts, &config.seasons, &config.contracts);
    info!(
        "Normalized {} contracts into {} contract-seasons ({}-{})",
        sources.contracts.len(),
        contracts.len(),
        config.seasons.first,
        config.seasons.last
    );

    let merged = merge_all(
        MergeInputs {
            seasonal: &seasonal,
            contracts: &contracts,
            snap_counts: sources.snap_counts.as_deref(),
            defense: sources.defense.as_ref(),
            players: &sources.players,
        },
        &config.merge,
    );
    info!("Merged table has {} player-seasons", merged.len());

    let ready = get_analysis_ready(&merged);
    if ready.is_empty() {
        return Err(PipelineError::EmptyPopulation);
    }

    let scored = score_players(&ready, &config.weights, &config.scoring)?;
    info!(
        "Scored {} player-seasons across {} position groups (weights {})",
        scored.len(),
        scored.scored_groups.len(),
        config.weights.version()
    );

    Ok(PipelineOutput {
        analysis_ready_rows: ready.len(),
        merged,
        scored,
        weights_version: config.weights.version().to_string(),
    })
}

/// Load the configured input files, then run the pipeline.
pub fn run_from_paths(config: &Config) -> Result<PipelineOutput, PipelineError> {
    let sources = load_sources(&config.data_paths)?;
    run_pipeline(&sources, config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
