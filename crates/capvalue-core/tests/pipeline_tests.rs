// Integration tests for the value pipeline.
//
// These drive the library end-to-end from the CSV fixtures: loading,
// aggregation, contract normalization, the cross-source merge, scoring and
// export.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use capvalue_core::config::{Config, DataPaths};
use capvalue_core::export;
use capvalue_core::pipeline::{run_from_paths, run_pipeline, PipelineError, PipelineOutput};
use capvalue_core::positions::PositionGroup;
use capvalue_core::record::{ContractType, PlayerSeason};
use capvalue_core::scoring::{top_bargains, top_overpaid, ScoredPlayerSeason};
use capvalue_core::sources::{load_sources, SourceError};

// ===========================================================================
// Test helpers
// ===========================================================================

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture(name: &str) -> String {
    fixtures().join(name).display().to_string()
}

fn fixture_paths() -> DataPaths {
    DataPaths {
        weekly: fixture("weekly_stats.csv"),
        contracts: fixture("contracts.csv"),
        players: fixture("players.csv"),
        snap_counts: Some(fixture("snap_counts.csv")),
        defense: Some(fixture("pfr_defense.csv")),
    }
}

fn fixture_config() -> Config {
    Config {
        data_paths: fixture_paths(),
        ..Config::default()
    }
}

fn run() -> PipelineOutput {
    run_from_paths(&fixture_config()).expect("pipeline should run on fixtures")
}

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

fn merged<'a>(out: &'a PipelineOutput, id: &str) -> &'a PlayerSeason {
    out.merged
        .rows
        .iter()
        .find(|r| r.player_id == id && r.season == 2023)
        .unwrap_or_else(|| panic!("{id} missing from merged table"))
}

fn scored<'a>(out: &'a PipelineOutput, id: &str) -> Option<&'a ScoredPlayerSeason> {
    out.scored.rows.iter().find(|r| r.record.player_id == id)
}

// ===========================================================================
// End-to-end
// ===========================================================================

#[test]
fn scores_receivers_and_defensive_linemen() {
    let out = run();
    assert_eq!(
        out.scored.scored_groups,
        vec![PositionGroup::WideReceiver, PositionGroup::DefensiveLine]
    );
    assert_eq!(out.analysis_ready_rows, 10);
    assert_eq!(out.scored.len(), 10);
    assert_eq!(out.weights_version, "2024.1");

    // Output follows group order: receivers first, then linemen.
    let groups: Vec<PositionGroup> = out.scored.rows.iter().map(|r| r.pos_group()).collect();
    assert!(groups[..5].iter().all(|g| *g == PositionGroup::WideReceiver));
    assert!(groups[5..].iter().all(|g| *g == PositionGroup::DefensiveLine));
}

#[test]
fn merged_keys_are_unique() {
    let out = run();
    // Seven receivers from weekly stats plus five linemen from the
    // defensive table; the unmatched defender is dropped.
    assert_eq!(out.merged.len(), 12);
    let keys: HashSet<(String, i32)> = out
        .merged
        .rows
        .iter()
        .map(|r| (r.player_id.clone(), r.season))
        .collect();
    assert_eq!(keys.len(), out.merged.len());
}

#[test]
fn weekly_aggregation_skips_preseason_and_text_columns() {
    let out = run();
    let solid = merged(&out, "00-0000004");
    assert_eq!(solid.stat("receiving_yards"), Some(135.0));
    assert_eq!(solid.games_played, 2);

    // Postseason weeks count.
    let middle = merged(&out, "00-0000003");
    assert_eq!(middle.stat("receiving_yards"), Some(170.0));
    assert_eq!(middle.games_played, 3);

    assert!(out.merged.has_column("receiving_epa"));
    assert!(!out.merged.has_column("headshot_url"));
    let steal = merged(&out, "00-0000002");
    assert!(approx_eq(steal.stat("catch_rate").unwrap(), 85.0, 1e-9));
    assert_eq!(steal.player_name.as_deref(), Some("Bo Steal"));
}

#[test]
fn extension_governs_overlapping_season() {
    let out = run();
    let pricey = merged(&out, "00-0000001").contract.as_ref().unwrap();
    assert_eq!(pricey.year_signed, 2022);
    assert!(approx_eq(pricey.apy_cap_pct, 0.08, 1e-12));
    assert_eq!(pricey.contract_type, ContractType::Veteran);

    let steal = merged(&out, "00-0000002").contract.as_ref().unwrap();
    assert_eq!(steal.contract_type, ContractType::Rookie);
    assert_eq!(steal.contract_end_year, 2024);
}

#[test]
fn filters_unpaid_and_low_snap_players() {
    let out = run();
    let nopay = merged(&out, "00-0000006");
    assert!(!nopay.has_salary);
    assert!(nopay.meets_snap_threshold);
    assert!(scored(&out, "00-0000006").is_none());

    let bench = merged(&out, "00-0000007");
    assert!(bench.has_salary);
    assert_eq!(bench.total_snaps(), Some(44.0));
    assert!(!bench.meets_snap_threshold);
    assert!(scored(&out, "00-0000007").is_none());

    // Exactly on the threshold counts.
    assert_eq!(merged(&out, "00-0000012").total_snaps(), Some(100.0));
    assert!(scored(&out, "00-0000012").is_some());
}

#[test]
fn defensive_rows_fill_from_reference_table() {
    let out = run();
    let rush = merged(&out, "00-0000011");
    assert_eq!(rush.pos_group, PositionGroup::DefensiveLine);
    // First of the duplicate defensive rows wins.
    assert_eq!(rush.stat("def_sacks"), Some(14.0));
    assert_eq!(rush.games_played, 17);
    assert_eq!(rush.recent_team.as_deref(), Some("DAL"));

    let nose = merged(&out, "00-0000014");
    assert_eq!(nose.player_name.as_deref(), Some("Ka Nose"));
    assert_eq!(nose.position.as_deref(), Some("DT"));
    assert_eq!(nose.stat("def_ints"), Some(1.0));
}

#[test]
fn cheap_producer_is_top_bargain_and_expensive_laggard_most_overpaid() {
    let out = run();
    let best = top_bargains(&out.scored, Some(PositionGroup::WideReceiver), 1);
    assert_eq!(best[0].record.player_id, "00-0000002");
    let worst = top_overpaid(&out.scored, Some(PositionGroup::WideReceiver), 1);
    assert_eq!(worst[0].record.player_id, "00-0000001");
    assert_eq!(best[0].value_percentile, Some(100.0));
    assert_eq!(worst[0].value_percentile, Some(20.0));
}

#[test]
fn score_identities_hold() {
    let out = run();
    for r in &out.scored.rows {
        let v = r.value_score.unwrap();
        assert!(approx_eq(
            v,
            r.performance_zscore.unwrap() - r.salary_zscore.unwrap(),
            1e-12
        ));
        assert_eq!(r.is_bargain, v > 2.0);
        assert_eq!(r.is_overpaid, v < -2.0);
        let p = r.value_percentile.unwrap();
        assert!(p > 0.0 && p <= 100.0);
    }
}

#[test]
fn reruns_are_identical() {
    let config = fixture_config();
    let sources = load_sources(&config.data_paths).unwrap();
    let first = run_pipeline(&sources, &config).unwrap();
    let second = run_pipeline(&sources, &config).unwrap();
    assert_eq!(first.merged, second.merged);
    assert_eq!(first.scored, second.scored);

    let sequential = Config {
        scoring: capvalue_core::config::ScoringConfig {
            parallel: false,
            ..config.scoring.clone()
        },
        ..config.clone()
    };
    assert_eq!(run_pipeline(&sources, &sequential).unwrap().scored, first.scored);
}

// ===========================================================================
// Failure modes and optional sources
// ===========================================================================

#[test]
fn missing_optional_snap_file_empties_population() {
    let mut config = fixture_config();
    config.data_paths.snap_counts = Some(fixture("no_such_snaps.csv"));
    let err = run_from_paths(&config).unwrap_err();
    assert!(matches!(err, PipelineError::EmptyPopulation), "got {err:?}");
}

#[test]
fn missing_defense_source_drops_linemen() {
    let mut config = fixture_config();
    config.data_paths.defense = None;
    let out = run_from_paths(&config).unwrap();
    assert_eq!(out.merged.len(), 7);
    assert_eq!(out.scored.scored_groups, vec![PositionGroup::WideReceiver]);
    assert!(!out.merged.has_column("def_sacks"));
}

#[test]
fn missing_required_file_is_io_error() {
    let mut config = fixture_config();
    config.data_paths.weekly = fixture("no_such_weekly.csv");
    let err = run_from_paths(&config).unwrap_err();
    assert!(
        matches!(err, PipelineError::Source(SourceError::Io { .. })),
        "got {err:?}"
    );
}

#[test]
fn raised_group_floor_scores_nothing() {
    let mut config = fixture_config();
    config.scoring.min_group_size = 6;
    let out = run_from_paths(&config).unwrap();
    assert!(out.scored.scored_groups.is_empty());
    assert_eq!(out.scored.len(), 10);
    assert!(out
        .scored
        .rows
        .iter()
        .all(|r| r.value_score.is_none() && !r.is_bargain && !r.is_overpaid));
}

// ===========================================================================
// Export
// ===========================================================================

#[test]
fn exports_scored_csv_and_summary() {
    let out = run();
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("value_scores.csv");
    export::write_scored_csv_file(&csv_path, &out.scored).unwrap();

    let mut rdr = csv::Reader::from_path(&csv_path).unwrap();
    let header = rdr.headers().unwrap().clone();
    assert!(header.iter().any(|h| h == "value_score"));
    assert!(header.iter().any(|h| h == "def_sacks"));
    assert_eq!(rdr.records().count(), 10);

    let summary = export::summarize(&out);
    assert_eq!(summary.scored_rows, 10);
    assert_eq!(summary.groups.len(), 2);
    let json_path = dir.path().join("summary.json");
    export::write_summary_json(&json_path, &summary).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(value["analysis_ready_rows"], 10);
}
