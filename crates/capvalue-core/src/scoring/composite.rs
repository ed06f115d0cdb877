// Composite value scoring.
//
// Within each position group, performance is a weighted blend of stat
// z-scores and salary is the z-score of cap share. The value score is
// their difference: positive means the player outperformed the contract.

use crate::config::ScoringConfig;
use crate::positions::PositionGroup;
use crate::record::{PlayerSeason, PlayerSeasonTable};
use crate::scoring::weights::{GroupWeights, WeightError, WeightTable};
use crate::scoring::zscore::{percentile_rank, zscore_within_group};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Stats derived by negating a lower-is-better source.
pub const INVERTED_COLUMNS: &[&str] = &["int_rate_inv", "fumbles_inv"];

const FUMBLE_COLUMNS: &[&str] = &["rushing_fumbles", "receiving_fumbles"];

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("invalid weight table: {0}")]
    InvalidWeights(#[from] WeightError),
}

/// A player-season with its scores. Score fields are null when the
/// player's group was not scored or the inputs were missing.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPlayerSeason {
    pub record: PlayerSeason,
    pub performance_zscore: Option<f64>,
    pub salary_zscore: Option<f64>,
    pub value_score: Option<f64>,
    pub value_percentile: Option<f64>,
    pub is_bargain: bool,
    pub is_overpaid: bool,
}

impl ScoredPlayerSeason {
    fn unscored(record: PlayerSeason) -> Self {
        ScoredPlayerSeason {
            record,
            performance_zscore: None,
            salary_zscore: None,
            value_score: None,
            value_percentile: None,
            is_bargain: false,
            is_overpaid: false,
        }
    }

    pub fn pos_group(&self) -> PositionGroup {
        self.record.pos_group
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoredTable {
    pub stat_columns: BTreeSet<String>,
    pub rows: Vec<ScoredPlayerSeason>,
    /// Groups that met the size floor and had a weight table, in output order.
    pub scored_groups: Vec<PositionGroup>,
}

impl ScoredTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Inverted stats
// ---------------------------------------------------------------------------

/// Add `int_rate_inv` and `fumbles_inv` so that higher is better for every
/// weighted stat.
///
/// `int_rate_inv` is emitted when the table has `int_rate`; a null rate stays
/// null. `fumbles_inv` is emitted when either fumble column exists, with
/// missing values counted as zero.
pub fn prepare_inverted_stats(table: &mut PlayerSeasonTable) {
    let has_int_rate = table.has_column("int_rate");
    let fumble_cols: Vec<&str> = FUMBLE_COLUMNS
        .iter()
        .copied()
        .filter(|c| table.has_column(c))
        .collect();

    for rec in &mut table.rows {
        if has_int_rate {
            if let Some(rate) = rec.stat("int_rate") {
                rec.stats.insert("int_rate_inv".to_string(), -rate);
            }
        }
        if !fumble_cols.is_empty() {
            let fumbles: f64 = fumble_cols.iter().filter_map(|c| rec.stat(c)).sum();
            rec.stats.insert("fumbles_inv".to_string(), 0.0 - fumbles);
        }
    }

    if has_int_rate {
        table.stat_columns.insert("int_rate_inv".to_string());
    }
    if !fumble_cols.is_empty() {
        table.stat_columns.insert("fumbles_inv".to_string());
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

struct GroupJob<'a> {
    group: PositionGroup,
    weights: &'a GroupWeights,
    members: Vec<&'a PlayerSeason>,
}

/// Weighted mean of the stat z-scores over the weighted columns present in
/// the table. A member with a null z-score in any used column gets a null
/// composite.
fn performance_zscores(
    job: &GroupJob,
    table: &PlayerSeasonTable,
    min_sample: usize,
) -> Vec<Option<f64>> {
    let n = job.members.len();
    let mut weighted: Vec<Option<f64>> = vec![Some(0.0); n];
    let mut applied = 0.0;

    for (stat, &weight) in job.weights {
        if !table.has_column(stat) {
            continue;
        }
        applied += weight;
        let values: Vec<Option<f64>> = job.members.iter().map(|r| r.value_of(stat)).collect();
        for (acc, z) in weighted.iter_mut().zip(zscore_within_group(&values, min_sample)) {
            *acc = match (*acc, z) {
                (Some(sum), Some(z)) => Some(sum + z * weight),
                _ => None,
            };
        }
    }

    if applied <= 0.0 {
        return vec![None; n];
    }
    weighted
        .into_iter()
        .map(|sum| sum.map(|s| s / applied))
        .collect()
}

fn score_group(
    job: &GroupJob,
    table: &PlayerSeasonTable,
    config: &ScoringConfig,
) -> Vec<ScoredPlayerSeason> {
    let performance = performance_zscores(job, table, config.min_zscore_sample);
    let salaries: Vec<Option<f64>> = job.members.iter().map(|r| r.apy_cap_pct()).collect();
    let salary = zscore_within_group(&salaries, config.min_zscore_sample);
    let values: Vec<Option<f64>> = performance
        .iter()
        .zip(&salary)
        .map(|(p, s)| match (p, s) {
            (Some(p), Some(s)) => Some(p - s),
            _ => None,
        })
        .collect();
    let percentiles = percentile_rank(&values);

    debug!("scored {} {} player-seasons", job.members.len(), job.group);

    job.members
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let value = values[i];
            ScoredPlayerSeason {
                record: (*rec).clone(),
                performance_zscore: performance[i],
                salary_zscore: salary[i],
                value_score: value,
                value_percentile: percentiles[i],
                is_bargain: value.is_some_and(|v| v > config.bargain_threshold),
                is_overpaid: value.is_some_and(|v| v < config.overpaid_threshold),
            }
        })
        .collect()
}

/// Score every position group that has a weight table and at least
/// `min_group_size` members.
///
/// Output holds only scored groups, in [`PositionGroup::ALL`] order, with
/// each group's rows in input order. When no group qualifies, every input
/// row is returned unscored.
pub fn score_players(
    table: &PlayerSeasonTable,
    weights: &WeightTable,
    config: &ScoringConfig,
) -> Result<ScoredTable, ScoringError> {
    weights.validate()?;

    let mut prepared = table.clone();
    prepare_inverted_stats(&mut prepared);

    let mut jobs = Vec::new();
    for group in PositionGroup::ALL {
        let members: Vec<&PlayerSeason> = prepared
            .rows
            .iter()
            .filter(|r| r.pos_group == group)
            .collect();
        if members.is_empty() {
            continue;
        }
        let Some(group_weights) = weights.for_group(group) else {
            debug!("no weight table for {}; skipping {} rows", group, members.len());
            continue;
        };
        if members.len() < config.min_group_size {
            info!(
                "skipping {}: {} rows is below the minimum of {}",
                group,
                members.len(),
                config.min_group_size
            );
            continue;
        }
        jobs.push(GroupJob {
            group,
            weights: group_weights,
            members,
        });
    }

    if jobs.is_empty() {
        info!("no position group qualified for scoring");
        return Ok(ScoredTable {
            stat_columns: prepared.stat_columns.clone(),
            rows: prepared.rows.iter().cloned().map(ScoredPlayerSeason::unscored).collect(),
            scored_groups: Vec::new(),
        });
    }

    let scored: Vec<Vec<ScoredPlayerSeason>> = if config.parallel {
        jobs.par_iter().map(|job| score_group(job, &prepared, config)).collect()
    } else {
        jobs.iter().map(|job| score_group(job, &prepared, config)).collect()
    };

    Ok(ScoredTable {
        stat_columns: prepared.stat_columns.clone(),
        rows: scored.into_iter().flatten().collect(),
        scored_groups: jobs.iter().map(|j| j.group).collect(),
    })
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

fn ranked(
    table: &ScoredTable,
    group: Option<PositionGroup>,
    descending: bool,
) -> Vec<&ScoredPlayerSeason> {
    let mut rows: Vec<&ScoredPlayerSeason> = table
        .rows
        .iter()
        .filter(|r| r.value_score.is_some())
        .filter(|r| group.map_or(true, |g| r.pos_group() == g))
        .collect();
    rows.sort_by(|a, b| {
        let (a, b) = (a.value_score.unwrap_or(0.0), b.value_score.unwrap_or(0.0));
        let ord = a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal);
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
    rows
}

/// The `n` highest value scores, optionally within one group.
pub fn top_bargains(
    table: &ScoredTable,
    group: Option<PositionGroup>,
    n: usize,
) -> Vec<&ScoredPlayerSeason> {
    let mut rows = ranked(table, group, true);
    rows.truncate(n);
    rows
}

/// The `n` lowest value scores, optionally within one group.
pub fn top_overpaid(
    table: &ScoredTable,
    group: Option<PositionGroup>,
    n: usize,
) -> Vec<&ScoredPlayerSeason> {
    let mut rows = ranked(table, group, false);
    rows.truncate(n);
    rows
}

/// Per-group roll-up for reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub pos_group: PositionGroup,
    pub players: usize,
    pub mean_value_score: Option<f64>,
    pub mean_apy_cap_pct: Option<f64>,
    pub bargains: usize,
    pub overpaid: usize,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

pub fn group_summary(table: &ScoredTable) -> Vec<GroupSummary> {
    PositionGroup::ALL
        .iter()
        .filter_map(|&group| {
            let rows: Vec<&ScoredPlayerSeason> = table
                .rows
                .iter()
                .filter(|r| r.pos_group() == group)
                .collect();
            if rows.is_empty() {
                return None;
            }
            Some(GroupSummary {
                pos_group: group,
                players: rows.len(),
                mean_value_score: mean(rows.iter().filter_map(|r| r.value_score)),
                mean_apy_cap_pct: mean(rows.iter().filter_map(|r| r.record.apy_cap_pct())),
                bargains: rows.iter().filter(|r| r.is_bargain).count(),
                overpaid: rows.iter().filter(|r| r.is_overpaid).count(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ContractType, SeasonContract};
    use std::collections::BTreeMap;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn contract(id: &str, pct: f64) -> SeasonContract {
        SeasonContract {
            gsis_id: id.into(),
            season: 2022,
            player_name: None,
            position: None,
            team: None,
            apy_cap_pct: pct,
            apy: None,
            value: None,
            guaranteed: None,
            years: 2,
            year_signed: 2021,
            contract_end_year: 2022,
            contract_type: ContractType::Veteran,
        }
    }

    fn player(id: &str, group: PositionGroup, pct: f64, stats: &[(&str, f64)]) -> PlayerSeason {
        PlayerSeason {
            pos_group: group,
            stats: stats.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            contract: Some(contract(id, pct)),
            has_salary: true,
            meets_snap_threshold: true,
            ..PlayerSeason::new(id, 2022)
        }
    }

    fn columns(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    const WR_COLUMNS: &[&str] = &["receiving_yards", "receptions", "receiving_tds", "catch_rate"];

    fn config(min_group_size: usize) -> ScoringConfig {
        ScoringConfig {
            min_group_size,
            ..ScoringConfig::default()
        }
    }

    fn three_receivers() -> PlayerSeasonTable {
        PlayerSeasonTable::new(
            columns(WR_COLUMNS),
            vec![
                player("A", PositionGroup::WideReceiver, 0.01, &[("receiving_yards", 1200.0)]),
                player("B", PositionGroup::WideReceiver, 0.05, &[("receiving_yards", 800.0)]),
                player("C", PositionGroup::WideReceiver, 0.10, &[("receiving_yards", 400.0)]),
            ],
        )
    }

    #[test]
    fn cheap_productive_receiver_scores_highest() {
        let scored =
            score_players(&three_receivers(), &WeightTable::builtin(), &config(3)).unwrap();
        assert_eq!(scored.scored_groups, vec![PositionGroup::WideReceiver]);
        let salary: Vec<f64> = scored.rows.iter().map(|r| r.salary_zscore.unwrap()).collect();
        assert!(approx_eq(salary[0], -0.961, 1e-3));
        assert!(approx_eq(salary[1], -0.074, 1e-3));
        assert!(approx_eq(salary[2], 1.035, 1e-3));

        // Only yards varies enough to score; the other stats contribute 0.
        let perf: Vec<f64> = scored.rows.iter().map(|r| r.performance_zscore.unwrap()).collect();
        assert!(approx_eq(perf[0], 0.3, 1e-9));
        assert!(approx_eq(perf[1], 0.0, 1e-9));
        assert!(approx_eq(perf[2], -0.3, 1e-9));

        let best = top_bargains(&scored, None, 1);
        assert_eq!(best[0].record.player_id, "A");
        for r in &scored.rows {
            let v = r.value_score.unwrap();
            assert!(approx_eq(v, r.performance_zscore.unwrap() - r.salary_zscore.unwrap(), 1e-12));
            assert_eq!(r.is_bargain, v > 2.0);
            assert_eq!(r.is_overpaid, v < -2.0);
        }
        assert_eq!(scored.rows[0].value_percentile, Some(100.0));
    }

    #[test]
    fn small_groups_are_excluded() {
        let scored =
            score_players(&three_receivers(), &WeightTable::builtin(), &config(5)).unwrap();
        assert!(scored.scored_groups.is_empty());
        assert_eq!(scored.len(), 3);
        assert!(scored
            .rows
            .iter()
            .all(|r| r.value_score.is_none() && !r.is_bargain && !r.is_overpaid));
    }

    fn mixed_table() -> PlayerSeasonTable {
        let mut rows = Vec::new();
        let receivers = [
            (1300.0, 0.02),
            (950.0, 0.06),
            (400.0, 0.11),
            (720.0, 0.03),
            (1010.0, 0.09),
        ];
        for (i, (yards, pct)) in receivers.iter().enumerate() {
            rows.push(player(
                &format!("WR{i}"),
                PositionGroup::WideReceiver,
                *pct,
                &[("receiving_yards", *yards), ("receptions", yards / 12.0)],
            ));
        }
        // Two tight ends: below the floor, dropped from output.
        rows.push(player("TE0", PositionGroup::TightEnd, 0.04, &[("receiving_yards", 600.0)]));
        rows.push(player("TE1", PositionGroup::TightEnd, 0.05, &[("receiving_yards", 500.0)]));
        let linemen = [
            (1100.0, 0.01),
            (980.0, 0.07),
            (1020.0, 0.03),
            (600.0, 0.08),
            (1060.0, 0.05),
        ];
        for (i, (snaps, pct)) in linemen.iter().enumerate() {
            let mut rec = player(&format!("OL{i}"), PositionGroup::OffensiveLine, *pct, &[]);
            rec.games_played = 17 - i as u32;
            rec.snaps = Some(crate::record::SeasonSnaps {
                offense: *snaps,
                defense: 0.0,
                special_teams: 0.0,
                total: *snaps,
                games: 17,
            });
            rows.push(rec);
        }
        // Punters have no weights.
        for i in 0..5 {
            rows.push(player(&format!("P{i}"), PositionGroup::Punter, 0.01 * (i + 1) as f64, &[]));
        }
        // Linemen and punters ahead of receivers in the input.
        rows.rotate_right(10);
        PlayerSeasonTable::new(columns(WR_COLUMNS), rows)
    }

    fn score_defaults(table: &PlayerSeasonTable) -> ScoredTable {
        score_players(table, &WeightTable::builtin(), &ScoringConfig::default()).unwrap()
    }

    #[test]
    fn groups_follow_position_order_and_keep_input_order() {
        let scored = score_defaults(&mixed_table());
        assert_eq!(
            scored.scored_groups,
            vec![PositionGroup::WideReceiver, PositionGroup::OffensiveLine]
        );
        let ids: Vec<&str> = scored.rows.iter().map(|r| r.record.player_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["WR0", "WR1", "WR2", "WR3", "WR4", "OL0", "OL1", "OL2", "OL3", "OL4"]
        );
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let table = mixed_table();
        let weights = WeightTable::builtin();
        let parallel = score_players(&table, &weights, &ScoringConfig::default()).unwrap();
        let sequential = score_players(
            &table,
            &weights,
            &ScoringConfig {
                parallel: false,
                ..ScoringConfig::default()
            },
        )
        .unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn value_identity_flags_and_percentiles_hold() {
        let scored = score_defaults(&mixed_table());
        let mut by_group: BTreeMap<PositionGroup, Vec<&ScoredPlayerSeason>> = BTreeMap::new();
        for r in &scored.rows {
            let v = r.value_score.unwrap();
            assert!(approx_eq(v, r.performance_zscore.unwrap() - r.salary_zscore.unwrap(), 1e-12));
            assert!(!(r.is_bargain && r.is_overpaid));
            let p = r.value_percentile.unwrap();
            assert!(p > 0.0 && p <= 100.0);
            by_group.entry(r.pos_group()).or_default().push(r);
        }
        for rows in by_group.values() {
            for a in rows {
                for b in rows {
                    if a.value_score.unwrap() < b.value_score.unwrap() {
                        assert!(a.value_percentile.unwrap() <= b.value_percentile.unwrap());
                    }
                }
            }
        }
    }

    #[test]
    fn constant_stat_contributes_zero() {
        let rows = (0..5)
            .map(|i| {
                player(
                    &format!("WR{i}"),
                    PositionGroup::WideReceiver,
                    0.02 + 0.01 * i as f64,
                    &[("catch_rate", 65.0), ("receiving_yards", 500.0 + 100.0 * i as f64)],
                )
            })
            .collect();
        let table = PlayerSeasonTable::new(columns(&["catch_rate", "receiving_yards"]), rows);
        let weights = WeightTable::new(
            "test",
            [(
                PositionGroup::WideReceiver,
                [("catch_rate".to_string(), 0.5), ("receiving_yards".to_string(), 0.5)]
                    .into_iter()
                    .collect(),
            )]
            .into_iter()
            .collect(),
        );
        let scored = score_players(&table, &weights, &ScoringConfig::default()).unwrap();
        let yards_only = zscore_within_group(
            &table.rows.iter().map(|r| r.stat("receiving_yards")).collect::<Vec<_>>(),
            3,
        );
        for (r, z) in scored.rows.iter().zip(yards_only) {
            // Half the weight sits on a zero z-score.
            assert!(approx_eq(r.performance_zscore.unwrap(), z.unwrap() * 0.5, 1e-12));
        }
    }

    fn yards_and_receptions_weights() -> WeightTable {
        WeightTable::new(
            "test",
            [(
                PositionGroup::WideReceiver,
                [("receiving_yards".to_string(), 0.75), ("receptions".to_string(), 0.25)]
                    .into_iter()
                    .collect(),
            )]
            .into_iter()
            .collect(),
        )
    }

    fn five_receivers() -> Vec<PlayerSeason> {
        (0..5)
            .map(|i| {
                player(
                    &format!("WR{i}"),
                    PositionGroup::WideReceiver,
                    0.02 + 0.01 * i as f64,
                    &[
                        ("receiving_yards", 400.0 + 200.0 * i as f64),
                        ("receptions", 30.0 + 5.0 * (i * i) as f64),
                    ],
                )
            })
            .collect()
    }

    #[test]
    fn null_weighted_stat_leaves_member_unscored() {
        let mut rows = five_receivers();
        rows[0].stats.remove("receptions");
        let table = PlayerSeasonTable::new(columns(&["receiving_yards", "receptions"]), rows);
        let weights = yards_and_receptions_weights();
        let scored = score_players(&table, &weights, &ScoringConfig::default()).unwrap();

        let w0 = &scored.rows[0];
        assert_eq!(w0.performance_zscore, None);
        assert!(w0.salary_zscore.is_some());
        assert_eq!(w0.value_score, None);
        assert_eq!(w0.value_percentile, None);
        assert!(!w0.is_bargain && !w0.is_overpaid);

        // The others divide by the full weight of both columns.
        let yards = zscore_within_group(
            &table.rows.iter().map(|r| r.stat("receiving_yards")).collect::<Vec<_>>(),
            3,
        );
        let catches = zscore_within_group(
            &table.rows.iter().map(|r| r.stat("receptions")).collect::<Vec<_>>(),
            3,
        );
        for i in 1..5 {
            let expected = yards[i].unwrap() * 0.75 + catches[i].unwrap() * 0.25;
            assert!(approx_eq(scored.rows[i].performance_zscore.unwrap(), expected, 1e-12));
        }
        let top = scored.rows[1..].iter().filter(|r| r.value_percentile == Some(100.0));
        assert_eq!(top.count(), 1);
        assert!(top_bargains(&scored, None, 5).iter().all(|r| r.record.player_id != "WR0"));
    }

    #[test]
    fn rescaling_a_stat_keeps_performance() {
        let table =
            PlayerSeasonTable::new(columns(&["receiving_yards", "receptions"]), five_receivers());
        let mut rescaled = table.clone();
        for rec in &mut rescaled.rows {
            if let Some(y) = rec.stats.get_mut("receiving_yards") {
                *y *= 0.9144;
            }
        }
        let weights = yards_and_receptions_weights();
        let before = score_players(&table, &weights, &ScoringConfig::default()).unwrap();
        let after = score_players(&rescaled, &weights, &ScoringConfig::default()).unwrap();
        for (a, b) in before.rows.iter().zip(&after.rows) {
            assert!(approx_eq(a.performance_zscore.unwrap(), b.performance_zscore.unwrap(), 1e-9));
            assert!(approx_eq(a.value_score.unwrap(), b.value_score.unwrap(), 1e-9));
        }
    }

    #[test]
    fn missing_column_is_skipped_not_zeroed() {
        let rows = (0..5)
            .map(|i| {
                player(
                    &format!("WR{i}"),
                    PositionGroup::WideReceiver,
                    0.02 + 0.01 * i as f64,
                    &[("receiving_yards", 500.0 + 90.0 * i as f64)],
                )
            })
            .collect();
        let table = PlayerSeasonTable::new(columns(&["receiving_yards"]), rows);
        let scored = score_defaults(&table);
        let yards = zscore_within_group(
            &table.rows.iter().map(|r| r.stat("receiving_yards")).collect::<Vec<_>>(),
            3,
        );
        for (r, z) in scored.rows.iter().zip(yards) {
            assert!(approx_eq(r.performance_zscore.unwrap(), z.unwrap(), 1e-12));
        }
    }

    #[test]
    fn inverted_stats_flip_sign() {
        let mut table = PlayerSeasonTable::new(
            columns(&["int_rate", "rushing_fumbles"]),
            vec![
                player(
                    "QB1",
                    PositionGroup::Quarterback,
                    0.1,
                    &[("int_rate", 2.5), ("rushing_fumbles", 3.0)],
                ),
                player("QB2", PositionGroup::Quarterback, 0.1, &[]),
            ],
        );
        prepare_inverted_stats(&mut table);
        assert!(table.has_column("int_rate_inv"));
        assert!(table.has_column("fumbles_inv"));
        assert_eq!(table.rows[0].stat("int_rate_inv"), Some(-2.5));
        assert_eq!(table.rows[0].stat("fumbles_inv"), Some(-3.0));
        assert_eq!(table.rows[1].stat("int_rate_inv"), None);
        assert_eq!(table.rows[1].stat("fumbles_inv"), Some(0.0));

        let mut bare = PlayerSeasonTable::new(
            BTreeSet::new(),
            vec![player("X", PositionGroup::Quarterback, 0.1, &[])],
        );
        prepare_inverted_stats(&mut bare);
        assert!(!bare.has_column("int_rate_inv"));
        assert!(bare.rows[0].stats.is_empty());
    }

    #[test]
    fn invalid_weights_are_rejected() {
        let weights = WeightTable::new(
            "bad",
            [(
                PositionGroup::WideReceiver,
                [("receiving_yards".to_string(), -1.0)].into_iter().collect(),
            )]
            .into_iter()
            .collect(),
        );
        let err = score_players(&three_receivers(), &weights, &config(3)).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidWeights(WeightError::InvalidWeight { .. })));
    }

    #[test]
    fn query_helpers_filter_and_order() {
        let scored = score_defaults(&mixed_table());
        let top = top_bargains(&scored, Some(PositionGroup::OffensiveLine), 3);
        assert_eq!(top.len(), 3);
        assert!(top.iter().all(|r| r.pos_group() == PositionGroup::OffensiveLine));
        assert!(top.windows(2).all(|w| w[0].value_score >= w[1].value_score));

        let worst = top_overpaid(&scored, None, 100);
        assert_eq!(worst.len(), 10);
        assert!(worst.windows(2).all(|w| w[0].value_score <= w[1].value_score));
        assert!(top_bargains(&scored, Some(PositionGroup::Punter), 5).is_empty());
    }

    #[test]
    fn summary_counts_groups() {
        let scored = score_defaults(&mixed_table());
        let summary = group_summary(&scored);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].pos_group, PositionGroup::WideReceiver);
        assert_eq!(summary[0].players, 5);
        // z-scores are centered, so their differences average to ~0.
        assert!(approx_eq(summary[0].mean_value_score.unwrap(), 0.0, 1e-9));
        assert!(approx_eq(summary[1].mean_apy_cap_pct.unwrap(), 0.048, 1e-12));
    }
}
