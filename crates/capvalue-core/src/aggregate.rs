// Weekly → seasonal aggregation and derived rate stats.

use crate::record::{PlayerSeason, PlayerSeasonTable, StatLine};
use crate::sources::WeeklyTable;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Counting stats summed per player-season when present in the input.
pub const SUM_COLUMNS: &[&str] = &[
    "completions",
    "attempts",
    "passing_yards",
    "passing_tds",
    "interceptions",
    "sacks",
    "sack_fumbles",
    "sack_fumbles_lost",
    "passing_first_downs",
    "passing_2pt_conversions",
    "carries",
    "rushing_yards",
    "rushing_tds",
    "rushing_fumbles",
    "rushing_fumbles_lost",
    "rushing_first_downs",
    "rushing_2pt_conversions",
    "receptions",
    "targets",
    "receiving_yards",
    "receiving_tds",
    "receiving_fumbles",
    "receiving_fumbles_lost",
    "receiving_first_downs",
    "receiving_2pt_conversions",
    "special_teams_tds",
    "fantasy_points",
    "fantasy_points_ppr",
    "fg_made",
    "fg_att",
    "pat_made",
    "pat_att",
];

/// Columns with this suffix are additive efficiency metrics and are summed.
pub const EPA_SUFFIX: &str = "_epa";

/// Rate stats derived after summation, with the columns each one needs.
const RATE_INPUTS: &[(&str, &[&str])] = &[
    ("completion_pct", &["completions", "attempts"]),
    ("yards_per_attempt", &["passing_yards", "attempts"]),
    ("td_rate", &["passing_tds", "attempts"]),
    ("int_rate", &["interceptions", "attempts"]),
    (
        "passer_rating",
        &["completions", "attempts", "passing_yards", "passing_tds", "interceptions"],
    ),
    ("yards_per_carry", &["rushing_yards", "carries"]),
    ("catch_rate", &["receptions", "targets"]),
    ("yards_per_reception", &["receiving_yards", "receptions"]),
    ("fg_pct", &["fg_made", "fg_att"]),
    ("xp_pct", &["pat_made", "pat_att"]),
];

/// Names of all derived rate stats.
pub const RATE_COLUMNS: &[&str] = &[
    "completion_pct",
    "yards_per_attempt",
    "td_rate",
    "int_rate",
    "passer_rating",
    "yards_per_carry",
    "catch_rate",
    "yards_per_reception",
    "fg_pct",
    "xp_pct",
];

/// Upper clip for each passer rating component.
const RATING_COMPONENT_MAX: f64 = 2.375;

// ---------------------------------------------------------------------------
// Arithmetic helpers
// ---------------------------------------------------------------------------

/// `num / den`, or `None` when either side is missing or `den` is not positive.
pub fn safe_div(num: Option<f64>, den: Option<f64>) -> Option<f64> {
    match (num, den) {
        (Some(n), Some(d)) if d > 0.0 => Some(n / d),
        _ => None,
    }
}

/// NFL passer rating from season totals.
///
/// Each of the four components (completion %, yards per attempt, TD rate,
/// interception rate) is clipped to `[0, 2.375]`; a perfect rating is 158.3.
pub fn passer_rating(
    completions: f64,
    attempts: f64,
    yards: f64,
    touchdowns: f64,
    interceptions: f64,
) -> Option<f64> {
    if attempts <= 0.0 {
        return None;
    }
    let clip = |v: f64| v.clamp(0.0, RATING_COMPONENT_MAX);
    let a = clip((completions / attempts - 0.3) * 5.0);
    let b = clip((yards / attempts - 3.0) * 0.25);
    let c = clip(touchdowns / attempts * 20.0);
    let d = clip(RATING_COMPONENT_MAX - interceptions / attempts * 25.0);
    Some((a + b + c + d) / 6.0 * 100.0)
}

/// Add derived rate stats to a summed stat line. Rates whose inputs are
/// missing or whose denominator is zero are left out (null).
pub fn compute_rate_stats(stats: &mut StatLine) {
    let get = |name: &str| stats.get(name).copied();
    let pct = |v: Option<f64>| v.map(|x| x * 100.0);

    let attempts = get("attempts");
    let mut rates: Vec<(&str, Option<f64>)> = vec![
        ("completion_pct", pct(safe_div(get("completions"), attempts))),
        ("yards_per_attempt", safe_div(get("passing_yards"), attempts)),
        ("td_rate", pct(safe_div(get("passing_tds"), attempts))),
        ("int_rate", pct(safe_div(get("interceptions"), attempts))),
        ("yards_per_carry", safe_div(get("rushing_yards"), get("carries"))),
        ("catch_rate", pct(safe_div(get("receptions"), get("targets")))),
        (
            "yards_per_reception",
            safe_div(get("receiving_yards"), get("receptions")),
        ),
        ("fg_pct", pct(safe_div(get("fg_made"), get("fg_att")))),
        ("xp_pct", pct(safe_div(get("pat_made"), get("pat_att")))),
    ];

    let rating = match (
        get("completions"),
        attempts,
        get("passing_yards"),
        get("passing_tds"),
        get("interceptions"),
    ) {
        (Some(cmp), Some(att), Some(yds), Some(td), Some(int)) => {
            passer_rating(cmp, att, yds, td, int)
        }
        _ => None,
    };
    rates.push(("passer_rating", rating));

    for (name, value) in rates {
        if let Some(v) = value {
            stats.insert(name.to_string(), v);
        }
    }
}

/// Columns of `schema` that are summed: the fixed list plus `*_epa`.
pub fn summed_columns(schema: &BTreeSet<String>) -> Vec<String> {
    let mut cols: Vec<String> = SUM_COLUMNS
        .iter()
        .filter(|c| schema.contains(**c))
        .map(|c| c.to_string())
        .collect();
    cols.extend(
        schema
            .iter()
            .filter(|c| c.len() > EPA_SUFFIX.len() && c.ends_with(EPA_SUFFIX))
            .cloned(),
    );
    cols
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SeasonAccumulator {
    player_name: Option<String>,
    position: Option<String>,
    position_group: Option<String>,
    recent_team: Option<String>,
    games_played: u32,
    sums: StatLine,
}

/// Collapse weekly rows into one record per `(player_id, season)`.
///
/// Only regular-season and postseason rows count. Identity fields take the
/// first non-null value seen, `recent_team` the last. Summed columns that
/// exist in the input are present on every output row (0 when every week was
/// null); columns the input lacks stay absent.
pub fn aggregate_weekly(weekly: &WeeklyTable) -> PlayerSeasonTable {
    let sum_cols = summed_columns(&weekly.columns);
    let mut groups: BTreeMap<(String, i32), SeasonAccumulator> = BTreeMap::new();
    let mut skipped = 0usize;

    for row in &weekly.rows {
        if !row.season_type.counts_toward_season() {
            skipped += 1;
            continue;
        }
        let acc = groups
            .entry((row.player_id.clone(), row.season))
            .or_insert_with(|| SeasonAccumulator {
                sums: sum_cols.iter().map(|c| (c.clone(), 0.0)).collect(),
                ..SeasonAccumulator::default()
            });

        if acc.player_name.is_none() {
            acc.player_name = row.player_name.clone();
        }
        if acc.position.is_none() {
            acc.position = row.position.clone();
        }
        if acc.position_group.is_none() {
            acc.position_group = row.position_group.clone();
        }
        if row.recent_team.is_some() {
            acc.recent_team = row.recent_team.clone();
        }
        if row.week.is_some() {
            acc.games_played += 1;
        }
        for col in &sum_cols {
            if let Some(v) = row.stats.get(col) {
                *acc.sums.entry(col.clone()).or_insert(0.0) += v;
            }
        }
    }

    if skipped > 0 {
        debug!("dropped {} weekly rows outside regular season/postseason", skipped);
    }

    let rows = groups
        .into_iter()
        .map(|((player_id, season), acc)| {
            let mut stats = acc.sums;
            compute_rate_stats(&mut stats);
            PlayerSeason {
                player_name: acc.player_name,
                position: acc.position,
                position_group: acc.position_group,
                recent_team: acc.recent_team,
                games_played: acc.games_played,
                stats,
                ..PlayerSeason::new(player_id, season)
            }
        })
        .collect();

    let mut stat_columns: BTreeSet<String> = sum_cols.into_iter().collect();
    for (rate, inputs) in RATE_INPUTS {
        if inputs.iter().all(|c| stat_columns.contains(*c)) {
            stat_columns.insert(rate.to_string());
        }
    }

    PlayerSeasonTable::new(stat_columns, rows)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
