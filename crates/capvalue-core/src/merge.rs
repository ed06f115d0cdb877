// Cross-source merge: seasonal stats + contracts + snap counts + defensive
// stats, keyed on (player_id, season).

use crate::config::MergeConfig;
use crate::positions::PositionGroup;
use crate::record::{PlayerSeason, PlayerSeasonTable, SeasonContract, SeasonSnaps, StatLine};
use crate::sources::{DefensiveTable, PlayerRef, SnapCountRow};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Player-season key. Owned so maps can outlive their sources.
pub type SeasonKey = (String, i32);

// ---------------------------------------------------------------------------
// Crosswalk
// ---------------------------------------------------------------------------

/// `pfr_id → gsis_id` lookup built from the players table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Crosswalk {
    pfr_to_gsis: HashMap<String, String>,
}

impl Crosswalk {
    pub fn gsis_for(&self, pfr_id: &str) -> Option<&str> {
        self.pfr_to_gsis.get(pfr_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pfr_to_gsis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pfr_to_gsis.is_empty()
    }
}

/// Map alternate (`pfr_id`) identities onto primary (`gsis_id`) ones.
///
/// Only rows carrying both ids count; when a `pfr_id` repeats, the first
/// row wins.
pub fn build_crosswalk(players: &[PlayerRef]) -> Crosswalk {
    let mut pfr_to_gsis = HashMap::new();
    for p in players {
        if let (Some(gsis), Some(pfr)) = (p.gsis_id.as_ref(), p.pfr_id.as_ref()) {
            pfr_to_gsis.entry(pfr.clone()).or_insert_with(|| gsis.clone());
        }
    }
    Crosswalk { pfr_to_gsis }
}

// ---------------------------------------------------------------------------
// Snap counts
// ---------------------------------------------------------------------------

/// Sum per-game snap counts into season totals keyed by primary id.
///
/// Nulls count as zero in the sums; `games` counts rows with a game id.
/// Rows whose `pfr_player_id` has no crosswalk entry are dropped. When two
/// alternate ids resolve to the same primary key, the first in
/// `(pfr_player_id, season)` order wins.
pub fn aggregate_snap_counts(
    snaps: &[SnapCountRow],
    crosswalk: &Crosswalk,
) -> BTreeMap<SeasonKey, SeasonSnaps> {
    let mut by_alt: BTreeMap<(&str, i32), SeasonSnaps> = BTreeMap::new();
    for row in snaps {
        let acc = by_alt
            .entry((row.pfr_player_id.as_str(), row.season))
            .or_insert(SeasonSnaps {
                offense: 0.0,
                defense: 0.0,
                special_teams: 0.0,
                total: 0.0,
                games: 0,
            });
        acc.offense += row.offense_snaps.unwrap_or(0.0);
        acc.defense += row.defense_snaps.unwrap_or(0.0);
        acc.special_teams += row.st_snaps.unwrap_or(0.0);
        if row.game_id.is_some() {
            acc.games += 1;
        }
    }

    let mut unmatched = 0usize;
    let mut out: BTreeMap<SeasonKey, SeasonSnaps> = BTreeMap::new();
    for ((pfr_id, season), mut totals) in by_alt {
        let Some(gsis) = crosswalk.gsis_for(pfr_id) else {
            unmatched += 1;
            continue;
        };
        totals.total = totals.offense + totals.defense + totals.special_teams;
        let key = (gsis.to_string(), season);
        if out.contains_key(&key) {
            warn!(
                "snap counts for {} ({}) collide with an earlier id for {} {}; keeping the first",
                pfr_id, season, gsis, season
            );
            continue;
        }
        out.insert(key, totals);
    }
    if unmatched > 0 {
        debug!("dropped {} snap count seasons without a crosswalk entry", unmatched);
    }
    out
}

// ---------------------------------------------------------------------------
// Defensive records
// ---------------------------------------------------------------------------

/// Build player-season records from the defensive table, keyed by primary id.
///
/// Names and positions fall back to the players table when the defensive
/// row lacks them. Unmatched rows are dropped; a repeated key keeps its
/// first row.
pub fn build_defensive_players(
    defense: &DefensiveTable,
    crosswalk: &Crosswalk,
    players: &[PlayerRef],
) -> BTreeMap<SeasonKey, PlayerSeason> {
    let mut info_by_gsis: HashMap<&str, &PlayerRef> = HashMap::new();
    for p in players {
        if let Some(gsis) = p.gsis_id.as_deref() {
            info_by_gsis.entry(gsis).or_insert(p);
        }
    }

    let mut unmatched = 0usize;
    let mut duplicates = 0usize;
    let mut out: BTreeMap<SeasonKey, PlayerSeason> = BTreeMap::new();
    for row in &defense.rows {
        let Some(gsis) = crosswalk.gsis_for(&row.pfr_id) else {
            unmatched += 1;
            continue;
        };
        let key = (gsis.to_string(), row.season);
        if out.contains_key(&key) {
            duplicates += 1;
            continue;
        }
        let reference = info_by_gsis.get(gsis);
        let player_name = row
            .player
            .clone()
            .or_else(|| reference.and_then(|p| p.display_name.clone()));
        let position = row
            .pos
            .clone()
            .or_else(|| reference.and_then(|p| p.position.clone()));
        let record = PlayerSeason {
            pos_group: PositionGroup::classify(position.as_deref()),
            player_name,
            position,
            recent_team: row.tm.clone(),
            games_played: row.g.map(|g| g.max(0.0).round() as u32).unwrap_or(0),
            stats: row.stats.clone(),
            ..PlayerSeason::new(gsis, row.season)
        };
        out.insert(key, record);
    }
    if unmatched > 0 {
        debug!("dropped {} defensive rows without a crosswalk entry", unmatched);
    }
    if duplicates > 0 {
        warn!("dropped {} duplicate defensive player-seasons", duplicates);
    }
    out
}

/// Copy defensive values into `stats` for columns it lacks.
fn backfill(stats: &mut StatLine, source: &StatLine, columns: &BTreeSet<String>) {
    for col in columns {
        if stats.contains_key(col) {
            continue;
        }
        if let Some(&v) = source.get(col) {
            stats.insert(col.clone(), v);
        }
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Everything the merger joins onto the seasonal table.
#[derive(Debug, Clone, Copy)]
pub struct MergeInputs<'a> {
    pub seasonal: &'a PlayerSeasonTable,
    pub contracts: &'a [SeasonContract],
    pub snap_counts: Option<&'a [SnapCountRow]>,
    pub defense: Option<&'a DefensiveTable>,
    pub players: &'a [PlayerRef],
}

/// Union every source into one table with a unique `(player_id, season)`
/// key.
///
/// Seasonal rows come first in their input order, followed by defensive
/// player-seasons the seasonal table lacks, in key order. Joined values
/// never overwrite values already present.
pub fn merge_all(inputs: MergeInputs<'_>, config: &MergeConfig) -> PlayerSeasonTable {
    let crosswalk = build_crosswalk(inputs.players);
    debug!("crosswalk maps {} alternate ids", crosswalk.len());

    let mut seen: HashSet<SeasonKey> = HashSet::new();
    let mut rows: Vec<PlayerSeason> = Vec::with_capacity(inputs.seasonal.len());
    for rec in &inputs.seasonal.rows {
        let key = (rec.player_id.clone(), rec.season);
        if !seen.insert(key) {
            warn!(
                "duplicate seasonal record for {} {}; keeping the first",
                rec.player_id, rec.season
            );
            continue;
        }
        let mut rec = rec.clone();
        rec.pos_group = PositionGroup::classify(rec.position.as_deref());
        rows.push(rec);
    }

    let mut stat_columns = inputs.seasonal.stat_columns.clone();
    let defensive = match inputs.defense {
        Some(defense) => {
            stat_columns.extend(defense.columns.iter().cloned());
            build_defensive_players(defense, &crosswalk, inputs.players)
        }
        None => BTreeMap::new(),
    };

    let primary_count = rows.len();
    for (key, rec) in &defensive {
        if !seen.contains(key) {
            rows.push(rec.clone());
        }
    }
    if rows.len() > primary_count {
        info!(
            "added {} defensive player-seasons missing from seasonal stats",
            rows.len() - primary_count
        );
    }

    let contracts: HashMap<(&str, i32), &SeasonContract> = inputs
        .contracts
        .iter()
        .map(|c| ((c.gsis_id.as_str(), c.season), c))
        .collect();
    let snaps = inputs
        .snap_counts
        .map(|s| aggregate_snap_counts(s, &crosswalk))
        .unwrap_or_default();
    let def_columns = inputs
        .defense
        .map(|d| d.columns.clone())
        .unwrap_or_default();

    for rec in &mut rows {
        let key = (rec.player_id.clone(), rec.season);
        if let Some(c) = contracts.get(&(key.0.as_str(), key.1)) {
            rec.contract = Some((*c).clone());
        }
        if let Some(s) = snaps.get(&key) {
            rec.snaps = Some(s.clone());
        }
        if let Some(def) = defensive.get(&key) {
            backfill(&mut rec.stats, &def.stats, &def_columns);
        }
        rec.has_salary = rec.apy_cap_pct().is_some();
        rec.meets_snap_threshold = rec.total_snaps().unwrap_or(0.0) >= config.min_snaps;
    }

    PlayerSeasonTable::new(stat_columns, rows)
}

/// Rows fit for scoring: paid, on the field enough, and in a known group.
pub fn get_analysis_ready(merged: &PlayerSeasonTable) -> PlayerSeasonTable {
    let ready =
        merged.filtered(|r| r.has_salary && r.meets_snap_threshold && !r.pos_group.is_unknown());
    info!(
        "{} of {} merged player-seasons are analysis-ready",
        ready.len(),
        merged.len()
    );
    ready
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
