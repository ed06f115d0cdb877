// Per-player-season records shared by the aggregator, merger and scorer.

use crate::positions::PositionGroup;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Named numeric stats for one player-season. Absent key = null value.
pub type StatLine = BTreeMap<String, f64>;

/// Columns every [`PlayerSeason`] carries as typed fields. These are always
/// part of a table's schema, whatever the input vintage.
pub const RECORD_COLUMNS: &[&str] = &[
    "games_played",
    "total_offense_snaps",
    "total_defense_snaps",
    "total_st_snaps",
    "total_snaps",
    "snap_games",
    "apy_cap_pct",
    "apy",
    "value",
    "guaranteed",
    "years",
    "year_signed",
    "contract_end_year",
];

// ---------------------------------------------------------------------------
// Snaps and contracts
// ---------------------------------------------------------------------------

/// Season snap totals for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSnaps {
    pub offense: f64,
    pub defense: f64,
    pub special_teams: f64,
    pub total: f64,
    pub games: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    Rookie,
    Veteran,
}

impl ContractType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractType::Rookie => "rookie",
            ContractType::Veteran => "veteran",
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contract terms in force for one player in one season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonContract {
    pub gsis_id: String,
    pub season: i32,
    pub player_name: Option<String>,
    pub position: Option<String>,
    pub team: Option<String>,
    /// Average annual value as a percent of the salary cap (fraction, 0.05 = 5%).
    pub apy_cap_pct: f64,
    pub apy: Option<f64>,
    pub value: Option<f64>,
    pub guaranteed: Option<f64>,
    pub years: u32,
    pub year_signed: i32,
    pub contract_end_year: i32,
    pub contract_type: ContractType,
}

// ---------------------------------------------------------------------------
// PlayerSeason
// ---------------------------------------------------------------------------

/// One player in one season, unioned across all sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSeason {
    pub player_id: String,
    pub season: i32,
    pub player_name: Option<String>,
    /// Raw position label as reported by the source.
    pub position: Option<String>,
    /// Upstream position-group label, kept for reference only.
    pub position_group: Option<String>,
    pub pos_group: PositionGroup,
    pub recent_team: Option<String>,
    pub games_played: u32,
    pub stats: StatLine,
    pub snaps: Option<SeasonSnaps>,
    pub contract: Option<SeasonContract>,
    pub has_salary: bool,
    pub meets_snap_threshold: bool,
}

impl PlayerSeason {
    /// A bare record with no stats, snaps or contract attached.
    pub fn new(player_id: impl Into<String>, season: i32) -> Self {
        PlayerSeason {
            player_id: player_id.into(),
            season,
            player_name: None,
            position: None,
            position_group: None,
            pos_group: PositionGroup::Unknown,
            recent_team: None,
            games_played: 0,
            stats: StatLine::new(),
            snaps: None,
            contract: None,
            has_salary: false,
            meets_snap_threshold: false,
        }
    }

    pub fn key(&self) -> (&str, i32) {
        (self.player_id.as_str(), self.season)
    }

    pub fn stat(&self, name: &str) -> Option<f64> {
        self.stats.get(name).copied()
    }

    pub fn total_snaps(&self) -> Option<f64> {
        self.snaps.as_ref().map(|s| s.total)
    }

    pub fn apy_cap_pct(&self) -> Option<f64> {
        self.contract.as_ref().map(|c| c.apy_cap_pct)
    }

    /// Look up any numeric column by name: typed record fields first, then
    /// the stat line.
    pub fn value_of(&self, column: &str) -> Option<f64> {
        let snaps = self.snaps.as_ref();
        let contract = self.contract.as_ref();
        match column {
            "games_played" => Some(self.games_played as f64),
            "total_offense_snaps" => snaps.map(|s| s.offense),
            "total_defense_snaps" => snaps.map(|s| s.defense),
            "total_st_snaps" => snaps.map(|s| s.special_teams),
            "total_snaps" => snaps.map(|s| s.total),
            "snap_games" => snaps.map(|s| s.games as f64),
            "apy_cap_pct" => contract.map(|c| c.apy_cap_pct),
            "apy" => contract.and_then(|c| c.apy),
            "value" => contract.and_then(|c| c.value),
            "guaranteed" => contract.and_then(|c| c.guaranteed),
            "years" => contract.map(|c| c.years as f64),
            "year_signed" => contract.map(|c| c.year_signed as f64),
            "contract_end_year" => contract.map(|c| c.contract_end_year as f64),
            other => self.stat(other),
        }
    }
}

// ---------------------------------------------------------------------------
// PlayerSeasonTable
// ---------------------------------------------------------------------------

/// A batch of player-seasons plus the stat columns present in its inputs.
///
/// `stat_columns` is what separates "this input vintage has no such column"
/// from "this player has no value for it".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerSeasonTable {
    pub stat_columns: BTreeSet<String>,
    pub rows: Vec<PlayerSeason>,
}

impl PlayerSeasonTable {
    pub fn new(stat_columns: BTreeSet<String>, rows: Vec<PlayerSeason>) -> Self {
        PlayerSeasonTable { stat_columns, rows }
    }

    pub fn has_column(&self, name: &str) -> bool {
        RECORD_COLUMNS.contains(&name) || self.stat_columns.contains(name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Same schema, rows filtered by `keep`.
    pub fn filtered<F>(&self, keep: F) -> PlayerSeasonTable
    where
        F: Fn(&PlayerSeason) -> bool,
    {
        PlayerSeasonTable {
            stat_columns: self.stat_columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(apy_cap_pct: f64) -> SeasonContract {
        SeasonContract {
            gsis_id: "00-0001".into(),
            season: 2020,
            player_name: None,
            position: None,
            team: None,
            apy_cap_pct,
            apy: Some(1.5),
            value: None,
            guaranteed: None,
            years: 4,
            year_signed: 2020,
            contract_end_year: 2023,
            contract_type: ContractType::Rookie,
        }
    }

    #[test]
    fn value_of_reads_typed_fields_and_stats() {
        let mut rec = PlayerSeason::new("00-0001", 2020);
        rec.games_played = 16;
        rec.stats.insert("receiving_yards".into(), 1200.0);
        rec.snaps = Some(SeasonSnaps {
            offense: 800.0,
            defense: 0.0,
            special_teams: 20.0,
            total: 820.0,
            games: 16,
        });
        rec.contract = Some(contract(0.01));

        assert_eq!(rec.value_of("games_played"), Some(16.0));
        assert_eq!(rec.value_of("total_snaps"), Some(820.0));
        assert_eq!(rec.value_of("apy_cap_pct"), Some(0.01));
        assert_eq!(rec.value_of("apy"), Some(1.5));
        assert_eq!(rec.value_of("guaranteed"), None);
        assert_eq!(rec.value_of("receiving_yards"), Some(1200.0));
        assert_eq!(rec.value_of("receptions"), None);
    }

    #[test]
    fn missing_snaps_and_contract_are_null() {
        let rec = PlayerSeason::new("00-0002", 2019);
        assert_eq!(rec.total_snaps(), None);
        assert_eq!(rec.apy_cap_pct(), None);
        assert_eq!(rec.value_of("years"), None);
    }

    #[test]
    fn table_schema_includes_record_columns() {
        let table = PlayerSeasonTable::new(
            ["passing_yards".to_string()].into_iter().collect(),
            Vec::new(),
        );
        assert!(table.has_column("passing_yards"));
        assert!(table.has_column("total_snaps"));
        assert!(!table.has_column("rushing_yards"));
        assert!(table.is_empty());
    }
}
