// Input table loading.
//
// Reads the nflverse-style CSV exports the pipeline consumes: weekly player
// stats, contracts, the players reference table, snap counts and the
// PFR-style seasonal defensive table. Weekly and defensive tables have a
// schema that varies by data vintage, so they are read header-driven and
// keep track of which stat columns actually exist.

use crate::config::DataPaths;
use crate::record::StatLine;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("missing required column `{column}` in {table}")]
    MissingColumn { table: String, column: String },
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Part of the season a weekly row belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeasonType {
    Preseason,
    Regular,
    Postseason,
    Other(String),
}

impl SeasonType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "PRE" | "PRESEASON" => SeasonType::Preseason,
            "REG" | "REGULAR" => SeasonType::Regular,
            "POST" | "POSTSEASON" => SeasonType::Postseason,
            other => SeasonType::Other(other.to_string()),
        }
    }

    /// Regular season and postseason games count toward season totals.
    pub fn counts_toward_season(&self) -> bool {
        matches!(self, SeasonType::Regular | SeasonType::Postseason)
    }
}

/// One player-week of offensive stats.
#[derive(Debug, Clone)]
pub struct WeeklyRow {
    pub player_id: String,
    pub player_name: Option<String>,
    pub position: Option<String>,
    pub position_group: Option<String>,
    pub recent_team: Option<String>,
    pub season: i32,
    pub season_type: SeasonType,
    pub week: Option<u32>,
    pub stats: StatLine,
}

/// Weekly rows plus the numeric columns present in the file.
#[derive(Debug, Clone, Default)]
pub struct WeeklyTable {
    pub columns: BTreeSet<String>,
    pub rows: Vec<WeeklyRow>,
}

/// One contract as listed by the contracts source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractRow {
    pub gsis_id: Option<String>,
    pub player: Option<String>,
    pub position: Option<String>,
    pub team: Option<String>,
    pub year_signed: Option<i32>,
    pub years: Option<u32>,
    pub value: Option<f64>,
    pub apy: Option<f64>,
    pub guaranteed: Option<f64>,
    pub apy_cap_pct: Option<f64>,
}

/// Players reference table: identity crosswalk plus name/position fallback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerRef {
    pub gsis_id: Option<String>,
    pub pfr_id: Option<String>,
    pub display_name: Option<String>,
    pub position: Option<String>,
}

/// One player-game of snap counts, keyed by the PFR id.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapCountRow {
    pub pfr_player_id: String,
    pub season: i32,
    pub game_id: Option<String>,
    pub offense_snaps: Option<f64>,
    pub defense_snaps: Option<f64>,
    pub st_snaps: Option<f64>,
}

/// Source column → record stat name for the defensive table.
pub const DEFENSIVE_COLUMN_MAP: &[(&str, &str)] = &[
    ("sk", "def_sacks"),
    ("int", "def_ints"),
    ("comb", "def_tackles"),
    ("prss", "def_pressures"),
    ("qbkd", "def_qb_hits"),
    ("m_tkl", "def_missed_tackles"),
    ("bltz", "def_blitzes"),
];

/// One player-season from the PFR-style defensive table. `stats` uses the
/// mapped `def_*` names.
#[derive(Debug, Clone, PartialEq)]
pub struct DefensiveRow {
    pub pfr_id: String,
    pub season: i32,
    pub player: Option<String>,
    pub pos: Option<String>,
    pub tm: Option<String>,
    pub g: Option<f64>,
    pub stats: StatLine,
}

/// Defensive rows plus the mapped `def_*` columns present in the file.
#[derive(Debug, Clone, Default)]
pub struct DefensiveTable {
    pub columns: BTreeSet<String>,
    pub rows: Vec<DefensiveRow>,
}

/// All input tables for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct Sources {
    pub weekly: WeeklyTable,
    pub contracts: Vec<ContractRow>,
    pub players: Vec<PlayerRef>,
    pub snap_counts: Option<Vec<SnapCountRow>>,
    pub defense: Option<DefensiveTable>,
}

// ---------------------------------------------------------------------------
// Cell helpers
// ---------------------------------------------------------------------------

const NULL_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "None", "null", "NULL"];

fn clean_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if NULL_TOKENS.contains(&trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn clean_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if NULL_TOKENS.contains(&trimmed) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn as_year(v: f64) -> Option<i32> {
    (v.fract() == 0.0 && (1900.0..=2200.0).contains(&v)).then_some(v as i32)
}

/// Column name → position lookup built from a CSV header row.
struct Header(HashMap<String, usize>);

impl Header {
    fn new(headers: &csv::StringRecord) -> Self {
        Header(
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.trim().to_string(), i))
                .collect(),
        )
    }

    fn has(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    fn text(&self, rec: &csv::StringRecord, name: &str) -> Option<String> {
        self.0.get(name).and_then(|&i| rec.get(i)).and_then(clean_text)
    }

    fn number(&self, rec: &csv::StringRecord, name: &str) -> Option<f64> {
        self.0.get(name).and_then(|&i| rec.get(i)).and_then(clean_number)
    }

    fn require(&self, table: &str, name: &str) -> Result<(), SourceError> {
        if self.has(name) {
            Ok(())
        } else {
            Err(SourceError::MissingColumn {
                table: table.into(),
                column: name.into(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

/// Fixed-schema rows read through serde. Text is kept raw and cleaned after
/// deserialization so "NA" style tokens become nulls.
#[derive(Debug, Deserialize)]
struct RawContract {
    #[serde(default)]
    gsis_id: Option<String>,
    #[serde(default)]
    player: Option<String>,
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    team: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    year_signed: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    years: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    value: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    apy: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    guaranteed: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    apy_cap_pct: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawPlayer {
    #[serde(default)]
    gsis_id: Option<String>,
    #[serde(default)]
    pfr_id: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    position: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSnapCount {
    #[serde(default)]
    pfr_player_id: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    season: Option<f64>,
    #[serde(default)]
    game_id: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    offense_snaps: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    defense_snaps: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    st_snaps: Option<f64>,
}

fn opt_text(raw: Option<String>) -> Option<String> {
    raw.as_deref().and_then(clean_text)
}

fn finite(raw: Option<f64>) -> Option<f64> {
    raw.filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Reader-based loaders (enable testing without temp files)
// ---------------------------------------------------------------------------

/// Identity and bookkeeping columns of the weekly table; every other
/// numeric column is treated as a stat.
const WEEKLY_ID_COLUMNS: &[&str] = &[
    "player_id",
    "player_name",
    "player_display_name",
    "position",
    "position_group",
    "recent_team",
    "season",
    "season_type",
    "week",
];

/// Text columns of the weekly exports, never scored even when a vintage
/// leaves them blank or numeric-looking.
const WEEKLY_TEXT_COLUMNS: &[&str] = &["headshot_url", "opponent_team"];

/// Per-column cell counts used to tell stat columns from text columns.
#[derive(Debug, Default, Clone, Copy)]
struct CellKinds {
    numeric: usize,
    text: usize,
}

pub fn load_weekly_from_reader<R: Read>(rdr: R) -> Result<WeeklyTable, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
    let header = Header::new(reader.headers()?);
    let stat_names: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty() && !WEEKLY_ID_COLUMNS.contains(&h.as_str()))
        .collect();

    let mut rows = Vec::new();
    let mut kinds: HashMap<String, CellKinds> = HashMap::new();
    for (line, result) in reader.records().enumerate() {
        let rec = match result {
            Ok(rec) => rec,
            Err(e) => {
                warn!("skipping malformed weekly row {}: {}", line + 2, e);
                continue;
            }
        };
        let Some(player_id) = header.text(&rec, "player_id") else {
            warn!("skipping weekly row {}: missing player_id", line + 2);
            continue;
        };
        let Some(season) = header.number(&rec, "season").and_then(as_year) else {
            warn!("skipping weekly row {} for '{}': missing season", line + 2, player_id);
            continue;
        };

        let mut stats = StatLine::new();
        for name in &stat_names {
            let kind = kinds.entry(name.clone()).or_default();
            match header.number(&rec, name) {
                Some(v) => {
                    kind.numeric += 1;
                    stats.insert(name.clone(), v);
                }
                None => {
                    if header.text(&rec, name).is_some() {
                        kind.text += 1;
                    }
                }
            }
        }

        rows.push(WeeklyRow {
            player_id,
            player_name: header
                .text(&rec, "player_display_name")
                .or_else(|| header.text(&rec, "player_name")),
            position: header.text(&rec, "position"),
            position_group: header.text(&rec, "position_group"),
            recent_team: header.text(&rec, "recent_team"),
            season,
            season_type: header
                .text(&rec, "season_type")
                .map(|s| SeasonType::parse(&s))
                .unwrap_or(SeasonType::Regular),
            week: header
                .number(&rec, "week")
                .filter(|w| *w >= 0.0)
                .map(|w| w as u32),
            stats,
        });
    }

    // Known text columns and columns mostly holding text are not stats.
    // Stray unparseable cells in a numeric column are read as null, and
    // numeric columns that are null in every row still count as present.
    let columns: BTreeSet<String> = stat_names
        .into_iter()
        .filter(|name| {
            let kind = kinds.get(name).copied().unwrap_or_default();
            if WEEKLY_TEXT_COLUMNS.contains(&name.as_str()) || kind.text > kind.numeric {
                return false;
            }
            if kind.text > 0 {
                warn!(
                    "weekly column '{}': {} non-numeric cell(s) read as null",
                    name, kind.text
                );
            }
            true
        })
        .collect();
    for row in &mut rows {
        row.stats.retain(|name, _| columns.contains(name));
    }

    Ok(WeeklyTable { columns, rows })
}

pub fn load_contracts_from_reader<R: Read>(rdr: R) -> Result<Vec<ContractRow>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut contracts = Vec::new();
    for result in reader.deserialize::<RawContract>() {
        match result {
            Ok(raw) => contracts.push(ContractRow {
                gsis_id: opt_text(raw.gsis_id),
                player: opt_text(raw.player),
                position: opt_text(raw.position),
                team: opt_text(raw.team),
                year_signed: finite(raw.year_signed).and_then(as_year),
                years: finite(raw.years).filter(|y| *y >= 0.0).map(|y| y.round() as u32),
                value: finite(raw.value),
                apy: finite(raw.apy),
                guaranteed: finite(raw.guaranteed),
                apy_cap_pct: finite(raw.apy_cap_pct),
            }),
            Err(e) => {
                warn!("skipping malformed contract row: {}", e);
            }
        }
    }
    Ok(contracts)
}

pub fn load_players_from_reader<R: Read>(rdr: R) -> Result<Vec<PlayerRef>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut players = Vec::new();
    for result in reader.deserialize::<RawPlayer>() {
        match result {
            Ok(raw) => players.push(PlayerRef {
                gsis_id: opt_text(raw.gsis_id),
                pfr_id: opt_text(raw.pfr_id),
                display_name: opt_text(raw.display_name),
                position: opt_text(raw.position),
            }),
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
            }
        }
    }
    Ok(players)
}

pub fn load_snap_counts_from_reader<R: Read>(rdr: R) -> Result<Vec<SnapCountRow>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut snaps = Vec::new();
    for result in reader.deserialize::<RawSnapCount>() {
        match result {
            Ok(raw) => {
                let Some(pfr_player_id) = opt_text(raw.pfr_player_id) else {
                    continue;
                };
                let Some(season) = finite(raw.season).and_then(as_year) else {
                    warn!("skipping snap row for '{}': missing season", pfr_player_id);
                    continue;
                };
                snaps.push(SnapCountRow {
                    pfr_player_id,
                    season,
                    game_id: opt_text(raw.game_id),
                    offense_snaps: finite(raw.offense_snaps),
                    defense_snaps: finite(raw.defense_snaps),
                    st_snaps: finite(raw.st_snaps),
                });
            }
            Err(e) => {
                warn!("skipping malformed snap count row: {}", e);
            }
        }
    }
    Ok(snaps)
}

pub fn load_defense_from_reader<R: Read>(rdr: R) -> Result<DefensiveTable, SourceError> {
    let csv_err = |source| SourceError::Csv {
        path: "<defense>".into(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
    let header = Header::new(reader.headers().map_err(csv_err)?);
    header.require("defense", "pfr_id")?;
    header.require("defense", "season")?;

    let columns: BTreeSet<String> = DEFENSIVE_COLUMN_MAP
        .iter()
        .filter(|(src, _)| header.has(src))
        .map(|(_, dst)| dst.to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let rec = match result {
            Ok(rec) => rec,
            Err(e) => {
                warn!("skipping malformed defensive row: {}", e);
                continue;
            }
        };
        let Some(pfr_id) = header.text(&rec, "pfr_id") else {
            continue;
        };
        let Some(season) = header.number(&rec, "season").and_then(as_year) else {
            warn!("skipping defensive row for '{}': missing season", pfr_id);
            continue;
        };
        let stats = DEFENSIVE_COLUMN_MAP
            .iter()
            .filter_map(|(src, dst)| header.number(&rec, src).map(|v| (dst.to_string(), v)))
            .collect();
        rows.push(DefensiveRow {
            pfr_id,
            season,
            player: header.text(&rec, "player"),
            pos: header.text(&rec, "pos"),
            tm: header.text(&rec, "tm"),
            g: header.number(&rec, "g"),
            stats,
        });
    }

    Ok(DefensiveTable { columns, rows })
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, SourceError> {
    std::fs::File::open(path).map_err(|e| SourceError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn with_path(path: &Path) -> impl FnOnce(csv::Error) -> SourceError + '_ {
    move |source| SourceError::Csv {
        path: path.display().to_string(),
        source,
    }
}

pub fn load_weekly(path: &Path) -> Result<WeeklyTable, SourceError> {
    load_weekly_from_reader(open(path)?).map_err(with_path(path))
}

pub fn load_contracts(path: &Path) -> Result<Vec<ContractRow>, SourceError> {
    load_contracts_from_reader(open(path)?).map_err(with_path(path))
}

pub fn load_players(path: &Path) -> Result<Vec<PlayerRef>, SourceError> {
    load_players_from_reader(open(path)?).map_err(with_path(path))
}

pub fn load_snap_counts(path: &Path) -> Result<Vec<SnapCountRow>, SourceError> {
    load_snap_counts_from_reader(open(path)?).map_err(with_path(path))
}

pub fn load_defense(path: &Path) -> Result<DefensiveTable, SourceError> {
    load_defense_from_reader(open(path)?).map_err(|e| match e {
        SourceError::Csv { source, .. } => SourceError::Csv {
            path: path.display().to_string(),
            source,
        },
        other => other,
    })
}

/// Load every input table named in `paths`.
///
/// Weekly stats, contracts and players are required. Snap counts and the
/// defensive table are optional: a configured-but-missing file is logged
/// and treated as an absent source.
pub fn load_sources(paths: &DataPaths) -> Result<Sources, SourceError> {
    let weekly = load_weekly(Path::new(&paths.weekly))?;
    info!(
        "Loaded {} weekly rows ({} stat columns) from {}",
        weekly.rows.len(),
        weekly.columns.len(),
        paths.weekly
    );
    let contracts = load_contracts(Path::new(&paths.contracts))?;
    info!("Loaded {} contracts from {}", contracts.len(), paths.contracts);
    let players = load_players(Path::new(&paths.players))?;
    info!("Loaded {} player reference rows from {}", players.len(), paths.players);

    let snap_counts = match paths.snap_counts.as_deref() {
        Some(p) if Path::new(p).exists() => {
            let rows = load_snap_counts(Path::new(p))?;
            info!("Loaded {} snap count rows from {}", rows.len(), p);
            Some(rows)
        }
        Some(p) => {
            warn!("snap count file {} not found; continuing without snap counts", p);
            None
        }
        None => None,
    };

    let defense = match paths.defense.as_deref() {
        Some(p) if Path::new(p).exists() => {
            let table = load_defense(Path::new(p))?;
            info!("Loaded {} defensive rows from {}", table.rows.len(), p);
            Some(table)
        }
        Some(p) => {
            warn!("defensive stats file {} not found; continuing without it", p);
            None
        }
        None => None,
    };

    Ok(Sources {
        weekly,
        contracts,
        players,
        snap_counts,
        defense,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
