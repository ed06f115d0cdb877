// Configuration loading and parsing (config/capvalue.toml).

use crate::positions::PositionGroup;
use crate::scoring::weights::{WeightError, WeightTable};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the main config, under `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "capvalue.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("invalid weight table: {0}")]
    Weights(#[from] WeightError),

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub seasons: SeasonWindow,
    pub contracts: ContractConfig,
    pub merge: MergeConfig,
    pub scoring: ScoringConfig,
    pub weights: WeightTable,
    pub data_paths: DataPaths,
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            seasons: SeasonWindow::default(),
            contracts: ContractConfig::default(),
            merge: MergeConfig::default(),
            scoring: ScoringConfig::default(),
            weights: WeightTable::builtin(),
            data_paths: DataPaths::default(),
            output: OutputConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// capvalue.toml sections
// ---------------------------------------------------------------------------

/// Raw deserialization target for the whole capvalue.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    seasons: SeasonWindow,
    #[serde(default)]
    contracts: ContractConfig,
    #[serde(default)]
    merge: MergeConfig,
    #[serde(default)]
    scoring: ScoringConfig,
    #[serde(default)]
    weights: Option<WeightsSection>,
    data_paths: DataPaths,
    #[serde(default)]
    output: OutputConfig,
}

/// Inclusive range of seasons under analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SeasonWindow {
    pub first: i32,
    pub last: i32,
}

impl SeasonWindow {
    pub fn contains(&self, season: i32) -> bool {
        (self.first..=self.last).contains(&season)
    }
}

impl Default for SeasonWindow {
    fn default() -> Self {
        SeasonWindow {
            first: 2015,
            last: 2024,
        }
    }
}

/// Rookie-deal classification rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Contracts longer than this are always veteran deals.
    pub rookie_max_years: u32,
    /// Rookie deals pay strictly less than this share of the cap.
    pub rookie_max_cap_pct: f64,
}

impl Default for ContractConfig {
    fn default() -> Self {
        ContractConfig {
            rookie_max_years: 4,
            rookie_max_cap_pct: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Minimum season snaps for a player-season to enter analysis.
    pub min_snaps: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig { min_snaps: 100.0 }
    }
}

/// Population-quality and flagging thresholds for the composite scorer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Position groups with fewer rows than this are not scored.
    pub min_group_size: usize,
    /// Stats with fewer non-null values than this z-score to 0.
    pub min_zscore_sample: usize,
    /// `value_score` strictly above this flags a bargain.
    pub bargain_threshold: f64,
    /// `value_score` strictly below this flags an overpay.
    pub overpaid_threshold: f64,
    /// Score position groups on the rayon pool instead of sequentially.
    pub parallel: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            min_group_size: 5,
            min_zscore_sample: 3,
            bargain_threshold: 2.0,
            overpaid_threshold: -2.0,
            parallel: true,
        }
    }
}

/// `[weights]` section: a version label plus one table per position group.
#[derive(Debug, Clone, Deserialize)]
struct WeightsSection {
    version: String,
    #[serde(flatten)]
    groups: BTreeMap<String, BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataPaths {
    pub weekly: String,
    pub contracts: String,
    pub players: String,
    #[serde(default)]
    pub snap_counts: Option<String>,
    #[serde(default)]
    pub defense: Option<String>,
}

impl Default for DataPaths {
    fn default() -> Self {
        DataPaths {
            weekly: "data/weekly_stats.csv".into(),
            contracts: "data/contracts.csv".into(),
            players: "data/players.csv".into(),
            snap_counts: Some("data/snap_counts.csv".into()),
            defense: Some("data/pfr_defense.csv".into()),
        }
    }
}

impl DataPaths {
    /// Join relative paths onto `base_dir`; absolute paths are kept.
    pub fn resolve_against(&self, base_dir: &Path) -> DataPaths {
        let join = |p: &str| resolve_path(base_dir, p);
        DataPaths {
            weekly: join(&self.weekly),
            contracts: join(&self.contracts),
            players: join(&self.players),
            snap_counts: self.snap_counts.as_deref().map(join),
            defense: self.defense.as_deref().map(join),
        }
    }
}

/// `path` relative to `base_dir` unless it is already absolute.
pub fn resolve_path(base_dir: &Path, path: &str) -> String {
    let p = Path::new(path);
    if p.is_absolute() {
        path.to_string()
    } else {
        base_dir.join(p).display().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
    /// Optional JSON per-group summary written next to the CSV.
    pub summary_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            path: "output/value_scores.csv".into(),
            summary_path: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Parse and validate a config from TOML text. `origin` is only used for
/// error messages.
pub fn parse_config(text: &str, origin: &Path) -> Result<Config, ConfigError> {
    let file: ConfigFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: origin.to_path_buf(),
        source: e,
    })?;

    let weights = match file.weights {
        Some(section) => weights_from_section(section)?,
        None => WeightTable::builtin(),
    };

    let config = Config {
        seasons: file.seasons,
        contracts: file.contracts,
        merge: file.merge,
        scoring: file.scoring,
        weights,
        data_paths: file.data_paths,
        output: file.output,
    };

    validate(&config)?;

    Ok(config)
}

fn weights_from_section(section: WeightsSection) -> Result<WeightTable, ConfigError> {
    let mut groups = BTreeMap::new();
    for (label, stats) in section.groups {
        let group: PositionGroup =
            label
                .parse()
                .map_err(|message: String| ConfigError::ValidationError {
                    field: format!("weights.{label}"),
                    message,
                })?;
        groups.insert(group, stats);
    }
    Ok(WeightTable::new(section.version, groups))
}

/// Load and validate a config file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let text = read_file(path)?;
    parse_config(&text, path)
}

/// Load and validate `config/capvalue.toml` relative to `base_dir`.
///
/// This does not copy defaults; see [`load_config`].
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    load_config_file(&base_dir.join("config").join(CONFIG_FILE))
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or pass --config",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to `base_dir`, copying
/// default config files first.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let seasons = &config.seasons;
    if seasons.first > seasons.last {
        return Err(invalid(
            "seasons.first",
            format!("must not exceed seasons.last ({} > {})", seasons.first, seasons.last),
        ));
    }

    let c = &config.contracts;
    if c.rookie_max_years == 0 {
        return Err(invalid("contracts.rookie_max_years", "must be > 0"));
    }
    if !(c.rookie_max_cap_pct > 0.0 && c.rookie_max_cap_pct <= 1.0) {
        return Err(invalid(
            "contracts.rookie_max_cap_pct",
            format!("must be in (0, 1], got {}", c.rookie_max_cap_pct),
        ));
    }

    let min_snaps = config.merge.min_snaps;
    if !min_snaps.is_finite() || min_snaps < 0.0 {
        return Err(invalid("merge.min_snaps", format!("must be >= 0, got {min_snaps}")));
    }

    let s = &config.scoring;
    if s.min_group_size == 0 {
        return Err(invalid("scoring.min_group_size", "must be > 0"));
    }
    // The sample standard deviation needs at least two values.
    if s.min_zscore_sample < 2 {
        return Err(invalid(
            "scoring.min_zscore_sample",
            format!("must be >= 2, got {}", s.min_zscore_sample),
        ));
    }
    if !(s.bargain_threshold.is_finite() && s.overpaid_threshold.is_finite()) {
        return Err(invalid("scoring.bargain_threshold", "thresholds must be finite"));
    }
    if s.overpaid_threshold >= s.bargain_threshold {
        return Err(invalid(
            "scoring.overpaid_threshold",
            format!(
                "must be below scoring.bargain_threshold ({} >= {})",
                s.overpaid_threshold, s.bargain_threshold
            ),
        ));
    }

    config.weights.validate()?;

    let paths = &config.data_paths;
    let path_fields: &[(&str, &str)] = &[
        ("data_paths.weekly", &paths.weekly),
        ("data_paths.contracts", &paths.contracts),
        ("data_paths.players", &paths.players),
        ("output.path", &config.output.path),
    ];
    for (name, val) in path_fields {
        if val.trim().is_empty() {
            return Err(invalid(name, "must not be empty"));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
