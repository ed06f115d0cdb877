// Position-specific stat weight tables.
//
// Each position group scores performance as a weighted blend of z-scored
// stats. Tables are versioned so a scored output can always be traced back
// to the exact weights that produced it.

use crate::aggregate::{EPA_SUFFIX, RATE_COLUMNS, SUM_COLUMNS};
use crate::positions::PositionGroup;
use crate::record::RECORD_COLUMNS;
use crate::scoring::composite::INVERTED_COLUMNS;
use crate::sources::DEFENSIVE_COLUMN_MAP;
use std::collections::BTreeMap;
use tracing::warn;

/// Version label of [`WeightTable::builtin`].
pub const BUILTIN_VERSION: &str = "2024.1";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightError {
    #[error("weight table version must not be empty")]
    MissingVersion,

    #[error("{group} weight table is empty")]
    EmptyGroup { group: PositionGroup },

    #[error("{group}.{stat} has invalid weight {weight}; weights must be finite and > 0")]
    InvalidWeight {
        group: PositionGroup,
        stat: String,
        weight: f64,
    },

    #[error("{group} weight table references no known stat ({stats})")]
    NoKnownStat { group: PositionGroup, stats: String },
}

/// Stat name → weight for one position group.
pub type GroupWeights = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    version: String,
    groups: BTreeMap<PositionGroup, GroupWeights>,
}

impl WeightTable {
    pub fn new(version: impl Into<String>, groups: BTreeMap<PositionGroup, GroupWeights>) -> Self {
        WeightTable {
            version: version.into(),
            groups,
        }
    }

    /// The reference weights. Every table sums to 1.0; punters and unknown
    /// positions have no table and are never scored.
    pub fn builtin() -> Self {
        let receiver = &[
            ("receiving_yards", 0.30),
            ("receptions", 0.20),
            ("receiving_tds", 0.30),
            ("catch_rate", 0.20),
        ];
        let tables: &[(PositionGroup, &[(&str, f64)])] = &[
            (
                PositionGroup::Quarterback,
                &[
                    ("passing_yards", 0.20),
                    ("passing_tds", 0.25),
                    ("int_rate_inv", 0.15),
                    ("passer_rating", 0.20),
                    ("completion_pct", 0.10),
                    ("rushing_yards", 0.10),
                ],
            ),
            (
                PositionGroup::RunningBack,
                &[
                    ("rushing_yards", 0.30),
                    ("rushing_tds", 0.25),
                    ("yards_per_carry", 0.15),
                    ("receiving_yards", 0.20),
                    ("fumbles_inv", 0.10),
                ],
            ),
            (PositionGroup::WideReceiver, receiver),
            (PositionGroup::TightEnd, receiver),
            (
                PositionGroup::OffensiveLine,
                &[("total_snaps", 0.70), ("games_played", 0.30)],
            ),
            (
                PositionGroup::DefensiveLine,
                &[
                    ("def_sacks", 0.35),
                    ("def_qb_hits", 0.25),
                    ("def_tackles", 0.25),
                    ("def_pressures", 0.15),
                ],
            ),
            (
                PositionGroup::Linebacker,
                &[
                    ("def_tackles", 0.25),
                    ("def_sacks", 0.20),
                    ("def_ints", 0.20),
                    ("def_pressures", 0.20),
                    ("total_snaps", 0.15),
                ],
            ),
            (
                PositionGroup::DefensiveBack,
                &[
                    ("def_ints", 0.30),
                    ("def_tackles", 0.25),
                    ("def_pressures", 0.15),
                    ("total_snaps", 0.30),
                ],
            ),
            (
                PositionGroup::Kicker,
                &[("fg_pct", 0.40), ("fg_made", 0.40), ("xp_pct", 0.20)],
            ),
        ];

        let groups = tables
            .iter()
            .map(|(group, stats)| {
                let weights = stats.iter().map(|(s, w)| (s.to_string(), *w)).collect();
                (*group, weights)
            })
            .collect();

        WeightTable::new(BUILTIN_VERSION, groups)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn for_group(&self, group: PositionGroup) -> Option<&GroupWeights> {
        self.groups.get(&group)
    }

    pub fn groups(&self) -> impl Iterator<Item = (PositionGroup, &GroupWeights)> {
        self.groups.iter().map(|(g, w)| (*g, w))
    }

    /// Check every table: non-empty, finite positive weights, and at least
    /// one stat the pipeline can produce. Unknown stats next to known ones
    /// are only warned about, since a later data vintage may supply them.
    pub fn validate(&self) -> Result<(), WeightError> {
        if self.version.trim().is_empty() {
            return Err(WeightError::MissingVersion);
        }
        for (&group, weights) in &self.groups {
            if weights.is_empty() {
                return Err(WeightError::EmptyGroup { group });
            }
            for (stat, &weight) in weights {
                if !weight.is_finite() || weight <= 0.0 {
                    return Err(WeightError::InvalidWeight {
                        group,
                        stat: stat.clone(),
                        weight,
                    });
                }
            }
            let unknown: Vec<&str> = weights
                .keys()
                .map(String::as_str)
                .filter(|s| !is_known_stat(s))
                .collect();
            if unknown.len() == weights.len() {
                return Err(WeightError::NoKnownStat {
                    group,
                    stats: unknown.join(", "),
                });
            }
            for stat in unknown {
                warn!("{} weight table references unknown stat '{}'", group, stat);
            }
        }
        Ok(())
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        WeightTable::builtin()
    }
}

/// Whether `name` is a column the pipeline can produce.
pub fn is_known_stat(name: &str) -> bool {
    SUM_COLUMNS.contains(&name)
        || RATE_COLUMNS.contains(&name)
        || RECORD_COLUMNS.contains(&name)
        || INVERTED_COLUMNS.contains(&name)
        || DEFENSIVE_COLUMN_MAP.iter().any(|(_, dst)| *dst == name)
        || (name.len() > EPA_SUFFIX.len() && name.ends_with(EPA_SUFFIX))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
