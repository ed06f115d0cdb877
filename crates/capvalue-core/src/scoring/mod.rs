// Scoring engine: weight tables, within-group z-scores, composite values.

pub mod composite;
pub mod weights;
pub mod zscore;

pub use composite::{
    group_summary, score_players, top_bargains, top_overpaid, GroupSummary, ScoredPlayerSeason,
    ScoredTable, ScoringError,
};
pub use weights::{WeightError, WeightTable, BUILTIN_VERSION};
