// Position group classification.
//
// Raw roster labels are free text ("OLB", " fs ", "EDGE", ...). Analysis runs
// over a closed set of groups, so every label maps to exactly one group and
// anything unrecognized lands in `Unknown`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Analysis position groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PositionGroup {
    #[serde(rename = "QB")]
    Quarterback,
    #[serde(rename = "RB")]
    RunningBack,
    #[serde(rename = "WR")]
    WideReceiver,
    #[serde(rename = "TE")]
    TightEnd,
    #[serde(rename = "OL")]
    OffensiveLine,
    #[serde(rename = "DL")]
    DefensiveLine,
    #[serde(rename = "LB")]
    Linebacker,
    #[serde(rename = "DB")]
    DefensiveBack,
    #[serde(rename = "K")]
    Kicker,
    #[serde(rename = "P")]
    Punter,
    #[serde(rename = "UNK")]
    Unknown,
}

impl PositionGroup {
    /// Every group, in report order.
    pub const ALL: [PositionGroup; 11] = [
        PositionGroup::Quarterback,
        PositionGroup::RunningBack,
        PositionGroup::WideReceiver,
        PositionGroup::TightEnd,
        PositionGroup::OffensiveLine,
        PositionGroup::DefensiveLine,
        PositionGroup::Linebacker,
        PositionGroup::DefensiveBack,
        PositionGroup::Kicker,
        PositionGroup::Punter,
        PositionGroup::Unknown,
    ];

    /// Map a raw position label to its analysis group.
    ///
    /// Input is trimmed and uppercased before lookup. `None`, empty and
    /// unmapped labels all yield `Unknown`; this never fails.
    pub fn classify(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return PositionGroup::Unknown;
        };
        match raw.trim().to_uppercase().as_str() {
            "QB" => PositionGroup::Quarterback,
            "RB" | "FB" | "HB" => PositionGroup::RunningBack,
            "WR" => PositionGroup::WideReceiver,
            "TE" => PositionGroup::TightEnd,
            "T" | "OT" | "G" | "OG" | "C" | "OL" | "LS" => PositionGroup::OffensiveLine,
            "DE" | "DT" | "NT" | "DL" | "EDGE" => PositionGroup::DefensiveLine,
            "LB" | "ILB" | "OLB" | "MLB" => PositionGroup::Linebacker,
            "CB" | "S" | "SS" | "FS" | "DB" => PositionGroup::DefensiveBack,
            "K" | "PK" => PositionGroup::Kicker,
            "P" => PositionGroup::Punter,
            _ => PositionGroup::Unknown,
        }
    }

    /// Short label used in tables, config keys and CSV output.
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionGroup::Quarterback => "QB",
            PositionGroup::RunningBack => "RB",
            PositionGroup::WideReceiver => "WR",
            PositionGroup::TightEnd => "TE",
            PositionGroup::OffensiveLine => "OL",
            PositionGroup::DefensiveLine => "DL",
            PositionGroup::Linebacker => "LB",
            PositionGroup::DefensiveBack => "DB",
            PositionGroup::Kicker => "K",
            PositionGroup::Punter => "P",
            PositionGroup::Unknown => "UNK",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, PositionGroup::Unknown)
    }
}

impl fmt::Display for PositionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a group label exactly (`"WR"`, `"unk"`), not a raw roster
/// position. Use [`PositionGroup::classify`] for roster labels.
impl FromStr for PositionGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        PositionGroup::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == upper)
            .ok_or_else(|| format!("unrecognized position group: {s:?}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
