// Contract normalization: one row of contract terms per player-season.
//
// A contract signed in `year_signed` for `years` seasons covers every season
// from signing through `year_signed + years - 1`. When deals overlap (an
// extension signed before the old deal expires), the most recently signed
// one governs the overlapping seasons.

use crate::config::{ContractConfig, SeasonWindow};
use crate::record::{ContractType, SeasonContract};
use crate::sources::ContractRow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Classify a deal as rookie-scale or veteran.
///
/// Rookie deals run at most `rookie_max_years` and pay under
/// `rookie_max_cap_pct` of the cap; anything longer is a veteran deal
/// regardless of pay.
pub fn classify_contract(years: u32, apy_cap_pct: f64, rules: &ContractConfig) -> ContractType {
    if years <= rules.rookie_max_years && apy_cap_pct < rules.rookie_max_cap_pct {
        ContractType::Rookie
    } else {
        ContractType::Veteran
    }
}

/// A usable contract: identified, dated and paid.
struct Candidate<'a> {
    index: usize,
    gsis_id: &'a str,
    year_signed: i32,
    years: u32,
    apy_cap_pct: f64,
    row: &'a ContractRow,
}

/// Precedence between two contracts covering the same season. `Greater`
/// means `a` wins: later signing, then higher cap share, then earlier input
/// row.
fn precedence(a: &Candidate, b: &Candidate) -> Ordering {
    a.year_signed
        .cmp(&b.year_signed)
        .then_with(|| {
            a.apy_cap_pct
                .partial_cmp(&b.apy_cap_pct)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| b.index.cmp(&a.index))
}

/// Expand contracts into one [`SeasonContract`] per covered season inside
/// `window`, keeping a single governing contract per `(gsis_id, season)`.
///
/// Rows without a player id or signing year, or without a positive
/// `apy_cap_pct`, are dropped. A null `years` counts as a one-year deal.
/// Output is sorted by `(gsis_id, season)`.
pub fn normalize_contracts(
    rows: &[ContractRow],
    window: &SeasonWindow,
    rules: &ContractConfig,
) -> Vec<SeasonContract> {
    let mut dropped = 0usize;
    let candidates: Vec<Candidate> = rows
        .iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let candidate = match (row.gsis_id.as_deref(), row.year_signed, row.apy_cap_pct) {
                (Some(gsis_id), Some(year_signed), Some(pct)) if pct > 0.0 => Some(Candidate {
                    index,
                    gsis_id,
                    year_signed,
                    years: row.years.unwrap_or(1),
                    apy_cap_pct: pct,
                    row,
                }),
                _ => None,
            };
            if candidate.is_none() {
                dropped += 1;
            }
            candidate
        })
        .collect();
    if dropped > 0 {
        debug!("dropped {} contracts without id, signing year or cap share", dropped);
    }

    let mut governing: BTreeMap<(&str, i32), &Candidate> = BTreeMap::new();
    for candidate in &candidates {
        if candidate.years == 0 {
            continue;
        }
        let end = candidate.year_signed + candidate.years as i32 - 1;
        for season in candidate.year_signed..=end {
            if !window.contains(season) {
                continue;
            }
            governing
                .entry((candidate.gsis_id, season))
                .and_modify(|current| {
                    if precedence(candidate, current) == Ordering::Greater {
                        *current = candidate;
                    }
                })
                .or_insert(candidate);
        }
    }

    governing
        .into_iter()
        .map(|((gsis_id, season), c)| SeasonContract {
            gsis_id: gsis_id.to_string(),
            season,
            player_name: c.row.player.clone(),
            position: c.row.position.clone(),
            team: c.row.team.clone(),
            apy_cap_pct: c.apy_cap_pct,
            apy: c.row.apy,
            value: c.row.value,
            guaranteed: c.row.guaranteed,
            years: c.years,
            year_signed: c.year_signed,
            contract_end_year: c.year_signed + c.years as i32 - 1,
            contract_type: classify_contract(c.years, c.apy_cap_pct, rules),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
