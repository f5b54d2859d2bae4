use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::normalize::NormalizedPlayer;
use crate::taxonomy::Archetype;

pub const DEFAULT_MIN_MINUTES: f64 = 600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchMode {
    /// Angular similarity of identity-metric z-scores.
    Similar,
    /// Mean identity-metric percentile.
    Upgrade,
}

impl SearchMode {
    pub fn score_column(self) -> &'static str {
        match self {
            SearchMode::Similar => "similarity_score",
            SearchMode::Upgrade => "upgrade_score",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Similar => f.write_str("Find Similar Players"),
            SearchMode::Upgrade => f.write_str("Find Potential Upgrades"),
        }
    }
}

impl FromStr for SearchMode {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "similar" | "similarity" | "find-similar" => Ok(SearchMode::Similar),
            "upgrade" | "upgrades" | "find-upgrades" => Ok(SearchMode::Upgrade),
            other => Err(anyhow!("unknown search mode '{other}' (expected similar|upgrade)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchQuery {
    pub mode: SearchMode,
    pub min_minutes: f64,
    /// Stand-in for a z-score the candidate or target does not have.
    pub missing_value: f64,
}

impl Default for MatchQuery {
    fn default() -> Self {
        Self {
            mode: SearchMode::Similar,
            min_minutes: DEFAULT_MIN_MINUTES,
            missing_value: 0.0,
        }
    }
}

impl MatchQuery {
    pub fn with_mode(mode: SearchMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub player: NormalizedPlayer,
    /// Cosine similarity of weighted z-score vectors, times 100.
    pub similarity_score: f64,
    /// Mean identity percentile; only set by upgrade searches.
    pub upgrade_score: Option<f64>,
}

impl MatchResult {
    pub fn score(&self, mode: SearchMode) -> f64 {
        match mode {
            SearchMode::Similar => self.similarity_score,
            SearchMode::Upgrade => self.upgrade_score.unwrap_or(0.0),
        }
    }
}

/// Rank `pool` against `target` on the archetype's identity metrics.
///
/// Candidates need `minutes >= min_minutes`, a different `player_id` (other
/// seasons of the same player are excluded too) and the target's position
/// group. The full scored table is returned, best first; ties keep pool order.
pub fn find_matches(
    target: &NormalizedPlayer,
    pool: &[NormalizedPlayer],
    archetype: &Archetype,
    query: &MatchQuery,
) -> Vec<MatchResult> {
    let Some(target_group) = target.position_group.as_deref() else {
        return Vec::new();
    };

    let candidates: Vec<&NormalizedPlayer> = pool
        .iter()
        .filter(|c| c.record.minutes >= query.min_minutes)
        .filter(|c| c.record.player_id != target.record.player_id)
        .filter(|c| c.position_group.as_deref() == Some(target_group))
        .collect();
    if candidates.is_empty() {
        debug!(player_id = target.record.player_id, "no candidates survived filtering");
        return Vec::new();
    }

    let target_vec = weighted_z_vector(target, archetype, query.missing_value);
    let mut results: Vec<MatchResult> = candidates
        .into_iter()
        .map(|candidate| {
            let candidate_vec = weighted_z_vector(candidate, archetype, query.missing_value);
            let similarity_score = cosine_similarity(&target_vec, &candidate_vec) * 100.0;
            let upgrade_score = match query.mode {
                SearchMode::Upgrade => Some(upgrade_score(candidate, archetype)),
                SearchMode::Similar => None,
            };
            MatchResult {
                player: candidate.clone(),
                similarity_score,
                upgrade_score,
            }
        })
        .collect();

    let mode = query.mode;
    results.sort_by(|a, b| b.score(mode).total_cmp(&a.score(mode)));
    results
}

/// Identity z-scores with the archetype's key weight applied to every coordinate.
pub fn weighted_z_vector(player: &NormalizedPlayer, archetype: &Archetype, missing: f64) -> Vec<f64> {
    archetype
        .identity_metrics
        .iter()
        .map(|m| player.z(m).filter(|v| v.is_finite()).unwrap_or(missing) * archetype.key_weight)
        .collect()
}

/// Mean of the identity percentiles the candidate has; 0 when it has none or
/// its group was never ranked.
pub fn upgrade_score(player: &NormalizedPlayer, archetype: &Archetype) -> f64 {
    if !player.ranked {
        return 0.0;
    }
    let values: Vec<f64> = archetype
        .identity_metrics
        .iter()
        .filter_map(|m| player.pct(m))
        .collect();
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Cosine of the angle between `a` and `b`; 0 when either has zero length.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
