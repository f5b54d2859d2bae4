use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::archetype::{Classification, classify};
use crate::matching::{MatchQuery, MatchResult, SearchMode, find_matches};
use crate::normalize::{NormalizedPlayer, NormalizedPool};
use crate::radar::{RadarChart, radar_charts_for_group};
use crate::taxonomy::{Archetype, Taxonomy};

/// Classification plus the archetype-driven search for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoutingReport {
    pub target: NormalizedPlayer,
    pub classification: Classification,
    pub archetype: Option<Archetype>,
    pub mode: SearchMode,
    /// Best first, truncated for display.
    pub matches: Vec<MatchResult>,
    /// Candidates that survived filtering before truncation.
    pub total_candidates: usize,
}

impl ScoutingReport {
    pub fn archetype_description(&self) -> Option<&str> {
        self.archetype.as_ref().map(|a| a.description.as_str())
    }

    /// Target first, then up to `extra` matches, ready for radar overlays.
    pub fn radar_players(&self, extra: usize) -> Vec<&NormalizedPlayer> {
        std::iter::once(&self.target)
            .chain(self.matches.iter().take(extra).map(|m| &m.player))
            .collect()
    }

    pub fn radars(&self, taxonomy: &Taxonomy, extra: usize) -> Vec<RadarChart> {
        let Some(group) = self.target.position_group.as_deref() else {
            return Vec::new();
        };
        radar_charts_for_group(taxonomy, group, &self.radar_players(extra)).unwrap_or_default()
    }
}

pub fn analyze(
    pool: &NormalizedPool,
    taxonomy: &Taxonomy,
    target_idx: usize,
    query: &MatchQuery,
    top_n: usize,
) -> Result<ScoutingReport> {
    if pool.taxonomy_fingerprint() != taxonomy.fingerprint() {
        return Err(anyhow!(
            "normalized pool was computed under a different taxonomy; normalize again"
        ));
    }
    let target = pool
        .get(target_idx)
        .ok_or_else(|| anyhow!("no player at pool index {target_idx}"))?;

    let classification = classify(target, taxonomy);
    let archetype = match (&classification.best, target.position_group.as_deref()) {
        (Some(name), Some(group)) => taxonomy.archetype(group, name).cloned(),
        _ => None,
    };

    let mut matches = match (&archetype, target.position_group.as_deref()) {
        (Some(archetype), Some(group)) => {
            let Some(config) = taxonomy.group(group) else {
                return Err(anyhow!("position group '{group}' missing from taxonomy"));
            };
            let position_pool: Vec<NormalizedPlayer> = pool
                .players()
                .iter()
                .filter(|p| {
                    p.record
                        .primary_position
                        .as_deref()
                        .is_some_and(|label| config.contains_position(label))
                })
                .cloned()
                .collect();
            find_matches(target, &position_pool, archetype, query)
        }
        _ => Vec::new(),
    };

    let total_candidates = matches.len();
    matches.truncate(top_n);
    info!(
        player = %target.record.player_name,
        archetype = classification.best.as_deref().unwrap_or("unclassifiable"),
        mode = ?query.mode,
        candidates = total_candidates,
        "scouting analysis complete"
    );

    Ok(ScoutingReport {
        target: target.clone(),
        classification,
        archetype,
        mode: query.mode,
        matches,
        total_candidates,
    })
}
