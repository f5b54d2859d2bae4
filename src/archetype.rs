use serde::{Deserialize, Serialize};

use crate::normalize::NormalizedPlayer;
use crate::taxonomy::{Archetype, Taxonomy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Affinity {
    pub archetype: String,
    pub score: f64,
    /// Identity metrics that had a percentile for the target.
    pub metrics_used: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// `None` means unclassifiable: no archetype could be scored.
    pub best: Option<String>,
    /// Every archetype, highest affinity first, catalog order among ties.
    pub affinities: Vec<Affinity>,
}

impl Classification {
    pub fn unclassifiable() -> Self {
        Self {
            best: None,
            affinities: Vec::new(),
        }
    }

    pub fn is_classified(&self) -> bool {
        self.best.is_some()
    }

    pub fn score_of(&self, archetype: &str) -> Option<f64> {
        self.affinities
            .iter()
            .find(|a| a.archetype == archetype)
            .map(|a| a.score)
    }
}

/// Mean identity-metric percentile of `target` and how many metrics fed it.
/// `(0.0, 0)` when no identity metric has a percentile or the target's group
/// was too small to rank.
pub fn affinity_score(target: &NormalizedPlayer, archetype: &Archetype) -> (f64, usize) {
    if !target.ranked {
        return (0.0, 0);
    }
    let values: Vec<f64> = archetype
        .identity_metrics
        .iter()
        .filter_map(|m| target.pct(m))
        .filter(|v| v.is_finite())
        .collect();
    if values.is_empty() {
        return (0.0, 0);
    }
    (values.iter().sum::<f64>() / values.len() as f64, values.len())
}

/// Score `target` against each archetype and pick the best one.
///
/// Archetypes with no usable identity metric score 0 and are listed, but can
/// never win. The first-declared archetype wins ties.
pub fn detect(target: &NormalizedPlayer, archetypes: &[Archetype]) -> Classification {
    let mut affinities = Vec::with_capacity(archetypes.len());
    let mut best: Option<(usize, f64)> = None;

    for (idx, archetype) in archetypes.iter().enumerate() {
        let (score, metrics_used) = affinity_score(target, archetype);
        if metrics_used > 0 && best.is_none_or(|(_, top)| score > top) {
            best = Some((idx, score));
        }
        affinities.push(Affinity {
            archetype: archetype.name.clone(),
            score,
            metrics_used,
        });
    }

    // stable: equal scores keep catalog order
    affinities.sort_by(|a, b| b.score.total_cmp(&a.score));

    Classification {
        best: best.map(|(idx, _)| archetypes[idx].name.clone()),
        affinities,
    }
}

/// [`detect`] against the catalog of the target's own position group.
pub fn classify(target: &NormalizedPlayer, taxonomy: &Taxonomy) -> Classification {
    let Some(group) = target
        .position_group
        .as_deref()
        .and_then(|name| taxonomy.group(name))
    else {
        return Classification::unclassifiable();
    };
    detect(target, &group.archetypes)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::record::PlayerSeasonRecord;

    fn archetype(name: &str, metrics: &[&str]) -> Archetype {
        Archetype {
            name: name.to_string(),
            description: String::new(),
            identity_metrics: metrics.iter().map(|m| m.to_string()).collect(),
            key_weight: 1.5,
        }
    }

    fn player(pcts: &[(&str, f64)]) -> NormalizedPlayer {
        NormalizedPlayer {
            record: PlayerSeasonRecord::default(),
            age: None,
            position_group: Some("Striker".into()),
            ranked: true,
            percentiles: pcts.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            zscores: BTreeMap::new(),
        }
    }

    #[test]
    fn best_is_highest_mean_percentile() {
        let target = player(&[("a", 90.0), ("b", 70.0), ("c", 20.0)]);
        let catalog = vec![archetype("Low", &["c"]), archetype("High", &["a", "b"])];
        let out = detect(&target, &catalog);
        assert_eq!(out.best.as_deref(), Some("High"));
        assert_eq!(out.affinities[0].archetype, "High");
        assert_eq!(out.affinities[0].score, 80.0);
        assert_eq!(out.affinities[1].score, 20.0);
    }

    #[test]
    fn unavailable_metrics_are_skipped_in_the_mean() {
        let target = player(&[("a", 60.0)]);
        let out = detect(&target, &[archetype("Partial", &["a", "missing"])]);
        assert_eq!(out.affinities[0].score, 60.0);
        assert_eq!(out.affinities[0].metrics_used, 1);
    }

    #[test]
    fn ties_go_to_first_declared() {
        let target = player(&[("a", 50.0), ("b", 50.0)]);
        let catalog = vec![archetype("First", &["a"]), archetype("Second", &["b"])];
        let out = detect(&target, &catalog);
        assert_eq!(out.best.as_deref(), Some("First"));
        assert_eq!(out.affinities[0].archetype, "First");
    }

    #[test]
    fn nothing_scorable_is_unclassifiable() {
        let target = player(&[]);
        let catalog = vec![archetype("A", &["x"]), archetype("B", &["y"])];
        let out = detect(&target, &catalog);
        assert!(!out.is_classified());
        assert_eq!(out.affinities.len(), 2);
        assert!(out.affinities.iter().all(|a| a.score == 0.0));
    }

    #[test]
    fn unranked_group_is_unclassifiable() {
        let mut target = player(&[("a", 0.0), ("b", 0.0)]);
        target.ranked = false;
        let out = detect(&target, &[archetype("A", &["a"]), archetype("B", &["b"])]);
        assert!(!out.is_classified());
        assert!(out.affinities.iter().all(|a| a.metrics_used == 0));
    }

    #[test]
    fn repeated_detection_is_identical() {
        let target = player(&[("a", 40.0), ("b", 40.0), ("c", 75.0)]);
        let catalog = vec![archetype("A", &["a"]), archetype("B", &["b"]), archetype("C", &["a", "c"])];
        let first = detect(&target, &catalog);
        let second = detect(&target, &catalog);
        assert_eq!(first, second);
        assert_eq!(first.best.as_deref(), Some("C"));
    }

    #[test]
    fn scorable_zero_beats_unscorable() {
        let target = player(&[("b", 0.0)]);
        let catalog = vec![archetype("NoData", &["x"]), archetype("Zero", &["b"])];
        assert_eq!(detect(&target, &catalog).best.as_deref(), Some("Zero"));
    }
}
