use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::metrics::Polarity;
use crate::record::{NameLookup, PlayerSeasonRecord, find_player_by_name};
use crate::taxonomy::Taxonomy;

pub const DEFAULT_MIN_GROUP_SIZE: usize = 5;
const STD_EPSILON: f64 = 1e-12;

/// What a record without a value for a present metric contributes to ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MissingPolicy {
    /// Rank the record as if it had this value.
    Substitute(f64),
    /// Leave the record out of the ranking population; it keeps default derived values.
    Exclude,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeOptions {
    pub min_group_size: usize,
    pub missing: MissingPolicy,
    pub reference_date: NaiveDate,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            min_group_size: DEFAULT_MIN_GROUP_SIZE,
            missing: MissingPolicy::Substitute(0.0),
            reference_date: Local::now().date_naive(),
        }
    }
}

/// A record plus everything the normalizer derives for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPlayer {
    pub record: PlayerSeasonRecord,
    pub age: Option<u32>,
    pub position_group: Option<String>,
    /// Whether the player's group was large enough to be ranked. Players of
    /// skipped groups carry default percentiles that must not drive scoring.
    #[serde(default)]
    pub ranked: bool,
    pub percentiles: BTreeMap<String, f64>,
    pub zscores: BTreeMap<String, f64>,
}

impl NormalizedPlayer {
    pub fn pct(&self, metric: &str) -> Option<f64> {
        self.percentiles.get(metric).copied()
    }

    pub fn z(&self, metric: &str) -> Option<f64> {
        self.zscores.get(metric).copied()
    }

    /// Percentile in [0, 100] for rendering; 0 when the metric was never computed.
    pub fn percentile(&self, metric: &str) -> f64 {
        self.pct(metric).unwrap_or(0.0)
    }

    pub fn player_id(&self) -> u64 {
        self.record.player_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPool {
    players: Vec<NormalizedPlayer>,
    available: BTreeSet<String>,
    taxonomy_fingerprint: String,
}

impl NormalizedPool {
    pub fn players(&self) -> &[NormalizedPlayer] {
        &self.players
    }

    pub fn get(&self, idx: usize) -> Option<&NormalizedPlayer> {
        self.players.get(idx)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_available(&self, metric: &str) -> bool {
        self.available.contains(metric)
    }

    pub fn taxonomy_fingerprint(&self) -> &str {
        &self.taxonomy_fingerprint
    }

    pub fn in_group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a NormalizedPlayer> + 'a {
        self.players
            .iter()
            .filter(move |p| p.position_group.as_deref() == Some(group))
    }

    pub fn find_by_name(&self, name: &str) -> NameLookup {
        find_player_by_name(self.players.iter().map(|p| &p.record), name)
    }
}

/// Position-relative percentile and z-score computation over a whole pool.
#[derive(Debug, Clone)]
pub struct Normalizer {
    taxonomy: Arc<Taxonomy>,
    options: NormalizeOptions,
}

impl Normalizer {
    pub fn new(taxonomy: Arc<Taxonomy>, options: NormalizeOptions) -> Self {
        Self { taxonomy, options }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    /// Full recompute. `records` is left untouched; derived fields live on copies.
    pub fn normalize(&self, records: &[PlayerSeasonRecord]) -> NormalizedPool {
        let mut rows: Vec<PlayerSeasonRecord> = records.to_vec();
        self.add_composites(&mut rows);

        let schema: BTreeSet<&str> = rows
            .iter()
            .flat_map(|r| r.stats.keys().map(String::as_str))
            .collect();
        let available: Vec<String> = self
            .taxonomy
            .tracked_metrics()
            .iter()
            .filter(|m| schema.contains(m.as_str()))
            .cloned()
            .collect();

        let groups: Vec<Option<String>> = rows
            .iter()
            .map(|r| {
                r.primary_position
                    .as_deref()
                    .and_then(|label| self.taxonomy.group_of(label))
                    .map(str::to_string)
            })
            .collect();

        let mut members: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (idx, group) in groups.iter().enumerate() {
            if let Some(group) = group {
                members.entry(group.as_str()).or_default().push(idx);
            }
        }

        let derived: Vec<(String, Vec<(f64, f64)>)> = available
            .par_iter()
            .map(|metric| {
                let columns = self.derive_metric(metric, &rows, &members);
                (metric.clone(), columns)
            })
            .collect();

        let group_count = members.len();
        let ranked_groups: BTreeSet<String> = members
            .iter()
            .filter(|(_, idxs)| idxs.len() >= self.options.min_group_size)
            .map(|(group, _)| group.to_string())
            .collect();

        let mut players: Vec<NormalizedPlayer> = rows
            .into_iter()
            .zip(groups)
            .map(|(record, position_group)| NormalizedPlayer {
                age: record.age_on(self.options.reference_date),
                ranked: position_group
                    .as_ref()
                    .is_some_and(|g| ranked_groups.contains(g)),
                position_group,
                record,
                percentiles: BTreeMap::new(),
                zscores: BTreeMap::new(),
            })
            .collect();

        for (metric, columns) in derived {
            for (player, (pct, z)) in players.iter_mut().zip(columns) {
                player.percentiles.insert(metric.clone(), pct);
                player.zscores.insert(metric.clone(), z);
            }
        }

        let unmapped = players.iter().filter(|p| p.position_group.is_none()).count();
        info!(
            records = players.len(),
            groups = group_count,
            ranked_groups = ranked_groups.len(),
            metrics = available.len(),
            unmapped,
            "normalized player pool"
        );

        NormalizedPool {
            players,
            available: available.into_iter().collect(),
            taxonomy_fingerprint: self.taxonomy.fingerprint().to_string(),
        }
    }

    fn add_composites(&self, rows: &mut [PlayerSeasonRecord]) {
        for composite in self.taxonomy.composites() {
            let sources_present = composite
                .sum_of
                .iter()
                .all(|src| rows.iter().any(|r| r.stats.contains_key(src)));
            if !sources_present {
                debug!(composite = %composite.name, "composite sources absent from schema");
                continue;
            }
            for row in rows.iter_mut() {
                if let Some(v) = composite.evaluate(|src| row.stat(src)) {
                    row.stats.insert(composite.name.clone(), v);
                }
            }
        }
    }

    fn derive_metric(
        &self,
        metric: &str,
        rows: &[PlayerSeasonRecord],
        members: &BTreeMap<&str, Vec<usize>>,
    ) -> Vec<(f64, f64)> {
        let polarity = self
            .taxonomy
            .metric(metric)
            .map(|def| def.polarity())
            .unwrap_or(Polarity::HigherBetter);
        let mut out = vec![(0.0, 0.0); rows.len()];

        for (group, idxs) in members {
            if idxs.len() < self.options.min_group_size {
                debug!(metric, group, size = idxs.len(), "group below minimum size; skipped");
                continue;
            }
            let population: Vec<(usize, f64)> = idxs
                .iter()
                .filter_map(|&idx| {
                    match (rows[idx].stat(metric), self.options.missing) {
                        (Some(v), _) => Some((idx, v)),
                        (None, MissingPolicy::Substitute(fill)) => Some((idx, fill)),
                        (None, MissingPolicy::Exclude) => None,
                    }
                })
                .collect();
            if population.is_empty() {
                continue;
            }

            let values: Vec<f64> = population.iter().map(|(_, v)| *v).collect();
            let pcts = percentile_ranks(&values, polarity);
            let zs = zscores(&values);
            for (k, (idx, _)) in population.iter().enumerate() {
                out[*idx] = (pcts[k], zs[k]);
            }
        }
        out
    }
}

/// Fractional ranking scaled to [0, 100]; ties share the average rank of their span.
/// Lower-is-better metrics are inverted so 100 always means "best".
pub fn percentile_ranks(values: &[f64], polarity: Polarity) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|a, b| values[*a].total_cmp(&values[*b]));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // 1-based ranks start+1 ..= end
        let avg = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg;
        }
        start = end;
    }

    ranks
        .into_iter()
        .map(|rank| {
            let frac = rank / n as f64;
            match polarity {
                Polarity::HigherBetter => frac * 100.0,
                Polarity::LowerBetter => (1.0 - frac) * 100.0,
            }
        })
        .collect()
}

/// Standard scores against the population mean and standard deviation (N denominator).
/// A constant population scores 0 everywhere.
pub fn zscores(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    if std < STD_EPSILON {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mean) / std).collect()
}
