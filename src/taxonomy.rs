//! Position taxonomy: which raw position labels form a group, and the
//! archetype and radar catalogs each group carries.
//!
//! A [`Taxonomy`] is loaded once, validated, and then shared read-only
//! (usually behind an `Arc`) by the normalizer, classifier and match engine.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::metrics::{CompositeDef, MetricDef};

const BUILTIN_TAXONOMY: &str = include_str!("../assets/taxonomy.json");
/// Newest taxonomy document layout this build understands.
pub const TAXONOMY_VERSION: u32 = 1;

/// Configuration mistakes detected while loading a taxonomy.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("taxonomy json is invalid: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("position label '{label}' is mapped to both '{first}' and '{second}'")]
    OverlappingPosition {
        label: String,
        first: String,
        second: String,
    },

    #[error("group '{group}' {context} references undeclared metric '{metric}'")]
    UnknownMetric {
        group: String,
        context: String,
        metric: String,
    },

    #[error("archetype '{archetype}' in group '{group}' has no identity metrics")]
    EmptyArchetype { group: String, archetype: String },

    #[error("archetype '{archetype}' in group '{group}' has key weight {weight}; expected a finite value > 1.0")]
    InvalidKeyWeight {
        group: String,
        archetype: String,
        weight: f64,
    },

    #[error("duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },

    #[error("composite metric '{0}' has no source fields")]
    EmptyComposite(String),

    #[error("taxonomy version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archetype {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub identity_metrics: Vec<String>,
    pub key_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarMetric {
    pub metric: String,
    pub label: String,
}

/// A named, colored group of metrics drawn together on one radar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarMetricSet {
    pub key: String,
    pub name: String,
    pub color: String,
    pub metrics: Vec<RadarMetric>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionGroupConfig {
    pub name: String,
    pub positions: Vec<String>,
    #[serde(default)]
    pub archetypes: Vec<Archetype>,
    #[serde(default)]
    pub radars: Vec<RadarMetricSet>,
}

/// On-disk shape of a taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyDoc {
    #[serde(default)]
    pub version: u32,
    pub metrics: Vec<MetricDef>,
    #[serde(default)]
    pub composites: Vec<CompositeDef>,
    pub groups: Vec<PositionGroupConfig>,
}

#[derive(Debug, Clone)]
pub struct Taxonomy {
    doc: TaxonomyDoc,
    group_by_label: HashMap<String, usize>,
    metric_by_name: HashMap<String, usize>,
    tracked: Vec<String>,
    fingerprint: String,
}

impl PositionGroupConfig {
    pub fn archetype(&self, name: &str) -> Option<&Archetype> {
        self.archetypes.iter().find(|a| a.name == name)
    }

    pub fn contains_position(&self, label: &str) -> bool {
        let label = label.trim();
        self.positions.iter().any(|p| p.trim() == label)
    }
}

impl Taxonomy {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<Self, TaxonomyError> {
        Self::from_json(BUILTIN_TAXONOMY)
    }

    pub fn from_json(raw: &str) -> Result<Self, TaxonomyError> {
        let doc = serde_json::from_str::<TaxonomyDoc>(raw)?;
        Self::from_doc(doc)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read taxonomy {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("load taxonomy {}", path.display()))
    }

    pub fn from_doc(doc: TaxonomyDoc) -> Result<Self, TaxonomyError> {
        if doc.version > TAXONOMY_VERSION {
            return Err(TaxonomyError::UnsupportedVersion {
                found: doc.version,
                supported: TAXONOMY_VERSION,
            });
        }

        let mut metric_by_name = HashMap::with_capacity(doc.metrics.len());
        for (idx, def) in doc.metrics.iter().enumerate() {
            if metric_by_name.insert(def.name.clone(), idx).is_some() {
                return Err(TaxonomyError::Duplicate {
                    kind: "metric",
                    name: def.name.clone(),
                });
            }
        }

        for composite in &doc.composites {
            if composite.sum_of.is_empty() {
                return Err(TaxonomyError::EmptyComposite(composite.name.clone()));
            }
        }

        let mut group_by_label: HashMap<String, usize> = HashMap::new();
        let mut group_names = HashSet::new();
        let mut tracked = BTreeSet::new();

        for (idx, group) in doc.groups.iter().enumerate() {
            if !group_names.insert(group.name.as_str()) {
                return Err(TaxonomyError::Duplicate {
                    kind: "position group",
                    name: group.name.clone(),
                });
            }

            for label in &group.positions {
                let label = label.trim().to_string();
                if let Some(prev) = group_by_label.get(&label).copied()
                    && prev != idx
                {
                    return Err(TaxonomyError::OverlappingPosition {
                        label,
                        first: doc.groups[prev].name.clone(),
                        second: group.name.clone(),
                    });
                }
                group_by_label.insert(label, idx);
            }

            let mut archetype_names = HashSet::new();
            for archetype in &group.archetypes {
                if !archetype_names.insert(archetype.name.as_str()) {
                    return Err(TaxonomyError::Duplicate {
                        kind: "archetype",
                        name: format!("{}/{}", group.name, archetype.name),
                    });
                }
                if archetype.identity_metrics.is_empty() {
                    return Err(TaxonomyError::EmptyArchetype {
                        group: group.name.clone(),
                        archetype: archetype.name.clone(),
                    });
                }
                if !archetype.key_weight.is_finite() || archetype.key_weight <= 1.0 {
                    return Err(TaxonomyError::InvalidKeyWeight {
                        group: group.name.clone(),
                        archetype: archetype.name.clone(),
                        weight: archetype.key_weight,
                    });
                }
                for metric in &archetype.identity_metrics {
                    if !metric_by_name.contains_key(metric) {
                        return Err(TaxonomyError::UnknownMetric {
                            group: group.name.clone(),
                            context: format!("archetype '{}'", archetype.name),
                            metric: metric.clone(),
                        });
                    }
                    tracked.insert(metric.clone());
                }
            }

            for radar in &group.radars {
                for item in &radar.metrics {
                    if !metric_by_name.contains_key(&item.metric) {
                        return Err(TaxonomyError::UnknownMetric {
                            group: group.name.clone(),
                            context: format!("radar '{}'", radar.key),
                            metric: item.metric.clone(),
                        });
                    }
                    tracked.insert(item.metric.clone());
                }
            }
        }

        let fingerprint = fingerprint_doc(&doc)?;
        Ok(Self {
            doc,
            group_by_label,
            metric_by_name,
            tracked: tracked.into_iter().collect(),
            fingerprint,
        })
    }

    /// Group name for a raw position label, `None` when the label is unmapped.
    pub fn group_of(&self, position_label: &str) -> Option<&str> {
        self.group_by_label
            .get(position_label.trim())
            .map(|idx| self.doc.groups[*idx].name.as_str())
    }

    pub fn group(&self, name: &str) -> Option<&PositionGroupConfig> {
        self.doc.groups.iter().find(|g| g.name == name)
    }

    pub fn groups(&self) -> &[PositionGroupConfig] {
        &self.doc.groups
    }

    pub fn archetype(&self, group: &str, name: &str) -> Option<&Archetype> {
        self.group(group)?.archetype(name)
    }

    pub fn metric(&self, name: &str) -> Option<&MetricDef> {
        self.metric_by_name.get(name).map(|idx| &self.doc.metrics[*idx])
    }

    pub fn composites(&self) -> &[CompositeDef] {
        &self.doc.composites
    }

    /// Every metric referenced by an archetype or a radar, sorted by name.
    pub fn tracked_metrics(&self) -> &[String] {
        &self.tracked
    }

    /// SHA-256 of the canonical document; changes whenever any mapping or catalog does.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn fingerprint_doc(doc: &TaxonomyDoc) -> Result<String, TaxonomyError> {
    let canonical = serde_json::to_vec(doc)?;
    Ok(format!("{:x}", Sha256::digest(&canonical)))
}
