use serde::{Deserialize, Serialize};

/// Suffix of the position-relative percentile column derived for a metric.
pub const PCT_SUFFIX: &str = "_pct";
/// Suffix of the position-relative z-score column derived for a metric.
pub const Z_SUFFIX: &str = "_z";

/// A tracked statistical field and the direction in which it is "good".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDef {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_higher_is_better")]
    pub higher_is_better: bool,
}

/// A field computed from other per-record fields before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeDef {
    pub name: String,
    pub sum_of: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    HigherBetter,
    LowerBetter,
}

impl MetricDef {
    pub fn polarity(&self) -> Polarity {
        if self.higher_is_better {
            Polarity::HigherBetter
        } else {
            Polarity::LowerBetter
        }
    }

    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.name
        } else {
            &self.label
        }
    }
}

impl CompositeDef {
    /// Sum of the source values for one record; `None` when any source is missing.
    pub fn evaluate<F>(&self, lookup: F) -> Option<f64>
    where
        F: Fn(&str) -> Option<f64>,
    {
        let mut total = 0.0;
        for source in &self.sum_of {
            total += lookup(source)?;
        }
        Some(total)
    }
}

pub fn pct_column(metric: &str) -> String {
    format!("{metric}{PCT_SUFFIX}")
}

pub fn z_column(metric: &str) -> String {
    format!("{metric}{Z_SUFFIX}")
}

fn default_higher_is_better() -> bool {
    true
}
