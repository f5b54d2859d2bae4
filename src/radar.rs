//! Radar chart data. Axes are percentiles, so every series shares the
//! fixed [0, 100] radial range regardless of the underlying units.

use serde::{Deserialize, Serialize};

use crate::normalize::NormalizedPlayer;
use crate::taxonomy::{RadarMetricSet, Taxonomy};

pub const RADIAL_RANGE: (f64, f64) = (0.0, 100.0);
const FILL_ALPHA: f64 = 0.2;

/// Series colors; the last four only come into play past five players.
pub const PALETTE: [&str; 9] = [
    "#FF0000", "#0000FF", "#00FF00", "#FFA500", "#FFC0CB", "#FFFF00", "#00FFFF", "#800080",
    "#FFD700",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarAxis {
    pub metric: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarSeries {
    pub label: String,
    pub color: String,
    pub fill: String,
    pub values: Vec<f64>,
    /// `values` with the first point repeated to close the polygon.
    pub closed_values: Vec<f64>,
    /// Rounded value labels, one per closed point.
    pub text: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarChart {
    pub key: String,
    pub title: String,
    pub color: String,
    pub axes: Vec<RadarAxis>,
    pub series: Vec<RadarSeries>,
}

pub fn build_radar(set: &RadarMetricSet, players: &[&NormalizedPlayer]) -> RadarChart {
    let axes: Vec<RadarAxis> = set
        .metrics
        .iter()
        .map(|m| RadarAxis {
            metric: m.metric.clone(),
            label: m.label.clone(),
        })
        .collect();

    let series = players
        .iter()
        .enumerate()
        .map(|(idx, player)| {
            let color = PALETTE[idx % PALETTE.len()].to_string();
            let values: Vec<f64> = axes
                .iter()
                .map(|axis| player.percentile(&axis.metric).clamp(RADIAL_RANGE.0, RADIAL_RANGE.1))
                .collect();
            let mut closed_values = values.clone();
            if let Some(first) = values.first() {
                closed_values.push(*first);
            }
            let text = closed_values
                .iter()
                .map(|v| format!("{}", v.round() as i64))
                .collect();
            RadarSeries {
                label: player.record.display_label(),
                fill: hex_to_rgba(&color, FILL_ALPHA)
                    .unwrap_or_else(|| format!("rgba(128, 128, 128, {FILL_ALPHA})")),
                color,
                values,
                closed_values,
                text,
            }
        })
        .collect();

    RadarChart {
        key: set.key.clone(),
        title: set.name.clone(),
        color: set.color.clone(),
        axes,
        series,
    }
}

/// Every radar of `group`, in catalog order. `None` for an unknown group.
pub fn radar_charts_for_group(
    taxonomy: &Taxonomy,
    group: &str,
    players: &[&NormalizedPlayer],
) -> Option<Vec<RadarChart>> {
    let config = taxonomy.group(group)?;
    Some(config.radars.iter().map(|set| build_radar(set, players)).collect())
}

pub fn hex_to_rgba(hex: &str, alpha: f64) -> Option<String> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(digits.get(range)?, 16).ok();
    let (r, g, b) = (channel(0..2)?, channel(2..4)?, channel(4..6)?);
    Some(format!("rgba({r}, {g}, {b}, {alpha})"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::record::PlayerSeasonRecord;
    use crate::taxonomy::RadarMetric;

    fn player(name: &str, pcts: &[(&str, f64)]) -> NormalizedPlayer {
        NormalizedPlayer {
            record: PlayerSeasonRecord {
                player_name: name.into(),
                season_name: "2024/2025".into(),
                ..Default::default()
            },
            age: None,
            position_group: Some("Striker".into()),
            ranked: true,
            percentiles: pcts.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            zscores: BTreeMap::new(),
        }
    }

    #[test]
    fn series_close_the_polygon_and_default_missing_to_zero() {
        let set = RadarMetricSet {
            key: "finishing".into(),
            name: "Finishing".into(),
            color: "#D32F2F".into(),
            metrics: vec![
                RadarMetric { metric: "npg_90".into(), label: "Non-Penalty Goals".into() },
                RadarMetric { metric: "np_xg_90".into(), label: "Non-Penalty xG".into() },
            ],
        };
        let a = player("Ada", &[("npg_90", 91.6)]);
        let chart = build_radar(&set, &[&a]);
        let series = &chart.series[0];
        assert_eq!(series.label, "Ada (2024/2025)");
        assert_eq!(series.values, vec![91.6, 0.0]);
        assert_eq!(series.closed_values, vec![91.6, 0.0, 91.6]);
        assert_eq!(series.text, vec!["92", "0", "92"]);
        assert_eq!(series.fill, "rgba(255, 0, 0, 0.2)");
    }

    #[test]
    fn palette_cycles() {
        let set = RadarMetricSet {
            key: "k".into(),
            name: "K".into(),
            color: "#000000".into(),
            metrics: Vec::new(),
        };
        let players: Vec<NormalizedPlayer> = (0..10).map(|i| player(&format!("P{i}"), &[])).collect();
        let refs: Vec<&NormalizedPlayer> = players.iter().collect();
        let chart = build_radar(&set, &refs);
        assert_eq!(chart.series[9].color, PALETTE[0]);
        assert!(chart.series[0].closed_values.is_empty());
    }

    #[test]
    fn hex_conversion() {
        assert_eq!(hex_to_rgba("#00BCD4", 0.2).as_deref(), Some("rgba(0, 188, 212, 0.2)"));
        assert_eq!(hex_to_rgba("red", 0.2), None);
    }
}
