use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::radar::RadarChart;
use crate::scouting::ScoutingReport;

pub struct ExportReport {
    pub affinity_rows: usize,
    pub match_rows: usize,
    pub radar_rows: usize,
}

/// Write a scouting report workbook with `Affinity`, `Matches` and `Radar` sheets.
pub fn export_report(path: &Path, report: &ScoutingReport, radars: &[RadarChart]) -> Result<ExportReport> {
    let affinity_rows = affinity_rows(report);
    let match_rows = match_rows(report);
    let radar_rows = radar_rows(radars);

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Affinity")?;
        write_rows(sheet, &affinity_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Matches")?;
        write_rows(sheet, &match_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Radar")?;
        write_rows(sheet, &radar_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        affinity_rows: affinity_rows.len().saturating_sub(1),
        match_rows: match_rows.len().saturating_sub(1),
        radar_rows: radar_rows.len().saturating_sub(1),
    })
}

fn affinity_rows(report: &ScoutingReport) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Archetype".to_string(),
        "Affinity Score".to_string(),
        "Metrics Used".to_string(),
        "Detected".to_string(),
    ]];
    for item in &report.classification.affinities {
        let detected = report.classification.best.as_deref() == Some(item.archetype.as_str());
        rows.push(vec![
            item.archetype.clone(),
            format!("{:.1}", item.score),
            item.metrics_used.to_string(),
            if detected { "yes".to_string() } else { String::new() },
        ]);
    }
    rows
}

pub fn match_rows(report: &ScoutingReport) -> Vec<Vec<String>> {
    let score_header = match report.mode {
        crate::matching::SearchMode::Similar => "Similarity Score",
        crate::matching::SearchMode::Upgrade => "Upgrade Score",
    };
    let mut rows = vec![vec![
        "Player".to_string(),
        "Age".to_string(),
        score_header.to_string(),
        "Team".to_string(),
        "League".to_string(),
        "Season".to_string(),
    ]];
    for m in &report.matches {
        let record = &m.player.record;
        rows.push(vec![
            record.player_name.clone(),
            opt_to_string(m.player.age),
            format!("{:.1}", m.score(report.mode)),
            record.team_name.clone(),
            record.league_name.clone(),
            record.season_name.clone(),
        ]);
    }
    rows
}

fn radar_rows(radars: &[RadarChart]) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Radar".to_string(),
        "Player".to_string(),
        "Metric".to_string(),
        "Percentile".to_string(),
    ]];
    for chart in radars {
        for series in &chart.series {
            for (axis, value) in chart.axes.iter().zip(&series.values) {
                rows.push(vec![
                    chart.title.clone(),
                    series.label.clone(),
                    axis.label.clone(),
                    format!("{value:.1}"),
                ]);
            }
        }
    }
    rows
}

fn opt_to_string<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
