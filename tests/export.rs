use std::sync::Arc;

use chrono::NaiveDate;

use scout_radar::export::{export_report, match_rows};
use scout_radar::matching::{MatchQuery, SearchMode};
use scout_radar::normalize::{NormalizeOptions, Normalizer};
use scout_radar::scouting::analyze;
use scout_radar::synthetic::synthetic_pool;
use scout_radar::taxonomy::Taxonomy;

#[test]
fn writes_report_workbook() {
    let taxonomy = Arc::new(Taxonomy::builtin().expect("builtin taxonomy"));
    let options = NormalizeOptions {
        reference_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        ..NormalizeOptions::default()
    };
    let pool = Normalizer::new(Arc::clone(&taxonomy), options).normalize(&synthetic_pool(&taxonomy, 25, 3));
    let target_idx = pool
        .players()
        .iter()
        .position(|p| p.position_group.as_deref() == Some("Winger"))
        .expect("a winger");
    let report = analyze(
        &pool,
        &taxonomy,
        target_idx,
        &MatchQuery::with_mode(SearchMode::Upgrade),
        10,
    )
    .expect("analysis");
    let radars = report.radars(&taxonomy, 3);

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("report.xlsx");
    let summary = export_report(&path, &report, &radars).expect("export");

    assert!(path.exists());
    assert!(std::fs::metadata(&path).expect("metadata").len() > 0);
    assert_eq!(summary.affinity_rows, report.classification.affinities.len());
    assert_eq!(summary.match_rows, report.matches.len());
    let expected_radar_rows: usize = radars.iter().map(|c| c.axes.len() * c.series.len()).sum();
    assert_eq!(summary.radar_rows, expected_radar_rows);
}

#[test]
fn match_sheet_columns() {
    let taxonomy = Arc::new(Taxonomy::builtin().expect("builtin taxonomy"));
    let options = NormalizeOptions {
        reference_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        ..NormalizeOptions::default()
    };
    let pool = Normalizer::new(Arc::clone(&taxonomy), options).normalize(&synthetic_pool(&taxonomy, 20, 9));
    let report = analyze(&pool, &taxonomy, 0, &MatchQuery::default(), 4).expect("analysis");
    let rows = match_rows(&report);
    assert_eq!(
        rows[0],
        vec!["Player", "Age", "Similarity Score", "Team", "League", "Season"]
    );
    assert_eq!(rows.len(), report.matches.len() + 1);
    if let Some(first) = report.matches.first() {
        assert_eq!(rows[1][0], first.player.record.player_name);
        assert_eq!(rows[1][2], format!("{:.1}", first.similarity_score));
    }
}
