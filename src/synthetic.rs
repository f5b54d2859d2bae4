//! Randomized player pools for the demo run and the benchmarks.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::record::PlayerSeasonRecord;
use crate::taxonomy::Taxonomy;

const FIRST_NAMES: &[&str] = &[
    "Luka", "Mateo", "Jonas", "Ilir", "Kofi", "Arne", "Tomas", "Rui", "Emil", "Noah", "Sami",
    "Dario", "Felix", "Milan", "Oskar", "Kasper",
];
const LAST_NAMES: &[&str] = &[
    "Horvat", "Silva", "Berg", "Novak", "Mensah", "Lindqvist", "Kowalski", "Costa", "Petersen",
    "Moreau", "Haddad", "Ferrer", "Jansen", "Kovac", "Nyberg", "Rossi",
];
const TEAMS: &[&str] = &[
    "Riverside", "Northport", "Ashford Town", "Vale United", "Harbour City", "Kingsmead",
];
const SEASONS: &[(u32, &str)] = &[(317, "2023/2024"), (318, "2024/2025")];
const LEAGUES: &[(u32, &str)] = &[(4, "League One"), (1385, "Championship")];

/// `per_group` players for every position group of `taxonomy`, with values for
/// every tracked metric (composites are generated through their sources).
pub fn synthetic_pool(taxonomy: &Taxonomy, per_group: usize, seed: u64) -> Vec<PlayerSeasonRecord> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut fields: Vec<String> = Vec::new();
    for metric in taxonomy.tracked_metrics() {
        match taxonomy.composites().iter().find(|c| &c.name == metric) {
            Some(composite) => fields.extend(composite.sum_of.iter().cloned()),
            None => fields.push(metric.clone()),
        }
    }
    fields.sort();
    fields.dedup();

    let scales: BTreeMap<&str, f64> = fields
        .iter()
        .map(|f| (f.as_str(), rng.gen_range(0.2..6.0_f64)))
        .collect();

    let mut records = Vec::new();
    let mut next_id = 1u64;
    for group in taxonomy.groups() {
        if group.positions.is_empty() {
            continue;
        }
        for _ in 0..per_group {
            let (season_id, season_name) = SEASONS[rng.gen_range(0..SEASONS.len())];
            let (league_id, league_name) = LEAGUES[rng.gen_range(0..LEAGUES.len())];
            let position = &group.positions[rng.gen_range(0..group.positions.len())];
            let stats = scales
                .iter()
                .map(|(field, scale)| (field.to_string(), scale * rng.gen_range(0.1..1.9_f64)))
                .collect();
            records.push(PlayerSeasonRecord {
                player_id: next_id,
                player_name: format!(
                    "{} {}",
                    FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())],
                    LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())]
                ),
                team_name: TEAMS[rng.gen_range(0..TEAMS.len())].to_string(),
                league_id: Some(league_id),
                league_name: league_name.to_string(),
                season_id: Some(season_id),
                season_name: season_name.to_string(),
                birth_date: Some(format!(
                    "{}-{:02}-{:02}",
                    rng.gen_range(1990..2006),
                    rng.gen_range(1..=12),
                    rng.gen_range(1..=28)
                )),
                primary_position: Some(position.clone()),
                minutes: rng.gen_range(200.0..3400.0_f64).round(),
                stats,
            });
            next_id += 1;
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_is_deterministic_per_seed() {
        let taxonomy = Taxonomy::builtin().expect("builtin taxonomy");
        let a = synthetic_pool(&taxonomy, 8, 7);
        let b = synthetic_pool(&taxonomy, 8, 7);
        assert_eq!(a, b);
        assert_eq!(a.len(), 8 * taxonomy.groups().len());
    }

    #[test]
    fn composite_sources_are_generated() {
        let taxonomy = Taxonomy::builtin().expect("builtin taxonomy");
        let pool = synthetic_pool(&taxonomy, 2, 1);
        for record in &pool {
            assert!(record.stat("padj_tackles_90").is_some());
            assert!(record.stat("padj_interceptions_90").is_some());
            assert!(record.stat("padj_tackles_and_interceptions_90").is_none());
            let group = record
                .primary_position
                .as_deref()
                .and_then(|p| taxonomy.group_of(p));
            assert!(group.is_some());
        }
    }
}
