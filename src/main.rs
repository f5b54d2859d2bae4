use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scout_radar::cache::NormalizedPoolCache;
use scout_radar::config::ScoutConfig;
use scout_radar::export::export_report;
use scout_radar::matching::SearchMode;
use scout_radar::normalize::Normalizer;
use scout_radar::provider::{self, COMPETITIONS};
use scout_radar::record::{NameLookup, PlayerSeasonRecord, parse_player_season_rows};
use scout_radar::scouting::{ScoutingReport, analyze};
use scout_radar::synthetic::synthetic_pool;
use scout_radar::taxonomy::Taxonomy;

const DEMO_PER_GROUP: usize = 40;
const DEMO_SEED: u64 = 2024;
const RADAR_OVERLAYS: usize = 3;

fn main() -> Result<()> {
    let mut config = ScoutConfig::from_env();
    init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if let Some(raw) = arg_value(&args, "--min-minutes") {
        config.min_minutes = raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| anyhow!("invalid --min-minutes '{raw}'"))?;
    }
    if let Some(raw) = arg_value(&args, "--top") {
        config.top_n = raw
            .parse::<usize>()
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| anyhow!("invalid --top '{raw}'"))?;
    }
    if let Some(path) = arg_value(&args, "--taxonomy") {
        config.taxonomy_path = Some(PathBuf::from(path));
    }
    let mode = match arg_value(&args, "--mode") {
        Some(raw) => raw.parse::<SearchMode>()?,
        None => SearchMode::Similar,
    };

    let taxonomy = match config.taxonomy_path.as_deref() {
        Some(path) => Taxonomy::load(path)?,
        None => Taxonomy::builtin().context("built-in taxonomy is invalid")?,
    };
    let taxonomy = Arc::new(taxonomy);

    let demo = has_flag(&args, "--demo");
    let records = load_records(&args, &config, &taxonomy, demo)?;
    if records.is_empty() {
        return Err(anyhow!("no player-season records loaded"));
    }

    let normalizer = Normalizer::new(Arc::clone(&taxonomy), config.normalize_options());
    let cache = NormalizedPoolCache::new();
    let pool = cache.get_or_normalize(&normalizer, &records)?;

    let player = match arg_value(&args, "--player") {
        Some(name) => name,
        None if demo => records[0].player_name.clone(),
        None => return Err(anyhow!("--player <name> is required")),
    };

    let target_idx = match pool.find_by_name(&player) {
        NameLookup::Found(idx) => idx,
        NameLookup::Suggestions(items) => {
            println!("No exact match for '{player}'. Did you mean:");
            for (name, team) in items {
                println!("  - {name} ({team})");
            }
            return Ok(());
        }
        NameLookup::NotFound => return Err(anyhow!("player '{player}' not found")),
    };

    let report = analyze(&pool, &taxonomy, target_idx, &config.match_query(mode), config.top_n)?;
    print_report(&report);

    if let Some(path) = arg_value(&args, "--export") {
        let path = PathBuf::from(path);
        let radars = report.radars(&taxonomy, RADAR_OVERLAYS);
        let summary = export_report(&path, &report, &radars)?;
        println!(
            "Exported {} ({} matches, {} radar rows)",
            path.display(),
            summary.match_rows,
            summary.radar_rows
        );
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_records(
    args: &[String],
    config: &ScoutConfig,
    taxonomy: &Taxonomy,
    demo: bool,
) -> Result<Vec<PlayerSeasonRecord>> {
    if let Some(path) = arg_value(args, "--input") {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed reading {path}"))?;
        return parse_player_season_rows(&raw);
    }
    if has_flag(args, "--fetch") {
        let summary = provider::fetch_all_player_seasons(&config.provider, COMPETITIONS)?;
        println!(
            "Loaded {}/{} competition-seasons",
            summary.loads_succeeded, summary.loads_total
        );
        return Ok(summary.records);
    }
    if demo {
        return Ok(synthetic_pool(taxonomy, DEMO_PER_GROUP, DEMO_SEED));
    }
    Err(anyhow!("choose a data source: --input <file.json>, --fetch or --demo"))
}

fn print_report(report: &ScoutingReport) {
    let target = &report.target.record;
    println!("{}", target.display_label());
    println!(
        "  {} | {} | {}",
        target.team_name,
        target.primary_position.as_deref().unwrap_or("Unknown position"),
        report.target.position_group.as_deref().unwrap_or("Unmapped")
    );

    let Some(best) = report.classification.best.as_deref() else {
        println!("Archetype: unclassifiable");
        return;
    };
    println!("Archetype: {best}");
    if let Some(description) = report.archetype_description() {
        println!("  {description}");
    }
    println!("Affinity:");
    for item in &report.classification.affinities {
        println!("  {:<40} {:>5.1}", item.archetype, item.score);
    }

    println!("{} ({} candidates):", report.mode, report.total_candidates);
    for (rank, m) in report.matches.iter().enumerate() {
        let record = &m.player.record;
        println!(
            "{:>3}. {:<28} {:>4} {:>6.1}  {} | {} | {}",
            rank + 1,
            record.player_name,
            m.player.age.map(|a| a.to_string()).unwrap_or_else(|| "N/A".to_string()),
            m.score(report.mode),
            record.team_name,
            record.league_name,
            record.season_name
        );
    }
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
            && !next.starts_with("--")
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}
