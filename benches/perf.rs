use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use scout_radar::archetype::classify;
use scout_radar::matching::{MatchQuery, SearchMode, find_matches};
use scout_radar::normalize::{NormalizeOptions, Normalizer};
use scout_radar::synthetic::synthetic_pool;
use scout_radar::taxonomy::Taxonomy;

fn bench_normalize(c: &mut Criterion) {
    let taxonomy = Arc::new(Taxonomy::builtin().expect("builtin taxonomy"));
    let records = synthetic_pool(&taxonomy, 400, 42);
    let normalizer = Normalizer::new(Arc::clone(&taxonomy), NormalizeOptions::default());

    c.bench_function("normalize_pool_2400", |b| {
        b.iter(|| {
            let pool = normalizer.normalize(black_box(&records));
            black_box(pool.len());
        })
    });
}

fn bench_matching(c: &mut Criterion) {
    let taxonomy = Arc::new(Taxonomy::builtin().expect("builtin taxonomy"));
    let records = synthetic_pool(&taxonomy, 400, 42);
    let pool = Normalizer::new(Arc::clone(&taxonomy), NormalizeOptions::default()).normalize(&records);
    let target = pool
        .players()
        .iter()
        .find(|p| p.position_group.as_deref() == Some("Striker"))
        .expect("a striker");
    let best = classify(target, &taxonomy).best.expect("classified");
    let archetype = taxonomy
        .archetype("Striker", &best)
        .cloned()
        .expect("archetype");

    for mode in [SearchMode::Similar, SearchMode::Upgrade] {
        let query = MatchQuery::with_mode(mode);
        c.bench_function(&format!("find_matches_{}", mode.score_column()), |b| {
            b.iter(|| {
                let results = find_matches(black_box(target), pool.players(), &archetype, &query);
                black_box(results.len());
            })
        });
    }
}

criterion_group!(benches, bench_normalize, bench_matching);
criterion_main!(benches);
