use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::normalize::{NormalizedPool, Normalizer};
use crate::record::PlayerSeasonRecord;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    taxonomy: String,
    pool: String,
}

/// Normalized pools keyed by the taxonomy snapshot and the exact input they
/// were computed from. A taxonomy reload changes the key, so stale pools are
/// never served.
#[derive(Debug, Default)]
pub struct NormalizedPoolCache {
    entries: Mutex<HashMap<CacheKey, Arc<NormalizedPool>>>,
}

impl NormalizedPoolCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_normalize(
        &self,
        normalizer: &Normalizer,
        records: &[PlayerSeasonRecord],
    ) -> Result<Arc<NormalizedPool>> {
        let key = CacheKey {
            taxonomy: normalizer.taxonomy().fingerprint().to_string(),
            pool: pool_fingerprint(normalizer, records)?,
        };

        if let Some(hit) = self.lock().get(&key) {
            debug!(pool = %key.pool, "normalized pool cache hit");
            return Ok(Arc::clone(hit));
        }

        let fresh = Arc::new(normalizer.normalize(records));
        let mut guard = self.lock();
        let entry = guard.entry(key).or_insert(fresh);
        Ok(Arc::clone(entry))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Arc<NormalizedPool>>> {
        self.entries.lock().expect("normalized pool cache lock poisoned")
    }
}

/// SHA-256 over the records and the options they are normalized with.
pub fn pool_fingerprint(normalizer: &Normalizer, records: &[PlayerSeasonRecord]) -> Result<String> {
    let mut hasher = Sha256::new();
    let options = serde_json::to_vec(normalizer.options()).context("serialize normalize options")?;
    hasher.update(&options);
    for record in records {
        let bytes = serde_json::to_vec(record).context("serialize player-season record")?;
        hasher.update(&bytes);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NormalizeOptions;
    use crate::taxonomy::Taxonomy;

    fn record(id: u64, npg: f64) -> PlayerSeasonRecord {
        PlayerSeasonRecord {
            player_id: id,
            player_name: format!("P{id}"),
            primary_position: Some("Centre Forward".into()),
            minutes: 900.0,
            ..Default::default()
        }
        .with_stat("npg_90", npg)
    }

    #[test]
    fn same_input_shares_one_pool() {
        let taxonomy = Arc::new(Taxonomy::builtin().unwrap());
        let normalizer = Normalizer::new(taxonomy, NormalizeOptions::default());
        let cache = NormalizedPoolCache::new();
        let rows = vec![record(1, 0.1), record(2, 0.2)];

        let first = cache.get_or_normalize(&normalizer, &rows).unwrap();
        let second = cache.get_or_normalize(&normalizer, &rows).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let changed = vec![record(1, 0.1), record(2, 0.3)];
        let third = cache.get_or_normalize(&normalizer, &changed).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn clear_empties_the_cache() {
        let taxonomy = Arc::new(Taxonomy::builtin().unwrap());
        let normalizer = Normalizer::new(taxonomy, NormalizeOptions::default());
        let cache = NormalizedPoolCache::new();
        let pool = cache
            .get_or_normalize(&normalizer, &[record(1, 0.5)])
            .unwrap();
        assert_eq!(pool.taxonomy_fingerprint(), normalizer.taxonomy().fingerprint());
        cache.clear();
        assert!(cache.is_empty());
    }
}
