use std::{collections::HashMap, sync::Arc};

use data_encoding::HEXLOWER;
use rocket::tokio::sync::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::model::{
    api::{AggregateResult, GroupBy, NormalizedFilter},
    mongodb::Id,
};

/// Everything a tabulation result depends on, apart from the stored records.
#[derive(Serialize)]
struct CacheKey<'a> {
    election_id: String,
    filter: &'a NormalizedFilter,
    group_by: &'a GroupBy,
}

/// Content hash identifying a tabulation query. Filter values are sets, so
/// their order does not matter.
pub fn cache_key(election_id: Id, filter: &NormalizedFilter, group_by: &GroupBy) -> String {
    let key = CacheKey {
        election_id: election_id.to_string(),
        filter,
        group_by,
    };
    let canonical = serde_json::to_vec(&key).expect("Serialisation is infallible");
    HEXLOWER.encode(&Sha256::digest(canonical))
}

/// Memoised tabulation results.
///
/// Any mutation of cast vote record data must [`clear`](Self::clear) the
/// whole cache. A result computed before a clear may still be stored just
/// after it; the next clear removes it.
#[derive(Debug, Default)]
pub struct TabulationCache {
    entries: RwLock<HashMap<String, Arc<AggregateResult>>>,
}

impl TabulationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Arc<AggregateResult>> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn set(&self, key: String, value: Arc<AggregateResult>) {
        self.entries.write().await.insert(key, value);
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    use crate::model::api::GroupResult;

    #[test]
    fn key_ignores_value_order() {
        let election_id = Id::new();
        let a = NormalizedFilter {
            precinct_ids: Some(["p2", "p1"].iter().map(|s| s.to_string()).collect()),
            ..NormalizedFilter::default()
        };
        let b = NormalizedFilter {
            precinct_ids: Some(["p1", "p2"].iter().map(|s| s.to_string()).collect()),
            ..NormalizedFilter::default()
        };
        let group_by = GroupBy::default();
        assert_eq!(
            cache_key(election_id, &a, &group_by),
            cache_key(election_id, &b, &group_by)
        );
    }

    #[test]
    fn key_distinguishes_queries() {
        let election_id = Id::new();
        let unfiltered = NormalizedFilter::default();
        let empty = NormalizedFilter {
            ballot_style_ids: Some(BTreeSet::new()),
            ..NormalizedFilter::default()
        };
        let grouped = GroupBy {
            group_by_precinct: true,
            ..GroupBy::default()
        };
        let keys = [
            cache_key(election_id, &unfiltered, &GroupBy::default()),
            cache_key(election_id, &empty, &GroupBy::default()),
            cache_key(election_id, &unfiltered, &grouped),
            cache_key(Id::new(), &unfiltered, &GroupBy::default()),
        ];
        let distinct: BTreeSet<_> = keys.iter().collect();
        assert_eq!(distinct.len(), keys.len());
    }

    #[rocket::async_test]
    async fn clear_empties_everything() {
        let cache = TabulationCache::new();
        let mut result = AggregateResult::new();
        result.insert("root".to_string(), GroupResult::default());
        cache.set("a".to_string(), Arc::new(result.clone())).await;
        cache.set("b".to_string(), Arc::new(result)).await;
        assert_eq!(cache.len().await, 2);
        assert!(cache.get("a").await.is_some());

        cache.clear().await;
        assert_eq!(cache.len().await, 0);
        assert!(cache.get("a").await.is_none());
    }
}
