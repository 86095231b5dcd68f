// Copyright 2026 Assessment Aggregation Engine Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Time-to-live memoization for `compute` results.
//!
//! This sits in front of the orchestrator, not inside it: the dependency
//! cache (`cache.rs`) tracks which auto-compute plans a component event must
//! trigger and is a correctness structure, while `ResultCache` is pure
//! memoization a host may skip entirely without changing any result, only
//! its cost. A cache hit still returns exactly what a fresh `compute` call
//! would have.

use crate::ids::{EntityId, MetricName, UserId};
use crate::instance::Instance;
use moka::future::Cache;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cache for `compute` results, keyed by `(entity, metric, user set)`.
pub struct ResultCache {
    cache: Cache<ResultKey, HashMap<UserId, Instance>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl ResultCache {
    pub fn new(ttl_secs: u64, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();
        Self {
            cache,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn key(entity: &EntityId, metric: &MetricName, users: &[UserId]) -> ResultKey {
        ResultKey::new(entity, metric, users)
    }

    pub async fn get(&self, key: &ResultKey) -> Option<HashMap<UserId, Instance>> {
        match self.cache.get(key).await {
            Some(result) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(result)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn set(&self, key: ResultKey, value: HashMap<UserId, Instance>) {
        self.cache.insert(key, value).await;
    }

    /// Drops every entry keyed to `entity` regardless of metric or user set.
    /// Used when a metric edit or a new event makes cached aggregates for
    /// that entity stale; the dependency cache decides *when*, this just
    /// does the eviction.
    pub async fn invalidate_entity(&self, entity: &EntityId) {
        let entity = entity.clone();
        self.cache.invalidate_entries_if(move |key, _| &key.entity == &entity).ok();
    }

    pub fn stats(&self) -> ResultCacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        ResultCacheStats {
            hits,
            misses,
            hit_rate: if total > 0 { hits as f64 / total as f64 } else { 0.0 },
            entry_count: self.cache.entry_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultKey {
    entity: EntityId,
    metric: MetricName,
    users_hash: u64,
}

impl ResultKey {
    fn new(entity: &EntityId, metric: &MetricName, users: &[UserId]) -> Self {
        let mut sorted: Vec<&UserId> = users.iter().collect();
        sorted.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        let mut hasher = DefaultHasher::new();
        for user in sorted {
            user.hash(&mut hasher);
        }
        Self {
            entity: entity.clone(),
            metric: metric.clone(),
            users_hash: hasher.finish(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ResultCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub entry_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{make_instance, Level};

    fn sample() -> HashMap<UserId, Instance> {
        let mut map = HashMap::new();
        map.insert(
            UserId::new("u1"),
            make_instance(Level::Lesson, EntityId::new("L"), 80.0, Some(1000), Some(vec![]), None),
        );
        map
    }

    #[tokio::test]
    async fn set_then_get_hits() {
        let cache = ResultCache::new(3600, 1000);
        let key = ResultCache::key(&EntityId::new("L"), &MetricName::new("m"), &[UserId::new("u1")]);
        cache.set(key.clone(), sample()).await;
        assert!(cache.get(&key).await.is_some());
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn miss_before_any_set() {
        let cache = ResultCache::new(3600, 1000);
        let key = ResultCache::key(&EntityId::new("L"), &MetricName::new("m"), &[UserId::new("u1")]);
        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn key_is_order_independent_over_users() {
        let a = ResultCache::key(
            &EntityId::new("L"),
            &MetricName::new("m"),
            &[UserId::new("u1"), UserId::new("u2")],
        );
        let b = ResultCache::key(
            &EntityId::new("L"),
            &MetricName::new("m"),
            &[UserId::new("u2"), UserId::new("u1")],
        );
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn invalidate_entity_drops_its_entries() {
        let cache = ResultCache::new(3600, 1000);
        let key = ResultCache::key(&EntityId::new("L"), &MetricName::new("m"), &[UserId::new("u1")]);
        cache.set(key.clone(), sample()).await;
        cache.invalidate_entity(&EntityId::new("L")).await;
        // moka's invalidate_entries_if is lazy; run the pending eviction pass.
        cache.cache.run_pending_tasks().await;
        assert!(cache.get(&key).await.is_none());
    }
}
