use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::GardenSummary;

/// Where aggregate views live. Opaque to the core: an implementation may
/// evict keys, mark entries stale, or trigger a recompute.
pub trait CacheStore: Send + Sync {
    /// Drop every aggregate view cached for `owner_id`. Idempotent.
    fn invalidate(&self, owner_id: &Uuid);
}

// ═══════════════════════════════════════════════════════════
// OwnerAggregates: everything cached for one owner
// ═══════════════════════════════════════════════════════════

/// Cached views for one owner. Evicted as a unit.
#[derive(Debug, Clone, Default)]
pub struct OwnerAggregates {
    pub summary: Option<GardenSummary>,
    pub suggested_questions: Option<Vec<String>>,
    pub context: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<Uuid, OwnerAggregates>,
    /// Bumped on every invalidation. A value computed under an older
    /// generation is discarded instead of stored.
    generations: HashMap<Uuid, u64>,
}

impl CacheState {
    fn generation(&self, owner_id: &Uuid) -> u64 {
        self.generations.get(owner_id).copied().unwrap_or(0)
    }
}

// ═══════════════════════════════════════════════════════════
// InMemoryAggregateCache
// ═══════════════════════════════════════════════════════════

/// Process-local aggregate cache keyed by owner.
///
/// A poisoned lock is recovered rather than reported: eviction must always
/// happen, and the cached data is disposable.
#[derive(Default)]
pub struct InMemoryAggregateCache {
    state: RwLock<CacheState>,
}

impl InMemoryAggregateCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&CacheState) -> T) -> T {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write<T>(&self, f: impl FnOnce(&mut CacheState) -> T) -> T {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Current invalidation generation for an owner.
    pub fn generation(&self, owner_id: &Uuid) -> u64 {
        self.read(|s| s.generation(owner_id))
    }

    /// Whether anything is cached for the owner.
    pub fn is_cached(&self, owner_id: &Uuid) -> bool {
        self.read(|s| s.entries.contains_key(owner_id))
    }

    /// Number of owners with cached views.
    pub fn len(&self) -> usize {
        self.read(|s| s.entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Garden summary ───────────────────────────────────

    pub fn summary(&self, owner_id: &Uuid) -> Option<GardenSummary> {
        self.read(|s| s.entries.get(owner_id).and_then(|e| e.summary.clone()))
    }

    /// Store a summary computed while the owner was at `generation`.
    /// Returns false (and stores nothing) if the owner was invalidated since.
    pub fn store_summary(&self, owner_id: Uuid, generation: u64, summary: GardenSummary) -> bool {
        self.store_if_current(owner_id, generation, |entry| entry.summary = Some(summary))
    }

    /// Read-through: return the cached summary or compute, cache and return it.
    pub fn summary_or_compute<E>(
        &self,
        owner_id: Uuid,
        compute: impl FnOnce() -> Result<GardenSummary, E>,
    ) -> Result<GardenSummary, E> {
        if let Some(cached) = self.summary(&owner_id) {
            tracing::debug!(owner_id = %owner_id, "Garden summary cache hit");
            return Ok(cached);
        }

        let generation = self.generation(&owner_id);
        let summary = compute()?;
        if !self.store_summary(owner_id, generation, summary.clone()) {
            tracing::debug!(
                owner_id = %owner_id,
                "Owner invalidated during summary computation, not caching"
            );
        }
        Ok(summary)
    }

    // ── Suggested questions / context ────────────────────

    pub fn suggested_questions(&self, owner_id: &Uuid) -> Option<Vec<String>> {
        self.read(|s| {
            s.entries
                .get(owner_id)
                .and_then(|e| e.suggested_questions.clone())
        })
    }

    pub fn store_suggested_questions(
        &self,
        owner_id: Uuid,
        generation: u64,
        questions: Vec<String>,
    ) -> bool {
        self.store_if_current(owner_id, generation, |entry| {
            entry.suggested_questions = Some(questions)
        })
    }

    pub fn context(&self, owner_id: &Uuid) -> Option<String> {
        self.read(|s| s.entries.get(owner_id).and_then(|e| e.context.clone()))
    }

    pub fn store_context(&self, owner_id: Uuid, generation: u64, context: String) -> bool {
        self.store_if_current(owner_id, generation, |entry| entry.context = Some(context))
    }

    fn store_if_current(
        &self,
        owner_id: Uuid,
        generation: u64,
        apply: impl FnOnce(&mut OwnerAggregates),
    ) -> bool {
        self.write(|s| {
            if s.generation(&owner_id) != generation {
                return false;
            }
            let entry = s.entries.entry(owner_id).or_default();
            apply(entry);
            entry.updated_at = Some(Utc::now());
            true
        })
    }

    /// Drop every cached view for every owner.
    pub fn clear(&self) {
        self.write(|s| {
            let owners: Vec<Uuid> = s.entries.keys().copied().collect();
            for owner in owners {
                *s.generations.entry(owner).or_insert(0) += 1;
            }
            s.entries.clear();
        });
    }
}

impl CacheStore for InMemoryAggregateCache {
    fn invalidate(&self, owner_id: &Uuid) {
        self.write(|s| {
            s.entries.remove(owner_id);
            *s.generations.entry(*owner_id).or_insert(0) += 1;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(total: u32) -> GardenSummary {
        GardenSummary {
            total_plants: total,
            average_health: 75.0,
            urgent_actions: 0,
            healthy_plants: total,
        }
    }

    fn populated(owner: Uuid, cache: &InMemoryAggregateCache) {
        let g = cache.generation(&owner);
        assert!(cache.store_summary(owner, g, summary(3)));
        assert!(cache.store_suggested_questions(owner, g, vec!["Why yellow leaves?".into()]));
        assert!(cache.store_context(owner, g, "3 plants".into()));
    }

    #[test]
    fn new_cache_is_empty() {
        let cache = InMemoryAggregateCache::new();
        assert!(cache.is_empty());
        assert!(cache.summary(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn invalidate_drops_all_views_for_owner() {
        let cache = InMemoryAggregateCache::new();
        let owner = Uuid::new_v4();
        populated(owner, &cache);

        cache.invalidate(&owner);

        assert!(!cache.is_cached(&owner));
        assert!(cache.summary(&owner).is_none());
        assert!(cache.suggested_questions(&owner).is_none());
        assert!(cache.context(&owner).is_none());
    }

    #[test]
    fn invalidate_twice_same_as_once() {
        let once = InMemoryAggregateCache::new();
        let twice = InMemoryAggregateCache::new();
        let owner = Uuid::new_v4();
        populated(owner, &once);
        populated(owner, &twice);

        once.invalidate(&owner);
        twice.invalidate(&owner);
        twice.invalidate(&owner);

        assert_eq!(once.is_cached(&owner), twice.is_cached(&owner));
        assert_eq!(once.summary(&owner), twice.summary(&owner));
        assert_eq!(once.len(), twice.len());
        assert!(twice.is_empty());
    }

    #[test]
    fn invalidate_leaves_other_owners() {
        let cache = InMemoryAggregateCache::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        populated(alice, &cache);
        populated(bob, &cache);

        cache.invalidate(&alice);

        assert!(!cache.is_cached(&alice));
        assert_eq!(cache.summary(&bob), Some(summary(3)));
    }

    #[test]
    fn stale_generation_is_not_stored() {
        let cache = InMemoryAggregateCache::new();
        let owner = Uuid::new_v4();
        let before = cache.generation(&owner);

        cache.invalidate(&owner);

        assert!(!cache.store_summary(owner, before, summary(1)));
        assert!(cache.summary(&owner).is_none());
    }

    #[test]
    fn summary_or_compute_caches_result() {
        let cache = InMemoryAggregateCache::new();
        let owner = Uuid::new_v4();
        let mut calls = 0;

        let first: Result<_, ()> = cache.summary_or_compute(owner, || {
            calls += 1;
            Ok(summary(2))
        });
        assert_eq!(first.unwrap(), summary(2));

        let second: Result<_, ()> = cache.summary_or_compute(owner, || panic!("should be cached"));
        assert_eq!(second.unwrap(), summary(2));
        assert_eq!(calls, 1);
    }

    #[test]
    fn summary_or_compute_skips_store_when_invalidated_mid_compute() {
        let cache = InMemoryAggregateCache::new();
        let owner = Uuid::new_v4();

        let result: Result<_, ()> = cache.summary_or_compute(owner, || {
            cache.invalidate(&owner);
            Ok(summary(5))
        });

        assert_eq!(result.unwrap(), summary(5));
        assert!(cache.summary(&owner).is_none(), "stale value must not be cached");
    }

    #[test]
    fn summary_or_compute_propagates_error() {
        let cache = InMemoryAggregateCache::new();
        let owner = Uuid::new_v4();
        let result = cache.summary_or_compute(owner, || Err("db down"));
        assert_eq!(result.unwrap_err(), "db down");
        assert!(!cache.is_cached(&owner));
    }

    #[test]
    fn clear_drops_everything() {
        let cache = InMemoryAggregateCache::new();
        let owner = Uuid::new_v4();
        populated(owner, &cache);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.generation(&owner), 1);
    }
}
