//! Keyed in-memory cache of compatibility assessments.
//!
//! Specifications are immutable once imported, so an assessment for a pair
//! never goes stale; entries live until explicitly invalidated or refreshed.

use std::convert::Infallible;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analyzer::CompatibilityAssessment;

/// Identifies one cached assessment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub old: String,
    pub new: String,
    pub context: String,
}

impl CacheKey {
    pub fn new(old: impl ToString, new: impl ToString, context: impl Into<String>) -> Self {
        Self {
            old: old.to_string(),
            new: new.to_string(),
            context: context.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}@{}", self.old, self.new, self.context)
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub refreshes: usize,
    pub entries: usize,
}

type Slot = Arc<Mutex<Option<CompatibilityAssessment>>>;

/// Concurrent assessment cache.
///
/// Each key owns its own lock: callers racing on one key compute once and
/// share the result, while distinct keys never wait on each other.
#[derive(Debug, Default)]
pub struct AssessmentCache {
    slots: DashMap<CacheKey, Slot>,
    hits: AtomicUsize,
    misses: AtomicUsize,
    refreshes: AtomicUsize,
}

impl AssessmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached assessment for `key`, or compute, store and return a fresh one.
    ///
    /// With `force_refresh` the cached value is replaced unconditionally.
    pub fn get_or_compute<F>(
        &self,
        key: CacheKey,
        force_refresh: bool,
        compute: F,
    ) -> CompatibilityAssessment
    where
        F: FnOnce() -> CompatibilityAssessment,
    {
        match self.try_get_or_compute(key, force_refresh, || Ok::<_, Infallible>(compute())) {
            Ok(assessment) => assessment,
            Err(never) => match never {},
        }
    }

    /// Like [`get_or_compute`](Self::get_or_compute) with a fallible computation.
    ///
    /// A failed computation leaves any previously cached value in place and
    /// does not leave an empty entry behind.
    pub fn try_get_or_compute<F, E>(
        &self,
        key: CacheKey,
        force_refresh: bool,
        compute: F,
    ) -> Result<CompatibilityAssessment, E>
    where
        F: FnOnce() -> Result<CompatibilityAssessment, E>,
    {
        loop {
            // Clone the slot out so the map shard is not locked during compute.
            let slot = Arc::clone(self.slots.entry(key.clone()).or_default().value());
            let mut guard = slot.lock();
            if !self.is_current(&key, &slot) {
                // Invalidated or abandoned while we waited; start over.
                continue;
            }

            match guard.as_ref() {
                Some(cached) if !force_refresh => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "assessment cache hit");
                    return Ok(cached.clone());
                }
                Some(_) => {
                    self.refreshes.fetch_add(1, Ordering::Relaxed);
                    info!(key = %key, "refreshing cached assessment");
                }
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "assessment cache miss");
                }
            }

            return match compute() {
                Ok(fresh) => {
                    *guard = Some(fresh.clone());
                    Ok(fresh)
                }
                Err(err) => {
                    if guard.is_none() {
                        self.slots.remove_if(&key, |_, s| Arc::ptr_eq(s, &slot));
                    }
                    Err(err)
                }
            };
        }
    }

    fn is_current(&self, key: &CacheKey, slot: &Slot) -> bool {
        self.slots
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current.value(), slot))
    }

    /// The cached assessment for `key`, without computing.
    pub fn get(&self, key: &CacheKey) -> Option<CompatibilityAssessment> {
        let slot = self.slots.get(key).map(|s| Arc::clone(s.value()))?;
        let cached = slot.lock().clone();
        cached
    }

    /// Drop the entry for `key`. Returns whether a value was cached.
    ///
    /// Waits for a computation in progress on `key`, then discards its result.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let Some(slot) = self.slots.get(key).map(|s| Arc::clone(s.value())) else {
            return false;
        };
        let mut guard = slot.lock();
        let was_cached = guard.take().is_some();
        self.slots.remove_if(key, |_, s| Arc::ptr_eq(s, &slot));
        was_cached
    }

    /// Number of cached assessments.
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = self.slots.iter().map(|s| Arc::clone(s.value())).collect();
        slots.iter().filter(|slot| slot.lock().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return cache usage statistics.
    pub fn statistics(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze_at;
    use canspec_diff::{ChangeCategory, Diff};
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn at(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, second).unwrap()
    }

    fn assessment(second: u32) -> CompatibilityAssessment {
        let diffs = [Diff::new(ChangeCategory::ScalingChanged, "Temp", 0x100)];
        analyze_at(&diffs, at(second))
    }

    fn key() -> CacheKey {
        CacheKey::new("spec-a", "spec-b", "default")
    }

    #[test]
    fn second_call_returns_cached_value() {
        let cache = AssessmentCache::new();
        let first = cache.get_or_compute(key(), false, || assessment(1));
        let second = cache.get_or_compute(key(), false, || assessment(2));
        assert_eq!(first.generated_at, second.generated_at);
        assert_eq!(first.compatibility_score, second.compatibility_score);
        assert_eq!(second.generated_at, at(1));

        let stats = cache.statistics();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn force_refresh_recomputes() {
        let cache = AssessmentCache::new();
        cache.get_or_compute(key(), false, || assessment(1));
        let refreshed = cache.get_or_compute(key(), true, || assessment(2));
        assert_eq!(refreshed.generated_at, at(2));
        assert_eq!(cache.get(&key()).map(|a| a.generated_at), Some(at(2)));
        assert_eq!(cache.statistics().refreshes, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn context_is_part_of_the_key() {
        let cache = AssessmentCache::new();
        cache.get_or_compute(key(), false, || assessment(1));
        let other = cache.get_or_compute(CacheKey::new("spec-a", "spec-b", "release"), false, || {
            assessment(3)
        });
        assert_eq!(other.generated_at, at(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = AssessmentCache::new();
        assert!(!cache.invalidate(&key()));
        cache.get_or_compute(key(), false, || assessment(1));
        assert!(cache.invalidate(&key()));
        assert!(cache.get(&key()).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn failed_compute_keeps_previous_value() {
        let cache = AssessmentCache::new();
        let missing: Result<_, &str> = cache.try_get_or_compute(key(), false, || Err("boom"));
        assert_eq!(missing.unwrap_err(), "boom");
        assert!(cache.is_empty());
        assert!(cache.slots.is_empty());

        cache.get_or_compute(key(), false, || assessment(1));
        let failed: Result<_, &str> = cache.try_get_or_compute(key(), true, || Err("boom"));
        assert!(failed.is_err());
        assert_eq!(cache.get(&key()).map(|a| a.generated_at), Some(at(1)));
    }

    #[test]
    fn concurrent_callers_compute_once() {
        let cache = AssessmentCache::new();
        let computed = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    cache.get_or_compute(key(), false, || {
                        computed.fetch_add(1, Ordering::SeqCst);
                        assessment(1)
                    })
                });
            }
        });

        assert_eq!(computed.load(Ordering::SeqCst), 1);
        let stats = cache.statistics();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 7);
    }

    #[test]
    fn distinct_keys_in_parallel() {
        let cache = AssessmentCache::new();
        thread::scope(|s| {
            for i in 0..4u32 {
                let cache = &cache;
                s.spawn(move || {
                    cache.get_or_compute(CacheKey::new(i, i + 1, "default"), false, || {
                        assessment(i)
                    })
                });
            }
        });
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.statistics().misses, 4);
    }

    #[test]
    fn invalidate_waits_for_in_flight_compute() {
        let cache = AssessmentCache::new();
        let (started_tx, started_rx) = mpsc::channel();

        thread::scope(|s| {
            let cache = &cache;
            let computing = s.spawn(move || {
                cache.get_or_compute(key(), false, || {
                    started_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(20));
                    assessment(1)
                })
            });
            started_rx.recv().unwrap();
            assert!(cache.invalidate(&key()));
            assert_eq!(computing.join().unwrap().generated_at, at(1));
        });

        assert!(cache.slots.is_empty());
        let again = cache.get_or_compute(key(), false, || assessment(2));
        assert_eq!(again.generated_at, at(2));
        assert_eq!(cache.statistics().misses, 2);
    }

    #[test]
    fn waiter_recomputes_after_failed_compute() {
        let cache = AssessmentCache::new();
        let (started_tx, started_rx) = mpsc::channel();

        thread::scope(|s| {
            let cache = &cache;
            let failing = s.spawn(move || {
                cache.try_get_or_compute(key(), false, || {
                    started_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(20));
                    Err("store offline")
                })
            });
            started_rx.recv().unwrap();
            let waiter = s.spawn(move || cache.get_or_compute(key(), false, || assessment(2)));
            assert!(failing.join().unwrap().is_err());
            assert_eq!(waiter.join().unwrap().generated_at, at(2));
        });

        assert_eq!(cache.get(&key()).map(|a| a.generated_at), Some(at(2)));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.slots.len(), 1);
    }
}
