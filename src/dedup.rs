//! Per-thread deduplication of validation results.
//!
//! Bursty callers (N-way retries inside one request) validate the same SQL
//! many times in a few milliseconds. The filter coalesces those repeats:
//! each thread owns an LRU of recent results with a short TTL, so a repeat
//! within the window returns the cached result without touching the
//! orchestrator. Thread-locality keeps the hot path lock-free and prevents
//! one thread's result from leaking a stale outcome to another after a
//! config reload.

use std::{
    cell::RefCell,
    collections::HashMap,
    hash::{DefaultHasher, Hash, Hasher},
    sync::{
        Arc, LazyLock,
        atomic::{AtomicU64, Ordering}
    },
    time::{Duration, Instant}
};

use indexmap::IndexMap;
use regex::Regex;

use crate::{config::DedupConfig, context::SqlContext, rules::ValidationResult};

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Key of one deduplication entry.
///
/// Derived from the whitespace-normalized SQL plus the fields that
/// legitimately change outcomes: command kind, datasource, and the
/// logical-pagination marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DedupKey(u64);

impl DedupKey {
    pub fn of(ctx: &SqlContext) -> Self {
        let normalized = WHITESPACE.replace_all(ctx.sql().trim(), " ");
        let mut hasher = DefaultHasher::new();
        normalized.hash(&mut hasher);
        ctx.kind().to_string().hash(&mut hasher);
        ctx.datasource().hash(&mut hasher);
        if let Some(page) = ctx.page() {
            page.offset.hash(&mut hasher);
            page.size.hash(&mut hasher);
        }
        Self(hasher.finish())
    }
}

struct Entry {
    result:      Arc<ValidationResult>,
    inserted_at: Instant
}

struct ThreadCache {
    entries:    IndexMap<DedupKey, Entry>,
    generation: u64
}

impl ThreadCache {
    fn new(generation: u64) -> Self {
        Self {
            entries: IndexMap::new(),
            generation
        }
    }
}

thread_local! {
    /// Per-filter caches: each validator's filter sees only its own
    /// entries, keyed by the filter's process-unique id.
    static CACHES: RefCell<HashMap<u64, ThreadCache>> = RefCell::new(HashMap::new());
}

static NEXT_FILTER_ID: AtomicU64 = AtomicU64::new(0);

/// Deduplication filter over the thread-local caches.
///
/// The filter itself holds only its id and the reload generation; a thread
/// cache filled under an older generation clears itself on next touch,
/// which is how `invalidate_all` reaches threads the reloading thread
/// cannot address.
#[derive(Debug)]
pub struct DedupFilter {
    id:         u64,
    generation: AtomicU64
}

impl Default for DedupFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl DedupFilter {
    pub fn new() -> Self {
        Self {
            id:         NEXT_FILTER_ID.fetch_add(1, Ordering::Relaxed),
            generation: AtomicU64::new(0)
        }
    }

    /// Non-expired cached result for the key, refreshing its LRU position.
    pub fn lookup(&self, key: DedupKey, config: &DedupConfig) -> Option<Arc<ValidationResult>> {
        let ttl = Duration::from_millis(config.ttl_ms);
        let generation = self.generation.load(Ordering::Acquire);
        CACHES.with(|caches| {
            let mut caches = caches.borrow_mut();
            let cache = caches
                .entry(self.id)
                .or_insert_with(|| ThreadCache::new(generation));
            if cache.generation != generation {
                cache.entries.clear();
                cache.generation = generation;
                return None;
            }
            let entry = cache.entries.shift_remove(&key)?;
            if entry.inserted_at.elapsed() > ttl {
                return None;
            }
            let result = entry.result.clone();
            cache.entries.insert(key, entry);
            Some(result)
        })
    }

    /// True iff a repeat within the TTL would be served from the cache.
    pub fn should_skip(&self, key: DedupKey, config: &DedupConfig) -> bool {
        self.lookup(key, config).is_some()
    }

    /// Insert or refresh the entry, evicting least-recently-used entries
    /// beyond the configured size.
    pub fn record(&self, key: DedupKey, result: Arc<ValidationResult>, config: &DedupConfig) {
        let generation = self.generation.load(Ordering::Acquire);
        CACHES.with(|caches| {
            let mut caches = caches.borrow_mut();
            let cache = caches
                .entry(self.id)
                .or_insert_with(|| ThreadCache::new(generation));
            if cache.generation != generation {
                cache.entries.clear();
                cache.generation = generation;
            }
            cache.entries.shift_remove(&key);
            while cache.entries.len() >= config.cache_size.max(1) {
                cache.entries.shift_remove_index(0);
            }
            cache.entries.insert(key, Entry {
                result,
                inserted_at: Instant::now()
            });
        });
    }

    /// Drop the calling thread's cache for this filter.
    pub fn clear_thread_cache(&self) {
        CACHES.with(|caches| {
            caches.borrow_mut().remove(&self.id);
        });
    }

    /// Invalidate every thread's cache on next touch (used on config
    /// reload).
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }
}

impl Drop for DedupFilter {
    fn drop(&mut self) {
        // Entries on other threads expire via the TTL; reclaim this
        // thread's slice eagerly.
        self.clear_thread_cache();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CommandKind, ExecutionLayer};

    fn key(sql: &str) -> DedupKey {
        let ctx = SqlContext::new(sql, CommandKind::Select, ExecutionLayer::Jdbc);
        DedupKey::of(&ctx)
    }

    fn result() -> Arc<ValidationResult> {
        Arc::new(ValidationResult::new())
    }

    #[test]
    fn whitespace_variants_share_a_key() {
        assert_eq!(key("SELECT  id\nFROM users"), key("SELECT id FROM users"));
    }

    #[test]
    fn datasource_changes_the_key() {
        let a = SqlContext::new("SELECT 1", CommandKind::Select, ExecutionLayer::Jdbc);
        let b = SqlContext::new("SELECT 1", CommandKind::Select, ExecutionLayer::Jdbc)
            .with_datasource("other");
        assert_ne!(DedupKey::of(&a), DedupKey::of(&b));
    }

    #[test]
    fn page_marker_changes_the_key() {
        let a = SqlContext::new("SELECT 1", CommandKind::Select, ExecutionLayer::Jdbc);
        let b = SqlContext::new("SELECT 1", CommandKind::Select, ExecutionLayer::Jdbc)
            .with_page(Some(crate::context::PageRequest {
                offset: 0,
                size:   20
            }));
        assert_ne!(DedupKey::of(&a), DedupKey::of(&b));
    }

    #[test]
    fn hit_within_ttl() {
        let filter = DedupFilter::new();
        let config = DedupConfig::default();
        let cached = result();
        filter.record(key("SELECT a FROM t"), cached.clone(), &config);
        let hit = filter.lookup(key("SELECT a FROM t"), &config).unwrap();
        assert!(Arc::ptr_eq(&cached, &hit));
    }

    #[test]
    fn expired_entry_misses() {
        let filter = DedupFilter::new();
        let config = DedupConfig {
            ttl_ms: 1,
            ..DedupConfig::default()
        };
        filter.record(key("SELECT b FROM t"), result(), &config);
        std::thread::sleep(Duration::from_millis(5));
        assert!(filter.lookup(key("SELECT b FROM t"), &config).is_none());
    }

    #[test]
    fn lru_eviction_respects_cache_size() {
        let filter = DedupFilter::new();
        let config = DedupConfig {
            cache_size: 2,
            ..DedupConfig::default()
        };
        filter.record(key("SELECT 1"), result(), &config);
        filter.record(key("SELECT 2"), result(), &config);
        filter.record(key("SELECT 3"), result(), &config);
        assert!(filter.lookup(key("SELECT 1"), &config).is_none());
        assert!(filter.lookup(key("SELECT 3"), &config).is_some());
    }

    #[test]
    fn invalidate_all_clears_on_next_touch() {
        let filter = DedupFilter::new();
        let config = DedupConfig::default();
        filter.record(key("SELECT c FROM t"), result(), &config);
        filter.invalidate_all();
        assert!(filter.lookup(key("SELECT c FROM t"), &config).is_none());
    }

    #[test]
    fn filters_do_not_share_entries() {
        let a = DedupFilter::new();
        let b = DedupFilter::new();
        let config = DedupConfig::default();
        a.record(key("SELECT d FROM t"), result(), &config);
        assert!(b.lookup(key("SELECT d FROM t"), &config).is_none());
        assert!(a.lookup(key("SELECT d FROM t"), &config).is_some());
    }

    #[test]
    fn caches_are_thread_local() {
        let filter = Arc::new(DedupFilter::new());
        let config = DedupConfig::default();
        filter.record(key("SELECT e FROM t"), result(), &config);
        let other = {
            let filter = filter.clone();
            std::thread::spawn(move || {
                filter
                    .lookup(key("SELECT e FROM t"), &DedupConfig::default())
                    .is_none()
            })
        };
        assert!(other.join().unwrap());
        assert!(filter.lookup(key("SELECT e FROM t"), &config).is_some());
    }
}
