//! Sharded, bounded-cardinality storage for labelled business metrics.
//!
//! Business metrics are the one metric family whose key space is driven by
//! caller input, so they are the one family that can explode. This module
//! bounds them two ways: the canonical key keeps at most one tag dimension,
//! and the store itself is a fixed set of independent LRU shards that evict
//! the least-recently-touched key once full.
//!
//! Shard selection uses FNV-1a — a stable hash, so a given key always lands
//! on the same shard across runs and across processes.

use ahash::RandomState;
use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Default bound on the number of distinct business-metric keys.
pub const DEFAULT_MAX_CARDINALITY: usize = 10_000;

/// Default number of shards. Must be a power of two so shard selection can
/// mask instead of divide.
pub const DEFAULT_SHARD_COUNT: usize = 16;

/// How many recently evicted keys are kept for operator inspection.
const RECENT_EVICTIONS_KEPT: usize = 10;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Stable FNV-1a hash of a key. Used for shard selection only; the in-shard
/// maps use a faster keyed hasher.
fn fnv1a_64(key: &str) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in key.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Builds the canonical storage key for a named metric with optional tags.
///
/// An untagged metric is stored under its bare name. A tagged metric keeps
/// exactly one `{key=value}` dimension — the pair with the lexicographically
/// smallest tag key — so callers cannot multiply cardinality by attaching
/// many tags.
///
/// # Examples
///
/// ```rust
/// use argus_rs::services::business_metrics::canonical_key;
/// use std::collections::HashMap;
///
/// assert_eq!(canonical_key("orders", &HashMap::new()), "orders");
///
/// let mut tags = HashMap::new();
/// tags.insert("region".to_string(), "eu".to_string());
/// assert_eq!(canonical_key("orders", &tags), "orders{region=eu}");
/// ```
pub fn canonical_key(name: &str, tags: &HashMap<String, String>) -> String {
    match tags.iter().min_by(|a, b| a.0.cmp(b.0)) {
        Some((tag_key, tag_value)) => format!("{}{{{}={}}}", name, tag_key, tag_value),
        None => name.to_string(),
    }
}

/// A single stored business metric: the latest value and when it was touched.
#[derive(Debug, Clone, Serialize)]
pub struct BusinessMetricEntry {
    /// Most recently recorded value
    pub value: f64,
    /// When the key was last recorded
    pub updated_at: DateTime<Utc>,
}

/// Running account of LRU evictions, kept for the operator snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct EvictionStats {
    /// Total keys evicted since construction (or the last reset)
    pub total_evictions: u64,
    /// When the most recent eviction happened
    pub last_eviction_time: Option<DateTime<Utc>>,
    /// The most recently evicted keys, oldest first, at most ten
    pub recent_evicted_keys: VecDeque<String>,
}

impl EvictionStats {
    fn new() -> Self {
        Self {
            total_evictions: 0,
            last_eviction_time: None,
            recent_evicted_keys: VecDeque::with_capacity(RECENT_EVICTIONS_KEPT),
        }
    }
}

/// Cardinality view exposed through `GetStats`.
#[derive(Debug, Clone, Serialize)]
pub struct CardinalityInfo {
    /// Distinct keys currently stored across all shards
    pub current_size: usize,
    /// Configured cardinality bound
    pub max_cardinality: usize,
    /// Eviction accounting
    pub eviction_stats: EvictionStats,
}

struct Shard {
    entries: Mutex<LruCache<String, BusinessMetricEntry, RandomState>>,
}

impl Shard {
    fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::with_hasher(capacity, RandomState::new())),
        }
    }
}

/// Sharded LRU store for business metrics.
///
/// Each shard owns its slice of the key space, its own recency order, and
/// its own mutex, so concurrent writers on different shards never contend.
/// The cardinality bound is enforced per shard as `max_cardinality /
/// shard_count` (at least one entry per shard).
///
/// Snapshots lock shards one at a time in fixed order. The copy is therefore
/// not a global point-in-time — shards may be read at slightly different
/// instants — which is the trade that keeps writes wait-free on uncontended
/// shards.
pub struct BusinessMetricStore {
    shards: Vec<Shard>,
    shard_mask: usize,
    max_cardinality: usize,
    evictions: Mutex<EvictionStats>,
}

impl BusinessMetricStore {
    /// Creates a store bounded to `max_cardinality` keys across `shard_count`
    /// shards.
    ///
    /// A zero `max_cardinality` falls back to [`DEFAULT_MAX_CARDINALITY`]; a
    /// zero `shard_count` falls back to [`DEFAULT_SHARD_COUNT`], and any
    /// other count is rounded up to the next power of two.
    pub fn new(max_cardinality: usize, shard_count: usize) -> Self {
        let max_cardinality = if max_cardinality == 0 {
            DEFAULT_MAX_CARDINALITY
        } else {
            max_cardinality
        };
        let shard_count = if shard_count == 0 {
            DEFAULT_SHARD_COUNT
        } else {
            shard_count.next_power_of_two()
        };

        let per_shard = (max_cardinality / shard_count).max(1);
        let per_shard_capacity = NonZeroUsize::new(per_shard)
            .unwrap_or(NonZeroUsize::MIN);

        let shards = (0..shard_count)
            .map(|_| Shard::new(per_shard_capacity))
            .collect();

        Self {
            shards,
            shard_mask: shard_count - 1,
            max_cardinality,
            evictions: Mutex::new(EvictionStats::new()),
        }
    }

    fn shard_for(&self, key: &str) -> &Shard {
        let index = (fnv1a_64(key) as usize) & self.shard_mask;
        &self.shards[index]
    }

    /// Records `value` under an already-canonicalised key, touching the key
    /// in its shard's recency order. Evicts the shard's least-recently-used
    /// key when the shard is full.
    pub fn record(&self, key: String, value: f64) {
        let entry = BusinessMetricEntry {
            value,
            updated_at: Utc::now(),
        };

        let shard = self.shard_for(&key);
        let evicted = {
            let mut cache = shard.entries.lock().unwrap();
            if let Some(existing) = cache.get_mut(&key) {
                // Update path: overwrite and promote, never evict.
                *existing = entry;
                return;
            }
            // New key: push may displace the shard's LRU entry.
            cache.push(key, entry)
        };

        if let Some((evicted_key, _)) = evicted {
            self.note_eviction(evicted_key);
        }
    }

    fn note_eviction(&self, key: String) {
        let mut stats = self.evictions.lock().unwrap();
        stats.total_evictions += 1;
        stats.last_eviction_time = Some(Utc::now());
        stats.recent_evicted_keys.push_back(key);
        while stats.recent_evicted_keys.len() > RECENT_EVICTIONS_KEPT {
            stats.recent_evicted_keys.pop_front();
        }
    }

    /// Number of distinct keys currently stored.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.entries.lock().unwrap().len())
            .sum()
    }

    /// True when no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies every stored entry into a plain map, locking shards one at a
    /// time in fixed order.
    pub fn snapshot(&self) -> HashMap<String, BusinessMetricEntry> {
        let mut out = HashMap::with_capacity(self.len());
        for shard in &self.shards {
            let cache = shard.entries.lock().unwrap();
            for (key, entry) in cache.iter() {
                out.insert(key.clone(), entry.clone());
            }
        }
        out
    }

    /// Copy of the eviction accounting.
    pub fn eviction_stats(&self) -> EvictionStats {
        self.evictions.lock().unwrap().clone()
    }

    /// Current size, configured bound, and eviction accounting in one view.
    pub fn cardinality_info(&self) -> CardinalityInfo {
        CardinalityInfo {
            current_size: self.len(),
            max_cardinality: self.max_cardinality,
            eviction_stats: self.eviction_stats(),
        }
    }

    /// Configured cardinality bound.
    pub fn max_cardinality(&self) -> usize {
        self.max_cardinality
    }

    /// Drops every stored key and zeroes the eviction accounting.
    pub fn clear(&self) {
        for shard in &self.shards {
            // LruCache::clear keeps capacity, so a reset store behaves like a
            // freshly constructed one.
            shard.entries.lock().unwrap().clear();
        }
        *self.evictions.lock().unwrap() = EvictionStats::new();
    }
}

impl Default for BusinessMetricStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CARDINALITY, DEFAULT_SHARD_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_is_stable() {
        // Reference vectors for the 64-bit FNV-1a parameters.
        assert_eq!(fnv1a_64(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a_64("a"), 0xaf63_dc4c_8601_ec8c);
        // Same key, same shard, every time.
        assert_eq!(fnv1a_64("orders{region=eu}"), fnv1a_64("orders{region=eu}"));
    }

    #[test]
    fn test_canonical_key_without_tags() {
        assert_eq!(canonical_key("latency", &HashMap::new()), "latency");
    }

    #[test]
    fn test_canonical_key_keeps_one_dimension() {
        let mut tags = HashMap::new();
        tags.insert("zone".to_string(), "b".to_string());
        tags.insert("region".to_string(), "eu".to_string());
        tags.insert("tier".to_string(), "gold".to_string());

        // The smallest tag key wins, and only one pair survives.
        assert_eq!(canonical_key("orders", &tags), "orders{region=eu}");
    }

    #[test]
    fn test_update_promotes_without_eviction() {
        let store = BusinessMetricStore::new(2, 1);
        store.record("a".to_string(), 1.0);
        store.record("b".to_string(), 2.0);
        store.record("a".to_string(), 3.0);

        assert_eq!(store.len(), 2);
        assert_eq!(store.eviction_stats().total_evictions, 0);
        assert_eq!(store.snapshot()["a"].value, 3.0);
    }

    #[test]
    fn test_eviction_removes_least_recent() {
        let store = BusinessMetricStore::new(2, 1);
        store.record("a".to_string(), 1.0);
        store.record("b".to_string(), 2.0);
        store.record("c".to_string(), 3.0);

        let snapshot = store.snapshot();
        assert!(!snapshot.contains_key("a"));
        assert!(snapshot.contains_key("b"));
        assert!(snapshot.contains_key("c"));

        let evictions = store.eviction_stats();
        assert_eq!(evictions.total_evictions, 1);
        assert_eq!(Vec::from(evictions.recent_evicted_keys), ["a"]);
        assert!(evictions.last_eviction_time.is_some());
    }

    #[test]
    fn test_recent_evictions_are_bounded() {
        let store = BusinessMetricStore::new(1, 1);
        for i in 0..25 {
            store.record(format!("key_{}", i), i as f64);
        }

        let evictions = store.eviction_stats();
        assert_eq!(evictions.total_evictions, 24);
        assert_eq!(evictions.recent_evicted_keys.len(), 10);
        // Oldest retained entry is the 15th eviction.
        assert_eq!(evictions.recent_evicted_keys[0], "key_14");
    }

    #[test]
    fn test_zero_config_uses_defaults() {
        let store = BusinessMetricStore::new(0, 0);
        assert_eq!(store.max_cardinality(), DEFAULT_MAX_CARDINALITY);
        assert_eq!(store.shards.len(), DEFAULT_SHARD_COUNT);
    }

    #[test]
    fn test_shard_count_rounds_to_power_of_two() {
        let store = BusinessMetricStore::new(100, 5);
        assert_eq!(store.shards.len(), 8);
    }

    #[test]
    fn test_clear_resets_everything() {
        let store = BusinessMetricStore::new(1, 1);
        store.record("a".to_string(), 1.0);
        store.record("b".to_string(), 2.0);
        store.clear();

        assert!(store.is_empty());
        let evictions = store.eviction_stats();
        assert_eq!(evictions.total_evictions, 0);
        assert!(evictions.recent_evicted_keys.is_empty());
    }
}
