//! Content-addressed caching of extraction results

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use dashmap::DashMap;
use crossbeam::queue::SegQueue;
use sha2::{Digest, Sha256};

use crate::extract::{DateRange, ExtractTable};
use crate::types::SampleRow;

/// Identifies one extraction: dataset, point geometry and date filter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtractKey {
    pub dataset_id: String,
    pub geometry_digest: String,
    pub date_range: Option<DateRange>,
}

impl ExtractKey {
    pub fn new(dataset_id: &str, points: &[SampleRow], date_range: Option<DateRange>) -> Self {
        Self {
            dataset_id: dataset_id.to_string(),
            geometry_digest: geometry_digest(points),
            date_range,
        }
    }
}

/// SHA-256 over the ordered (plot ID, lon, lat) triples, hex encoded
///
/// Negative zero is folded into zero so equal coordinates hash equally.
pub fn geometry_digest(points: &[SampleRow]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((points.len() as u64).to_le_bytes());

    for point in points {
        hasher.update((point.plot_id.len() as u64).to_le_bytes());
        hasher.update(point.plot_id.as_bytes());
        hasher.update(normalize(point.lon).to_bits().to_le_bytes());
        hasher.update(normalize(point.lat).to_bits().to_le_bytes());
    }

    format!("{:x}", hasher.finalize())
}

fn normalize(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

/// Queued accesses allowed per cached table before stale entries are compacted away
const QUEUE_COMPACT_FACTOR: usize = 4;

struct CacheEntry {
    table: Arc<ExtractTable>,
    /// Generation of the most recent access; older queue entries for this key are stale
    generation: u64,
}

/// Concurrent cache of extraction tables with least-recently-accessed eviction
///
/// Every access pushes `(key, generation)` onto the queue. Eviction pops from
/// the front and only removes an entry whose stored generation still matches,
/// so a table read after it was queued survives until its newest access
/// reaches the front.
pub struct ExtractCache {
    cache: Arc<DashMap<ExtractKey, CacheEntry>>,
    lru: Arc<SegQueue<(ExtractKey, u64)>>,
    generation: Arc<AtomicU64>,
    max_entries: usize,
}

impl ExtractCache {
    /// Creates a new cache
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of tables to keep (default: 256)
    pub fn new(max_entries: usize) -> Self {
        Self {
            cache: Arc::new(DashMap::new()),
            lru: Arc::new(SegQueue::new()),
            generation: Arc::new(AtomicU64::new(0)),
            max_entries: max_entries.max(1),
        }
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed)
    }

    /// Gets a table from the cache, marking it as most recently accessed
    pub fn get(&self, key: &ExtractKey) -> Option<Arc<ExtractTable>> {
        let generation = self.next_generation();
        let table = {
            let mut entry = self.cache.get_mut(key)?;
            entry.generation = generation;
            Arc::clone(&entry.table)
        };

        self.lru.push((key.clone(), generation));
        self.compact_if_needed();
        Some(table)
    }

    /// Puts a table into the cache, evicting the least recently accessed entries when full
    pub fn put(&self, key: ExtractKey, table: Arc<ExtractTable>) {
        while !self.cache.contains_key(&key) && self.cache.len() >= self.max_entries {
            match self.lru.pop() {
                Some((old_key, generation)) => {
                    self.cache.remove_if(&old_key, |_, entry| entry.generation == generation);
                }
                None => break,
            }
        }

        let generation = self.next_generation();
        self.cache.insert(key.clone(), CacheEntry { table, generation });
        self.lru.push((key, generation));
        self.compact_if_needed();
    }

    /// Drops queue entries superseded by a later access or an eviction
    fn compact_if_needed(&self) {
        let queued = self.lru.len();
        if queued <= self.max_entries * QUEUE_COMPACT_FACTOR {
            return;
        }

        for _ in 0..queued {
            let Some((key, generation)) = self.lru.pop() else {
                break;
            };
            let live = self
                .cache
                .get(&key)
                .map_or(false, |entry| entry.generation == generation);
            if live {
                self.lru.push((key, generation));
            }
        }
    }

    /// Clears the cache
    pub fn clear(&self) {
        self.cache.clear();

        while self.lru.pop().is_some() {}
    }

    /// Returns the current number of cached tables
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Returns cache statistics
    pub fn stats(&self) -> CacheStats {
        let total_rows: usize = self.cache
            .iter()
            .map(|entry| entry.value().table.rows.len())
            .sum();

        CacheStats {
            entry_count: self.cache.len(),
            total_rows,
            queued_accesses: self.lru.len(),
            max_entries: self.max_entries,
        }
    }
}

impl Clone for ExtractCache {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            lru: Arc::clone(&self.lru),
            generation: Arc::clone(&self.generation),
            max_entries: self.max_entries,
        }
    }
}

impl Default for ExtractCache {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of tables currently in cache
    pub entry_count: usize,
    /// Rows summed over all cached tables
    pub total_rows: usize,
    /// Access records waiting in the eviction queue, stale ones included
    pub queued_accesses: usize,
    /// Maximum number of tables
    pub max_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(plot_id: &str, lon: f64, lat: f64) -> SampleRow {
        SampleRow { plot_id: plot_id.to_string(), lon, lat }
    }

    fn key(dataset: &str) -> ExtractKey {
        ExtractKey::new(dataset, &[row("A", -84.0, 36.0)], None)
    }

    fn table(rows: usize) -> Arc<ExtractTable> {
        Arc::new(ExtractTable {
            bands: vec!["b1".to_string()],
            rows: (0..rows)
                .map(|i| crate::extract::ExtractRow {
                    plot_id: i.to_string(),
                    lon: 0.0,
                    lat: 0.0,
                    values: vec![None],
                })
                .collect(),
        })
    }

    #[test]
    fn test_digest_is_stable() {
        let points = [row("A", -84.0, 36.0), row("B", -83.0, 35.0)];
        assert_eq!(geometry_digest(&points), geometry_digest(&points.clone()));
        assert_eq!(geometry_digest(&points).len(), 64);
    }

    #[test]
    fn test_digest_depends_on_geometry_and_order() {
        let a = [row("A", -84.0, 36.0), row("B", -83.0, 35.0)];
        let b = [row("B", -83.0, 35.0), row("A", -84.0, 36.0)];
        let c = [row("A", -84.0, 36.000001), row("B", -83.0, 35.0)];

        assert_ne!(geometry_digest(&a), geometry_digest(&b));
        assert_ne!(geometry_digest(&a), geometry_digest(&c));
    }

    #[test]
    fn test_digest_folds_negative_zero() {
        assert_eq!(
            geometry_digest(&[row("A", -0.0, 0.0)]),
            geometry_digest(&[row("A", 0.0, 0.0)])
        );
    }

    #[test]
    fn test_digest_separates_ids() {
        // "AB" + "C" must differ from "A" + "BC"
        let a = [row("AB", 1.0, 1.0), row("C", 1.0, 1.0)];
        let b = [row("A", 1.0, 1.0), row("BC", 1.0, 1.0)];
        assert_ne!(geometry_digest(&a), geometry_digest(&b));
    }

    #[test]
    fn test_key_includes_date_range() {
        let points = [row("A", -84.0, 36.0)];
        let range = DateRange::parse("2020-01-01", "2020-12-31").unwrap();
        assert_ne!(
            ExtractKey::new("modis", &points, None),
            ExtractKey::new("modis", &points, Some(range))
        );
    }

    #[test]
    fn test_cache_basic() {
        let cache = ExtractCache::new(2);
        cache.put(key("srtm"), table(3));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key("srtm")).unwrap().rows.len(), 3);
        assert!(cache.get(&key("modis")).is_none());
    }

    #[test]
    fn test_cache_eviction() {
        let cache = ExtractCache::new(2);

        cache.put(key("a"), table(1));
        cache.put(key("b"), table(1));
        cache.put(key("c"), table(1));

        assert!(cache.len() <= 2);
        assert!(cache.get(&key("c")).is_some());
    }

    #[test]
    fn test_recently_read_entry_survives_eviction() {
        let cache = ExtractCache::new(2);

        cache.put(key("a"), table(1));
        cache.put(key("b"), table(1));
        assert!(cache.get(&key("a")).is_some());
        cache.put(key("c"), table(1));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("a")).is_some());
        assert!(cache.get(&key("b")).is_none());
        assert!(cache.get(&key("c")).is_some());
    }

    #[test]
    fn test_replacing_entry_does_not_evict() {
        let cache = ExtractCache::new(2);

        cache.put(key("a"), table(1));
        cache.put(key("b"), table(1));
        cache.put(key("a"), table(4));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&key("a")).unwrap().rows.len(), 4);
        assert!(cache.get(&key("b")).is_some());
    }

    #[test]
    fn test_repeated_reads_keep_queue_bounded() {
        let cache = ExtractCache::new(2);
        cache.put(key("a"), table(1));

        for _ in 0..10_000 {
            assert!(cache.get(&key("a")).is_some());
        }

        let stats = cache.stats();
        assert_eq!(stats.entry_count, 1);
        assert!(stats.queued_accesses <= 2 * QUEUE_COMPACT_FACTOR + 1, "queue grew to {}", stats.queued_accesses);
    }

    #[test]
    fn test_cache_concurrent_access() {
        use std::thread;

        let cache = ExtractCache::new(50);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache_clone = cache.clone();
                thread::spawn(move || {
                    for j in 0..50 {
                        let k = key(&format!("{}-{}", i, j));
                        cache_clone.put(k.clone(), table(1));
                        let _ = cache_clone.get(&k);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        // a put racing another may overshoot by one entry per thread
        assert!(cache.len() <= 50 + 8);
    }

    #[test]
    fn test_cache_clear_and_stats() {
        let cache = ExtractCache::new(10);
        cache.put(key("a"), table(2));
        cache.put(key("b"), table(3));

        let stats = cache.stats();
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.total_rows, 5);
        assert_eq!(stats.max_entries, 10);

        cache.clear();
        assert!(cache.is_empty());
    }
}
