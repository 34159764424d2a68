//! Bounded key/value cache with least-recently-used eviction and optional
//! expiry.
//!
//! Expired entries are not swept in the background; they are dropped when
//! looked up, or evicted like any other entry once the cache is full.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexMap;

use crate::scheduler::{Clock, SystemClock};

/// Cache limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Maximum number of entries; never less than one.
    pub max: usize,
    /// Entries older than this are unavailable.
    pub max_age: Option<Duration>,
    /// Reset an entry's age whenever it is read.
    pub renewal: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max: usize::MAX,
            max_age: None,
            renewal: false,
        }
    }
}

impl CacheOptions {
    pub fn max(mut self, max: usize) -> Self {
        self.max = max;
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn renewal(mut self, renewal: bool) -> Self {
        self.renewal = renewal;
        self
    }
}

struct CacheItem<V> {
    value: V,
    timestamp: Instant,
}

/// LRU cache keyed by string.
///
/// Entries are kept in an [`IndexMap`] ordered from least to most recently
/// used; hits move an entry to the back and eviction pops the front.
pub struct Cache<V> {
    options: CacheOptions,
    items: IndexMap<String, CacheItem<V>>,
    clock: Arc<dyn Clock>,
}

impl<V> Cache<V> {
    pub fn new(options: CacheOptions) -> Self {
        Self::with_clock(options, Arc::new(SystemClock))
    }

    pub fn with_clock(options: CacheOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            options,
            items: IndexMap::new(),
            clock,
        }
    }

    pub fn options(&self) -> CacheOptions {
        self.options
    }

    /// Change limits; a smaller `max` evicts immediately.
    pub fn set_options(&mut self, options: CacheOptions) {
        self.options = options;
        self.trim();
    }

    /// Insert or overwrite `key`, making it the most recently used entry.
    pub fn set(&mut self, key: impl Into<String>, value: V) -> &V {
        let index = self.insert(key.into(), value);
        &self.items[index].value
    }

    pub fn get(&mut self, key: &str) -> Option<&V> {
        let index = self.touch(key)?;
        Some(&self.items[index].value)
    }

    /// Return the live entry for `key`, creating it with `init` when it is
    /// missing or expired.
    pub fn get_or_insert_with<F>(&mut self, key: &str, init: F) -> &V
    where
        F: FnOnce(&str) -> V,
    {
        let index = match self.touch(key) {
            Some(index) => index,
            None => self.insert(key.to_string(), init(key)),
        };
        &self.items[index].value
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.items.shift_remove(key).map(|item| item.value)
    }

    /// `true` if `key` is present and not expired. Does not refresh order.
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.items
            .get(key)
            .is_some_and(|item| !self.is_expired(item, now))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Stored entries, expired ones included until they are looked up.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Keys from least to most recently used.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    fn insert(&mut self, key: String, value: V) -> usize {
        self.items.shift_remove(&key);
        self.items.insert(
            key,
            CacheItem {
                value,
                timestamp: self.clock.now(),
            },
        );
        self.trim();
        self.items.len() - 1
    }

    /// Move a live entry to the back and return its new index. Expired
    /// entries are dropped.
    fn touch(&mut self, key: &str) -> Option<usize> {
        let now = self.clock.now();
        let (key, mut item) = self.items.shift_remove_entry(key)?;
        if self.is_expired(&item, now) {
            tracing::trace!(key = %key, "cache entry expired");
            return None;
        }
        if self.options.renewal {
            item.timestamp = now;
        }
        let (index, _) = self.items.insert_full(key, item);
        Some(index)
    }

    fn is_expired(&self, item: &CacheItem<V>, now: Instant) -> bool {
        self.options
            .max_age
            .is_some_and(|max_age| now.saturating_duration_since(item.timestamp) > max_age)
    }

    fn trim(&mut self) {
        let max = self.options.max.max(1);
        while self.items.len() > max {
            if let Some((key, _)) = self.items.shift_remove_index(0) {
                tracing::trace!(key = %key, "cache entry evicted");
            }
        }
    }
}

impl<V> Default for Cache<V> {
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}

impl<V> fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("options", &self.options)
            .field("len", &self.items.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualClock;

    fn filled(max: usize, count: usize) -> Cache<usize> {
        let mut cache = Cache::new(CacheOptions::default().max(max));
        for i in 0..count {
            cache.set(i.to_string(), i);
        }
        cache
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = filled(50, 50);
        assert_eq!(cache.len(), 50);

        cache.set("50", 50);
        assert_eq!(cache.len(), 50);
        assert!(cache.get("0").is_none());
        assert_eq!(cache.get("1"), Some(&1));
    }

    #[test]
    fn reads_refresh_recency() {
        let mut cache = filled(50, 50);
        assert_eq!(cache.get("0"), Some(&0));

        cache.set("50", 50);
        assert_eq!(cache.get("0"), Some(&0));
        assert!(cache.get("1").is_none());
    }

    #[test]
    fn overwrite_moves_to_back() {
        let mut cache = filled(3, 3);
        cache.set("0", 100);
        cache.set("3", 3);
        let keys: Vec<_> = cache.keys().collect();
        assert_eq!(keys, vec!["2", "0", "3"]);
        assert_eq!(cache.get("0"), Some(&100));
    }

    #[test]
    fn entries_expire_after_max_age() {
        let clock = ManualClock::new();
        let mut cache = Cache::with_clock(
            CacheOptions::default().max_age(Duration::from_millis(100)),
            Arc::new(clock.clone()),
        );
        cache.set("a", 1);

        clock.advance(Duration::from_millis(100));
        assert!(cache.contains("a"));
        clock.advance(Duration::from_millis(1));
        assert!(!cache.contains("a"));
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn renewal_extends_life_on_read() {
        let clock = ManualClock::new();
        let mut cache = Cache::with_clock(
            CacheOptions::default()
                .max_age(Duration::from_millis(100))
                .renewal(true),
            Arc::new(clock.clone()),
        );
        cache.set("a", 1);

        clock.advance(Duration::from_millis(80));
        assert_eq!(cache.get("a"), Some(&1));
        clock.advance(Duration::from_millis(80));
        assert_eq!(cache.get("a"), Some(&1));
        clock.advance(Duration::from_millis(101));
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn get_or_insert_with_regenerates_expired() {
        let clock = ManualClock::new();
        let mut cache = Cache::with_clock(
            CacheOptions::default().max_age(Duration::from_secs(1)),
            Arc::new(clock.clone()),
        );
        let mut calls = 0;
        let mut load = |key: &str| {
            calls += 1;
            format!("{key}-{calls}")
        };

        assert_eq!(cache.get_or_insert_with("k", &mut load), "k-1");
        assert_eq!(cache.get_or_insert_with("k", &mut load), "k-1");
        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.get_or_insert_with("k", &mut load), "k-2");
    }

    #[test]
    fn shrinking_max_trims() {
        let mut cache = filled(10, 10);
        cache.set_options(cache.options().max(2));
        let keys: Vec<_> = cache.keys().collect();
        assert_eq!(keys, vec!["8", "9"]);

        cache.clear();
        assert!(cache.is_empty());
    }
}
