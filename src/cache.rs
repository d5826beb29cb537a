//! Generic keyed memo with hit/miss accounting.
//!
//! The build engine keeps three of these per run: the set of directories
//! already created, the file mtime map, and the header-dependency map (see
//! [`crate::builder::context::BuildCtx`]). Iteration order is insertion
//! order, which keeps generated output reproducible.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Counters exposed for verbose diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub puts: u64,
    pub hits: u64,
    pub misses: u64,
    pub clears: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} puts, {} hits, {} misses, {} clears",
            self.puts, self.hits, self.misses, self.clears
        )
    }
}

/// An insertion-ordered key/value memo.
///
/// Overwriting an existing key keeps its original position in the iteration
/// order. Lookups record a hit or miss, so `get` takes `&mut self`.
pub struct Cache<K, V> {
    map: HashMap<K, V>,
    order: Vec<K>,
    stats: CacheStats,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Cache {
            map: HashMap::new(),
            order: Vec::new(),
            stats: CacheStats::default(),
        }
    }

    /// Look up a key, recording a hit or a miss.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.map.get(key) {
            Some(value) => {
                self.stats.hits += 1;
                Some(value)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Insert or overwrite. Does not count as a hit or miss.
    pub fn put(&mut self, key: K, value: V) {
        self.stats.puts += 1;
        if self.map.insert(key.clone(), value).is_none() {
            self.order.push(key);
        }
    }

    /// Membership test without touching the hit/miss counters.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Drop a single entry. Returns whether it was present.
    pub fn clear_entry<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.map.remove(key).is_some() {
            self.order.retain(|k| k.borrow() != key);
            self.stats.clears += 1;
            true
        } else {
            false
        }
    }

    /// Drop every entry.
    pub fn clear_all(&mut self) {
        self.stats.clears += self.map.len() as u64;
        self.map.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order.iter().filter_map(|k| self.map.get_key_value(k))
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

impl<K: Eq + Hash + Clone, V> Default for Cache<K, V> {
    fn default() -> Self {
        Cache::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_records_hits_and_misses() {
        let mut cache: Cache<String, u32> = Cache::new();

        assert!(cache.get("a").is_none());
        cache.put("a".to_string(), 1);
        assert_eq!(cache.get("a"), Some(&1));
        assert_eq!(cache.get("a"), Some(&1));
        assert!(cache.get("b").is_none());

        let stats = cache.stats();
        assert_eq!(stats.puts, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn test_put_overwrites_without_reordering() {
        let mut cache: Cache<&str, u32> = Cache::new();
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("a", 10);

        let keys: Vec<&str> = cache.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(cache.get("a"), Some(&10));
    }

    #[test]
    fn test_iteration_is_insertion_ordered() {
        let mut cache: Cache<String, ()> = Cache::new();
        for name in ["zeta", "alpha", "mid"] {
            cache.put(name.to_string(), ());
        }

        let keys: Vec<&str> = cache.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_clear_entry() {
        let mut cache: Cache<String, u32> = Cache::new();
        cache.put("a".to_string(), 1);
        cache.put("b".to_string(), 2);

        assert!(cache.clear_entry("a"));
        assert!(!cache.clear_entry("a"));
        assert!(!cache.contains("a"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().clears, 1);
    }

    #[test]
    fn test_clear_all() {
        let mut cache: Cache<&str, u32> = Cache::new();
        cache.put("a", 1);
        cache.put("b", 2);
        cache.clear_all();

        assert!(cache.is_empty());
        assert_eq!(cache.stats().clears, 2);
        assert!(cache.get("a").is_none());
    }
}
