//! Bounded LRU cache for parsed syntax trees, keyed by content hash.
//!
//! Each extractor instance owns one of these (~100 entries, per the spec);
//! it is process-local and never touches the Index Store.

use parking_lot::Mutex;
use std::collections::HashMap;

struct Entry<V> {
    value: V,
    recency: u64,
}

pub struct LruCache<V> {
    capacity: usize,
    entries: Mutex<HashMap<String, Entry<V>>>,
    clock: Mutex<u64>,
}

impl<V: Clone> LruCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(HashMap::new()),
            clock: Mutex::new(0),
        }
    }

    fn tick(&self) -> u64 {
        let mut clock = self.clock.lock();
        *clock += 1;
        *clock
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let tick = self.tick();
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(key)?;
        entry.recency = tick;
        Some(entry.value.clone())
    }

    pub fn insert(&self, key: String, value: V) {
        let tick = self.tick();
        let mut entries = self.entries.lock();

        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            if let Some(oldest_key) = entries
                .iter()
                .min_by_key(|(_, e)| e.recency)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest_key);
            }
        }

        entries.insert(key, Entry { value, recency: tick });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used_entry_when_full() {
        let cache: LruCache<u32> = LruCache::new(2);
        cache.insert("a".into(), 1);
        cache.insert("b".into(), 2);
        cache.get("a");
        cache.insert("c".into(), 3);

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.len(), 2);
    }
}
