// Bounded least-recently-used cache for computed analysis results

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use log::debug;

/// Identifies one normalized telemetry request.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub race_id: String,
    pub driver_id: String,
    pub lap: Option<u32>,
    pub sample_rate: usize,
}

/// Fixed-capacity LRU map. Recency is kept in a deque with the most recently
/// used key at the back; the front is evicted first.
#[derive(Debug)]
pub struct AnalysisCache<K, V> {
    capacity: usize,
    entries: HashMap<K, V>,
    recency: VecDeque<K>,
}

impl<K, V> AnalysisCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// A capacity of `0` disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            recency: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_back(k);
            }
        }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        let value = self.entries.get(key).cloned()?;
        self.touch(key);
        Some(value)
    }

    pub fn insert(&mut self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(key.clone(), value).is_some() {
            self.touch(&key);
            return;
        }
        self.recency.push_back(key);
        while self.recency.len() > self.capacity {
            if let Some(evicted) = self.recency.pop_front() {
                self.entries.remove(&evicted);
                debug!("Evicted least recently used cache entry");
            }
        }
    }

    /// Drop every entry matching the predicate.
    pub fn invalidate<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&K) -> bool,
    {
        self.entries.retain(|k, _| !predicate(k));
        let entries = &self.entries;
        self.recency.retain(|k| entries.contains_key(k));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }
}
