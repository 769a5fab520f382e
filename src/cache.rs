//! Read-through cache shared by the services.
//!
//! The cache is never the system of record: the backing store wins on every
//! miss, and write paths invalidate the affected entry explicitly. Lookup,
//! populate, and invalidate are separate steps in the callers so the
//! invalidation-on-write contract stays visible and testable.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::model::{Guest, WeddingEvent};

/// Composite cache key: entity kind plus identifying value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: &'static str,
    pub id: String,
}

impl CacheKey {
    /// Key for a single guest by id.
    pub fn guest(id: u64) -> Self {
        Self { kind: "guest", id: id.to_string() }
    }

    /// The fixed key for the current event's details.
    pub fn event_details() -> Self {
        Self { kind: "event", id: "details".to_string() }
    }
}

/// Values the cache can materialize.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Guest(Guest),
    Event(WeddingEvent),
}

impl CachedValue {
    /// Extract a guest, if that is what this entry holds.
    pub fn into_guest(self) -> Option<Guest> {
        match self {
            CachedValue::Guest(guest) => Some(guest),
            CachedValue::Event(_) => None,
        }
    }

    /// Extract an event, if that is what this entry holds.
    pub fn into_event(self) -> Option<WeddingEvent> {
        match self {
            CachedValue::Event(event) => Some(event),
            CachedValue::Guest(_) => None,
        }
    }
}

/// Cache abstraction offered to the services.
pub trait Cache: Send + Sync {
    /// Fetch a live entry. Expired entries count as misses.
    fn get(&self, key: &CacheKey) -> Option<CachedValue>;

    /// Insert or replace an entry.
    fn put(&self, key: CacheKey, value: CachedValue);

    /// Drop an entry so the next read goes to the store.
    fn invalidate(&self, key: &CacheKey);
}

struct Entry {
    value: CachedValue,
    inserted_at: Instant,
}

/// In-memory cache with a per-instance TTL. Expired entries are evicted
/// lazily on read.
pub struct TtlCache {
    entries: Mutex<HashMap<CacheKey, Entry>>,
    ttl: Duration,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: Mutex::new(HashMap::new()), ttl }
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let map = self.entries.lock().expect("cache poisoned");
        map.values().filter(|e| e.inserted_at.elapsed() < self.ttl).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for TtlCache {
    fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let mut map = self.entries.lock().expect("cache poisoned");
        match map.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                map.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: CacheKey, value: CachedValue) {
        let mut map = self.entries.lock().expect("cache poisoned");
        map.insert(key, Entry { value, inserted_at: Instant::now() });
    }

    fn invalidate(&self, key: &CacheKey) {
        let mut map = self.entries.lock().expect("cache poisoned");
        map.remove(key);
    }
}
