//! Short-lived, process-local memoization of catalog responses.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde_json::Value;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Best-effort response cache. Never relied upon for consistency.
pub trait Cache<V>: Send + Sync {
    fn get(&self, key: &str) -> Option<V>;
    fn put(&self, key: String, value: V);
    fn evict(&self, key: &str);
}

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// TTL cache: an entry lives for `ttl` from the moment it was stored,
/// regardless of how often it is read. Unbounded.
pub struct ResponseCache<V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V> ResponseCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V> Cache<V> for ResponseCache<V>
where
    V: Clone + Send,
{
    fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let fresh = {
            let entry = entries.get(key)?;
            now.saturating_duration_since(entry.stored_at) <= self.ttl
        };
        if fresh {
            entries.get(key).map(|e| e.value.clone())
        } else {
            entries.remove(key);
            None
        }
    }

    fn put(&self, key: String, value: V) {
        let stored_at = self.clock.now();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Entry { value, stored_at });
    }

    fn evict(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

/// Cache that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl<V> Cache<V> for NoCache {
    fn get(&self, _key: &str) -> Option<V> {
        None
    }

    fn put(&self, _key: String, _value: V) {}

    fn evict(&self, _key: &str) {}
}

/// Deterministic key for `endpoint` called with `params`. Parameter order
/// does not matter.
pub fn cache_key(endpoint: &str, params: &BTreeMap<String, String>) -> String {
    let encoded: serde_json::Map<String, Value> = params
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    format!("{}:{}", endpoint, Value::Object(encoded))
}

/// Clock that only moves when told to. Used to drive expiry in tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn entries_expire_after_ttl() {
        let clock = Arc::new(ManualClock::new());
        let cache = ResponseCache::with_clock(DEFAULT_TTL, clock.clone());
        cache.put("k".to_owned(), 1u32);

        clock.advance(Duration::from_secs(299));
        assert_eq!(cache.get("k"), Some(1));

        // The boundary itself is still fresh.
        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get("k"), Some(1));

        clock.advance(Duration::from_millis(1));
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn reads_do_not_extend_lifetime() {
        let clock = Arc::new(ManualClock::new());
        let cache = ResponseCache::with_clock(Duration::from_secs(10), clock.clone());
        cache.put("k".to_owned(), "v".to_owned());
        for _ in 0..3 {
            clock.advance(Duration::from_secs(4));
            cache.get("k");
        }
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn put_overwrites_and_restarts_ttl() {
        let clock = Arc::new(ManualClock::new());
        let cache = ResponseCache::with_clock(Duration::from_secs(10), clock.clone());
        cache.put("k".to_owned(), 1);
        clock.advance(Duration::from_secs(8));
        cache.put("k".to_owned(), 2);
        clock.advance(Duration::from_secs(8));
        assert_eq!(cache.get("k"), Some(2));

        cache.evict("k");
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn no_cache_never_hits() {
        let cache = NoCache;
        Cache::<u32>::put(&cache, "k".to_owned(), 1);
        assert_eq!(Cache::<u32>::get(&cache, "k"), None);
    }

    #[test]
    fn keys_ignore_parameter_order() {
        let mut a = BTreeMap::new();
        a.insert("limit".to_owned(), "10".to_owned());
        a.insert("offset".to_owned(), "0".to_owned());
        let mut b = BTreeMap::new();
        b.insert("offset".to_owned(), "0".to_owned());
        b.insert("limit".to_owned(), "10".to_owned());

        assert_eq!(cache_key("datasets", &a), cache_key("datasets", &b));
        assert_eq!(
            cache_key("datasets", &a),
            r#"datasets:{"limit":"10","offset":"0"}"#
        );
        assert_ne!(cache_key("datasets", &a), cache_key("resource:x", &a));
    }
}
