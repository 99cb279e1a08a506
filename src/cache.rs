//! Process-local query cache.
//!
//! Entries are JSON payloads stored under hierarchical keys such as
//! `["products", "detail", "42"]`. A read is served from the cache only while
//! the entry is younger than the caller's stale time; mutations drop whole
//! subtrees by key prefix.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::Value;

pub type QueryKey = Vec<String>;

/// Builds a key from its segments.
pub fn key<I, S>(parts: I) -> QueryKey
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}

/// How long each class of response stays fresh, in seconds. Zero disables
/// caching for that class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StaleTimes {
    #[serde(default = "default_dashboard_secs")]
    pub dashboard_secs: u64,
    #[serde(default = "default_recent_secs")]
    pub recent_secs: u64,
    #[serde(default = "default_uploads_secs")]
    pub uploads_secs: u64,
    #[serde(default)]
    pub default_secs: u64,
}

fn default_dashboard_secs() -> u64 {
    300
}

fn default_recent_secs() -> u64 {
    120
}

fn default_uploads_secs() -> u64 {
    30
}

impl Default for StaleTimes {
    fn default() -> Self {
        Self {
            dashboard_secs: default_dashboard_secs(),
            recent_secs: default_recent_secs(),
            uploads_secs: default_uploads_secs(),
            default_secs: 0,
        }
    }
}

impl StaleTimes {
    pub fn dashboard(&self) -> Duration {
        Duration::from_secs(self.dashboard_secs)
    }

    pub fn recent(&self) -> Duration {
        Duration::from_secs(self.recent_secs)
    }

    pub fn uploads(&self) -> Duration {
        Duration::from_secs(self.uploads_secs)
    }

    pub fn default_stale(&self) -> Duration {
        Duration::from_secs(self.default_secs)
    }
}

struct Entry {
    value: Value,
    stored_at: Instant,
}

#[derive(Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, Entry>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached body if it is younger than `stale_after`.
    pub fn get_fresh(&self, key: &[String], stale_after: Duration) -> Option<Value> {
        if stale_after.is_zero() {
            return None;
        }
        let entries = self.entries();
        let entry = entries.get(key)?;
        (entry.stored_at.elapsed() < stale_after).then(|| entry.value.clone())
    }

    pub fn put(&self, key: QueryKey, value: Value) {
        self.entries().insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Applies `patch` to an existing entry and marks it fresh. Returns false
    /// when there was nothing cached under `key`.
    pub fn update(&self, key: &[String], patch: impl FnOnce(&mut Value)) -> bool {
        let mut entries = self.entries();
        match entries.get_mut(key) {
            Some(entry) => {
                patch(&mut entry.value);
                entry.stored_at = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Drops every entry whose key starts with `prefix`. Returns how many went.
    pub fn invalidate(&self, prefix: &[&str]) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| {
            key.len() < prefix.len() || key.iter().zip(prefix).any(|(a, b)| a != b)
        });
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fresh_entries_are_served() {
        let cache = QueryCache::new();
        cache.put(key(["dashboard", "metrics"]), json!({"total_products": 1}));
        let hit = cache.get_fresh(&key(["dashboard", "metrics"]), Duration::from_secs(60));
        assert_eq!(hit, Some(json!({"total_products": 1})));
    }

    #[test]
    fn zero_stale_time_never_hits() {
        let cache = QueryCache::new();
        cache.put(key(["products", "list"]), json!([]));
        assert!(cache.get_fresh(&key(["products", "list"]), Duration::ZERO).is_none());
    }

    #[test]
    fn expired_entries_miss() {
        let cache = QueryCache::new();
        cache.put(key(["upload-tasks"]), json!([]));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get_fresh(&key(["upload-tasks"]), Duration::from_millis(1)).is_none());
    }

    #[test]
    fn invalidate_by_prefix() {
        let cache = QueryCache::new();
        cache.put(key(["products", "list", "a"]), json!(1));
        cache.put(key(["products", "detail", "1"]), json!(2));
        cache.put(key(["generation-jobs", "list", "a"]), json!(3));
        cache.put(key(["products-archive"]), json!(4));

        assert_eq!(cache.invalidate(&["products", "list"]), 1);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.invalidate(&["products"]), 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.invalidate(&["nothing"]), 0);
    }

    #[test]
    fn update_patches_in_place() {
        let cache = QueryCache::new();
        let k = key(["products", "detail", "1"]);
        cache.put(k.clone(), json!({"status": "DRAFT", "files": ["a.pdf"]}));
        assert!(cache.update(&k, |v| v["status"] = json!("GENERATED")));
        let v = cache.get_fresh(&k, Duration::from_secs(60)).unwrap();
        assert_eq!(v, json!({"status": "GENERATED", "files": ["a.pdf"]}));
        assert!(!cache.update(&key(["missing"]), |_| {}));
    }

    #[test]
    fn stale_time_defaults() {
        let times: StaleTimes = toml::from_str("recent_secs = 5").unwrap();
        assert_eq!(times.recent_secs, 5);
        assert_eq!(times.dashboard_secs, 300);
        assert_eq!(times.uploads_secs, 30);
        assert_eq!(times.default_secs, 0);
    }
}
