//! Persisted authorization cache
//!
//! One timestamped record per (website, app) pair in a pluggable key-value
//! store. Every operation is best-effort: storage failures are logged and
//! read as a miss.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use tracing::debug;

use crate::error::CacheError;
use crate::types::{AuthResponse, CachedRecord};

/// Key-value medium backing the cache (browser-style local storage)
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn set_item(&self, key: &str, value: String) -> Result<(), CacheError>;
    fn remove_item(&self, key: &str) -> Result<(), CacheError>;
}

/// Process-local store
#[derive(Clone, Default, Debug)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored keys
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.inner.get(key).map(|v| v.value().clone()))
    }

    fn set_item(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.inner.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), CacheError> {
        self.inner.remove(key);
        Ok(())
    }
}

/// Store keeping one JSON file per key under a directory.
///
/// File names are the SHA-256 of the key so arbitrary ids stay path-safe.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sha256_hex(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: String) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), CacheError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Cache of authorization responses keyed by (website, app)
#[derive(Clone)]
pub struct CacheStore {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore").finish_non_exhaustive()
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl CacheStore {
    /// Create a cache over the given key-value medium
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Cached response for the pair if younger than `ttl_secs`
    pub fn get(&self, website_id: &str, app_id: &str, ttl_secs: u64) -> Option<AuthResponse> {
        self.get_at(website_id, app_id, ttl_secs, now_millis())
    }

    /// `get` evaluated at an explicit time (epoch millis).
    ///
    /// Expired records are purged before returning `None`.
    pub fn get_at(
        &self,
        website_id: &str,
        app_id: &str,
        ttl_secs: u64,
        now_ms: i64,
    ) -> Option<AuthResponse> {
        let key = cache_key(website_id, app_id);

        let raw = match self.store.get_item(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                debug!(cache_key = %key, error = %e, "Failed to read cache");
                return None;
            }
        };

        let record: CachedRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                debug!(cache_key = %key, error = %e, "Ignoring unreadable cache record");
                return None;
            }
        };

        let age_ms = now_ms.saturating_sub(record.timestamp);
        let ttl_ms = i64::try_from(ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        if age_ms > ttl_ms {
            debug!(cache_key = %key, age_ms, ttl_secs, "Cache record expired");
            self.purge(website_id, app_id);
            return None;
        }

        Some(record.data)
    }

    /// Store a response, replacing any previous record for the pair
    pub fn put(&self, website_id: &str, app_id: &str, data: &AuthResponse) {
        self.put_at(website_id, app_id, data, now_millis())
    }

    /// `put` stamped with an explicit time (epoch millis)
    pub fn put_at(&self, website_id: &str, app_id: &str, data: &AuthResponse, now_ms: i64) {
        let key = cache_key(website_id, app_id);
        let record = CachedRecord {
            data: data.clone(),
            timestamp: now_ms,
        };

        let payload = match serde_json::to_string(&record) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(cache_key = %key, error = %e, "Failed to encode cache record");
                return;
            }
        };

        if let Err(e) = self.store.set_item(&key, payload) {
            debug!(cache_key = %key, error = %e, "Failed to write cache");
        }
    }

    /// Remove any record for the pair. Missing records are fine.
    pub fn purge(&self, website_id: &str, app_id: &str) {
        let key = cache_key(website_id, app_id);
        if let Err(e) = self.store.remove_item(&key) {
            debug!(cache_key = %key, error = %e, "Failed to purge cache");
        }
    }
}

/// Storage key for a (website, app) pair
pub fn cache_key(website_id: &str, app_id: &str) -> String {
    format!("koru_auth_{}_{}", website_id, app_id)
}

/// Compute SHA-256 hash of input string, returned as lowercase hex
pub fn sha256_hex(input: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let out = hasher.finalize();
    base16ct::lower::encode_string(&out)
}

/// Current unix time in milliseconds
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
