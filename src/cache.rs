//! Optional response cache consulted before find, query and search calls.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};

use crate::error::{OrmError, Result};

const DEFAULT_TTL_SECONDS: u64 = 3600;
const DEFAULT_MAX_SIZE: usize = 10000;

/// A stored response body with bookkeeping timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Creation time of the remote record, when known.
    pub remote_created_at: Option<DateTime<Utc>>,
    /// Last modification time of the remote record, when known.
    pub remote_updated_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    pub fn new(data: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            data,
            created_at: now,
            updated_at: now,
            remote_created_at: None,
            remote_updated_at: None,
        }
    }

    pub fn with_remote_times(
        mut self,
        created: Option<DateTime<Utc>>,
        updated: Option<DateTime<Utc>>,
    ) -> Self {
        self.remote_created_at = created;
        self.remote_updated_at = updated;
        self
    }
}

/// Key-value store of JSON responses keyed by (kind, key).
///
/// Kinds are the resource name for find-by-id and `Query<Type>` /
/// `Search<Type>` for builder results.
pub trait ResponseCache: Send + Sync {
    fn get(&self, kind: &str, key: &str) -> Result<Option<CacheEntry>>;
    fn put(&self, kind: &str, key: &str, entry: CacheEntry) -> Result<()>;
}

/// Hex MD5 of `content`, used as the key for compiled query text.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(content.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

struct StoredEntry {
    entry: CacheEntry,
    expires_at: Instant,
}

/// In-process cache with a TTL and a size cap.
pub struct MemoryCache {
    entries: RwLock<HashMap<(String, String), StoredEntry>>,
    ttl: Duration,
    max_size: usize,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TTL_SECONDS), DEFAULT_MAX_SIZE)
    }
}

impl MemoryCache {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_size: max_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

fn evict_expired_or_oldest(entries: &mut HashMap<(String, String), StoredEntry>) {
    let now = Instant::now();
    let mut expired: Vec<(String, String)> = entries
        .iter()
        .filter(|(_, stored)| stored.expires_at <= now)
        .map(|(k, _)| k.clone())
        .collect();

    if expired.is_empty() {
        if let Some((oldest_key, _)) = entries.iter().min_by_key(|(_, stored)| stored.expires_at) {
            expired.push(oldest_key.clone());
        }
    }

    for key in expired {
        entries.remove(&key);
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, kind: &str, key: &str) -> Result<Option<CacheEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| OrmError::cache(e.to_string()))?;

        Ok(entries
            .get(&(kind.to_string(), key.to_string()))
            .filter(|stored| stored.expires_at > Instant::now())
            .map(|stored| stored.entry.clone()))
    }

    fn put(&self, kind: &str, key: &str, mut entry: CacheEntry) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| OrmError::cache(e.to_string()))?;

        let cache_key = (kind.to_string(), key.to_string());
        if !entries.contains_key(&cache_key) && entries.len() >= self.max_size {
            evict_expired_or_oldest(&mut entries);
        }

        if let Some(previous) = entries.get(&cache_key) {
            entry.created_at = previous.entry.created_at;
            entry.updated_at = Utc::now();
        }

        entries.insert(
            cache_key,
            StoredEntry {
                entry,
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(())
    }
}
