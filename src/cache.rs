//! Response cache over an optional external Redis-protocol store.
//!
//! The cache is strictly an accelerator: every failure path degrades to
//! a miss or a no-op, and the service keeps answering without it. Keys
//! are normalized so logically-equal inputs share entries, values carry
//! their write time, and expiry rides on the store's own per-key TTL.
//! Only successfully-produced results are written; errors are never
//! cached.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use serde_json::{json, Value};
use thiserror::Error;

/// Per-operation entry lifetimes, in seconds.
pub mod ttl {
    pub const UNIVERSITY_SCORE: u64 = 12 * 60 * 60;
    pub const BUDGET: u64 = 24 * 60 * 60;
    pub const OVERALL: u64 = 12 * 60 * 60;
    pub const DOCUMENTS: u64 = 24 * 60 * 60;
    pub const COMPARE: u64 = 12 * 60 * 60;
}

/// Build a cache key from ordered parts. Each part is lower-cased with
/// internal whitespace collapsed to single spaces; empty parts are
/// dropped and survivors joined with `:`.
pub fn normalize_key(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| normalize_part(part))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(":")
}

fn normalize_part(part: &str) -> String {
    let lowered = part.to_lowercase();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A cached payload and its write time (epoch milliseconds).
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: Value,
    pub cached_at: i64,
}

/// Internal adapter failure. Always logged and swallowed at the
/// [`ResponseCache`] boundary; callers only ever observe a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

// ============ Backend seam ============

/// Raw string store underneath the response cache. Implemented by the
/// Redis client in production and by in-memory doubles in tests.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError>;
}

struct RedisBackend {
    client: redis::Client,
}

impl RedisBackend {
    fn open(url: &str) -> Result<Self, CacheError> {
        Ok(Self {
            client: redis::Client::open(url)?,
        })
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }
}

/// In-memory [`CacheBackend`] with real TTL bookkeeping. Used by tests
/// and usable for single-process setups without an external store.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, StoredEntry>>,
}

struct StoredEntry {
    value: String,
    expires_at_ms: i64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of unexpired entries.
    pub fn len(&self) -> usize {
        let now = Utc::now().timestamp_millis();
        let entries = self.entries.lock().unwrap();
        entries.values().filter(|e| e.expires_at_ms > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Utc::now().timestamp_millis();
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at_ms > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let expires_at_ms = Utc::now().timestamp_millis() + (ttl_secs as i64) * 1000;
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.to_string(),
            StoredEntry {
                value: value.to_string(),
                expires_at_ms,
            },
        );
        Ok(())
    }
}

// ============ Cache front ============

/// Fail-open cache front. Disabled is an ordinary value: every read is
/// a miss and every write a no-op.
#[derive(Clone)]
pub struct ResponseCache {
    backend: Option<Arc<dyn CacheBackend>>,
}

impl ResponseCache {
    /// A cache that never hits. Used when no store URL is configured.
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    /// Wrap an explicit backend.
    pub fn with_backend(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Connect to the store at `url`, verifying reachability once.
    /// An absent or blank URL, or a failed connection, yields a
    /// disabled cache; the process still serves.
    pub async fn connect(url: Option<&str>) -> Self {
        let url = match url {
            Some(u) if !u.trim().is_empty() => u.trim().to_string(),
            _ => {
                tracing::info!("no cache store configured, response caching disabled");
                return Self::disabled();
            }
        };
        let backend = match RedisBackend::open(&url) {
            Ok(backend) => backend,
            Err(err) => {
                tracing::warn!(error = %err, "invalid cache store URL, response caching disabled");
                return Self::disabled();
            }
        };
        match backend.client.get_multiplexed_async_connection().await {
            Ok(_) => {
                tracing::info!("response cache connected");
                Self::with_backend(Arc::new(backend))
            }
            Err(err) => {
                tracing::warn!(error = %err, "cache store unreachable, response caching disabled");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Read `key`. Missing, expired, corrupt, and failing reads are all
    /// a miss; this method itself never fails.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let backend = self.backend.as_ref()?;
        let raw = match backend.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!(key, "cache miss");
                return None;
            }
            Err(err) => {
                tracing::warn!(key, error = %err, "cache read failed, treating as miss");
                return None;
            }
        };
        match entry_from_raw(&raw) {
            Some(entry) => {
                tracing::debug!(key, "cache hit");
                Some(entry)
            }
            None => {
                tracing::warn!(key, "corrupt cache entry, treating as miss");
                None
            }
        }
    }

    /// Write `data` under `key` with `ttl_secs` expiry. Failures are
    /// logged and swallowed.
    pub async fn set(&self, key: &str, data: &Value, ttl_secs: u64) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        let entry = json!({ "data": data, "cachedAt": Utc::now().timestamp_millis() });
        if let Err(err) = backend.set_ex(key, &entry.to_string(), ttl_secs).await {
            tracing::warn!(key, error = %err, "cache write failed");
        } else {
            tracing::debug!(key, ttl_secs, "cached response");
        }
    }
}

/// Decode a stored entry. `None` for anything but an object carrying a
/// numeric `cachedAt`.
fn entry_from_raw(raw: &str) -> Option<CacheEntry> {
    let parsed: Value = serde_json::from_str(raw).ok()?;
    let cached_at = parsed.get("cachedAt")?.as_i64()?;
    let data = parsed.get("data").cloned().unwrap_or(Value::Null);
    Some(CacheEntry { data, cached_at })
}
