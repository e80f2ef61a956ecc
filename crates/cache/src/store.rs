//! The two-tier cache store.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;

use crate::remote::RemoteStore;

/// Consecutive remote failures tolerated before the remote tier is disabled
/// for the remainder of the process.
const REMOTE_FAILURE_LIMIT: u32 = 3;

/// One in-process cache entry. Expiry is checked at read time; the sweeper
/// only reclaims memory.
#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// Key/value cache with a fast in-process tier and an optional shared
/// remote tier.
///
/// Every value has one logical identity per key: the in-process copy is
/// always written, the remote copy is best-effort. Designed to be wrapped
/// in `Arc` and shared across tasks; the inner map is only ever locked
/// around synchronous operations.
pub struct TieredCache {
    memory: Mutex<HashMap<String, MemoryEntry>>,
    remote: Option<Arc<dyn RemoteStore>>,
    remote_failures: AtomicU32,
    remote_disabled: AtomicBool,
}

impl TieredCache {
    /// Create a cache with no remote tier.
    pub fn new() -> Self {
        Self {
            memory: Mutex::new(HashMap::new()),
            remote: None,
            remote_failures: AtomicU32::new(0),
            remote_disabled: AtomicBool::new(false),
        }
    }

    /// Create a cache mirrored to a shared remote store.
    pub fn with_remote(remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            remote: Some(remote),
            ..Self::new()
        }
    }

    /// The remote tier, unless absent or disabled after repeated failures.
    fn remote(&self) -> Option<&Arc<dyn RemoteStore>> {
        if self.remote_disabled.load(Ordering::Relaxed) {
            return None;
        }
        self.remote.as_ref()
    }

    fn record_remote_failure(&self) {
        let failures = self.remote_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= REMOTE_FAILURE_LIMIT && !self.remote_disabled.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                failures,
                "Remote cache store unreachable, falling back to in-process tier only"
            );
        }
    }

    fn record_remote_success(&self) {
        self.remote_failures.store(0, Ordering::Relaxed);
    }

    /// Get a value.
    ///
    /// Checks the remote tier first while it is healthy; on miss or remote
    /// failure, falls back to the unexpired in-process entry. Returns `None`
    /// otherwise. Remote errors never propagate.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Some(remote) = self.remote() {
            match remote.get(key).await {
                Ok(Some(raw)) => {
                    self.record_remote_success();
                    match serde_json::from_str(&raw) {
                        Ok(value) => return Some(value),
                        Err(e) => {
                            tracing::warn!(key, error = %e, "Undecodable remote cache value");
                        }
                    }
                }
                Ok(None) => {
                    self.record_remote_success();
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "Remote cache get failed");
                    self.record_remote_failure();
                }
            }
        }

        let raw = {
            let memory = self.memory.lock().expect("cache mutex poisoned");
            match memory.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
                _ => None,
            }
        };
        let raw = raw?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Undecodable in-process cache value");
                None
            }
        }
    }

    /// Set a value in both tiers with the same time-to-live.
    ///
    /// The remote write is best-effort; the in-process write always happens,
    /// so the cache stays correct even if the remote store is down for the
    /// entire process lifetime.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let serialized = match serde_json::to_string(value) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(key, error = %e, "Failed to serialize cache value");
                return;
            }
        };

        if let Some(remote) = self.remote() {
            match remote.set_ex(key, &serialized, ttl).await {
                Ok(()) => self.record_remote_success(),
                Err(e) => {
                    tracing::warn!(key, error = %e, "Remote cache set failed");
                    self.record_remote_failure();
                }
            }
        }

        let mut memory = self.memory.lock().expect("cache mutex poisoned");
        memory.insert(
            key.to_string(),
            MemoryEntry {
                value: serialized,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Delete a value: best-effort on the remote tier, synchronous on the
    /// in-process map.
    pub async fn delete(&self, key: &str) {
        if let Some(remote) = self.remote() {
            if let Err(e) = remote.del(key).await {
                tracing::warn!(key, error = %e, "Remote cache delete failed");
                self.record_remote_failure();
            }
        }
        self.memory
            .lock()
            .expect("cache mutex poisoned")
            .remove(key);
    }

    /// Delete every key matching a glob pattern (`*` wildcard).
    pub async fn delete_by_pattern(&self, pattern: &str) {
        if let Some(remote) = self.remote() {
            if let Err(e) = remote.del_pattern(pattern).await {
                tracing::warn!(pattern, error = %e, "Remote cache pattern delete failed");
                self.record_remote_failure();
            }
        }

        let regex = glob_to_regex(pattern);
        let mut memory = self.memory.lock().expect("cache mutex poisoned");
        memory.retain(|key, _| !regex.is_match(key));
    }

    /// Read-through helper: on miss, run `compute`, store the result with
    /// `ttl`, and return it.
    ///
    /// Deliberately not single-flight: concurrent misses may run `compute`
    /// more than once. The computations cached here are cheap, idempotent
    /// aggregate reads, so the extra fetch is an accepted tradeoff.
    /// Only `compute` errors propagate; cache-internal failures do not.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get(key).await {
            return Ok(cached);
        }
        let value = compute().await?;
        self.set(key, &value, ttl).await;
        Ok(value)
    }

    /// Drop expired in-process entries, returning how many were removed.
    ///
    /// Called by the background sweeper; reads already treat expired entries
    /// as absent, so this is purely memory reclamation.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut memory = self.memory.lock().expect("cache mutex poisoned");
        let before = memory.len();
        memory.retain(|_, entry| entry.expires_at > now);
        before - memory.len()
    }
}

impl Default for TieredCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile a glob pattern (`*` wildcard) to an anchored regex for the
/// in-process map.
fn glob_to_regex(pattern: &str) -> regex::Regex {
    let escaped = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    // Only literal characters remain outside the injected `.*`, so the
    // pattern is always valid.
    regex::Regex::new(&format!("^{escaped}$")).expect("escaped glob is a valid regex")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use super::*;
    use crate::remote::RemoteStoreError;

    /// Remote fake that fails every call and counts them.
    #[derive(Default)]
    struct FailingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, RemoteStoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(RemoteStoreError("connection refused".into()))
        }

        async fn set_ex(
            &self,
            _key: &str,
            _value: &str,
            _ttl: Duration,
        ) -> Result<(), RemoteStoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(RemoteStoreError("connection refused".into()))
        }

        async fn del(&self, _key: &str) -> Result<(), RemoteStoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(RemoteStoreError("connection refused".into()))
        }

        async fn del_pattern(&self, _pattern: &str) -> Result<(), RemoteStoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(RemoteStoreError("connection refused".into()))
        }
    }

    /// Remote fake backed by a plain map, ignoring TTLs.
    #[derive(Default)]
    struct MapStore {
        entries: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl RemoteStore for MapStore {
        async fn get(&self, key: &str) -> Result<Option<String>, RemoteStoreError> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set_ex(
            &self,
            key: &str,
            value: &str,
            _ttl: Duration,
        ) -> Result<(), RemoteStoreError> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.into(), value.into());
            Ok(())
        }

        async fn del(&self, key: &str) -> Result<(), RemoteStoreError> {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }

        async fn del_pattern(&self, pattern: &str) -> Result<(), RemoteStoreError> {
            let regex = glob_to_regex(pattern);
            self.entries
                .lock()
                .unwrap()
                .retain(|key, _| !regex.is_match(key));
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn get_after_set_returns_value_until_ttl() {
        let cache = TieredCache::new();
        cache.set("k", &42u32, Duration::from_secs(10)).await;

        assert_eq!(cache.get::<u32>("k").await, Some(42));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get::<u32>("k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn works_when_remote_is_permanently_unreachable() {
        let cache = TieredCache::with_remote(Arc::new(FailingStore::default()));
        cache.set("k", &"v".to_string(), Duration::from_secs(10)).await;

        assert_eq!(cache.get::<String>("k").await, Some("v".into()));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get::<String>("k").await, None);
    }

    #[tokio::test]
    async fn remote_disabled_after_failure_limit() {
        let store = Arc::new(FailingStore::default());
        let cache = TieredCache::with_remote(Arc::clone(&store) as Arc<dyn RemoteStore>);

        for _ in 0..REMOTE_FAILURE_LIMIT {
            let _ = cache.get::<u32>("k").await;
        }
        let calls_at_limit = store.calls.load(Ordering::SeqCst);
        assert_eq!(calls_at_limit, REMOTE_FAILURE_LIMIT as usize);

        // Further operations no longer consult the remote tier.
        let _ = cache.get::<u32>("k").await;
        cache.set("k", &1u32, Duration::from_secs(1)).await;
        assert_eq!(store.calls.load(Ordering::SeqCst), calls_at_limit);
    }

    #[tokio::test]
    async fn remote_hit_wins_over_missing_local_entry() {
        let store = Arc::new(MapStore::default());
        store
            .entries
            .lock()
            .unwrap()
            .insert("k".into(), "7".into());
        let cache = TieredCache::with_remote(store);

        assert_eq!(cache.get::<u32>("k").await, Some(7));
    }

    #[tokio::test]
    async fn delete_removes_from_both_tiers() {
        let store = Arc::new(MapStore::default());
        let cache = TieredCache::with_remote(Arc::clone(&store) as Arc<dyn RemoteStore>);
        cache.set("k", &1u32, Duration::from_secs(60)).await;

        cache.delete("k").await;
        assert_eq!(cache.get::<u32>("k").await, None);
        assert!(store.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_by_pattern_removes_matching_keys_only() {
        let cache = TieredCache::new();
        cache.set("app:a:1", &1u32, Duration::from_secs(60)).await;
        cache.set("app:a:2", &2u32, Duration::from_secs(60)).await;
        cache.set("app:b:1", &3u32, Duration::from_secs(60)).await;

        cache.delete_by_pattern("app:a:*").await;

        assert_eq!(cache.get::<u32>("app:a:1").await, None);
        assert_eq!(cache.get::<u32>("app:a:2").await, None);
        assert_eq!(cache.get::<u32>("app:b:1").await, Some(3));
    }

    #[tokio::test]
    async fn get_or_compute_computes_once_then_serves_cached() {
        let cache = TieredCache::new();
        let computed = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: u32 = cache
                .get_or_compute("k", Duration::from_secs(60), || async {
                    computed.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, std::convert::Infallible>(5)
                })
                .await
                .unwrap();
            assert_eq!(value, 5);
        }
        assert_eq!(computed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn get_or_compute_propagates_compute_errors_without_caching() {
        let cache = TieredCache::new();

        let result: Result<u32, &str> = cache
            .get_or_compute("k", Duration::from_secs(60), || async { Err("boom") })
            .await;
        assert_eq!(result, Err("boom"));

        // The failure was not cached.
        assert_eq!(cache.get::<u32>("k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_only_expired_entries() {
        let cache = TieredCache::new();
        cache.set("short", &1u32, Duration::from_secs(5)).await;
        cache.set("long", &2u32, Duration::from_secs(60)).await;

        tokio::time::advance(Duration::from_secs(10)).await;

        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.get::<u32>("long").await, Some(2));
    }

    #[test]
    fn glob_compiles_literal_metacharacters() {
        let regex = glob_to_regex("app:v1.0:*");
        assert!(regex.is_match("app:v1.0:x"));
        assert!(!regex.is_match("app:v1x0:x"));
    }
}
