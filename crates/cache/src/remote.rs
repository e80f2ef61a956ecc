//! Remote tier collaborator interface.

use std::time::Duration;

use async_trait::async_trait;

/// Opaque failure from the remote store client.
///
/// The tiered cache only logs these and counts them toward the degradation
/// limit; it never inspects them.
#[derive(Debug, thiserror::Error)]
#[error("remote store error: {0}")]
pub struct RemoteStoreError(pub String);

/// Interface to the optional shared external store.
///
/// Values are serialized JSON strings; expiry is the store's concern.
/// Reconnection policy also belongs to the implementing client — the cache
/// itself never schedules reconnect attempts.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch a value. `Ok(None)` is a miss, not a failure.
    async fn get(&self, key: &str) -> Result<Option<String>, RemoteStoreError>;

    /// Store a value with a time-to-live.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), RemoteStoreError>;

    /// Delete a single key.
    async fn del(&self, key: &str) -> Result<(), RemoteStoreError>;

    /// Delete every key matching a glob pattern (`*` wildcard).
    async fn del_pattern(&self, pattern: &str) -> Result<(), RemoteStoreError>;
}
