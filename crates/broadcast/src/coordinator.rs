//! Observer registry and on-demand refresh loop.
//!
//! The coordinator owns the set of live observers and one refresh task.
//! The task exists only while at least one observer is registered: the
//! first subscription starts it (with an immediate refresh), removing the
//! last one stops it, so an idle process puts zero load on the backing
//! store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::snapshot::DashboardSnapshot;
use crate::source::SnapshotSource;

/// Default interval between snapshot refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Handle for one registered observer.
///
/// Receive snapshots via [`recv`](Subscription::recv). Dropping the
/// subscription deregisters the observer; when the last one goes, the
/// refresh timer stops.
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<Arc<DashboardSnapshot>>,
    inner: Arc<Inner>,
}

impl Subscription {
    /// Wait for the next broadcast snapshot.
    ///
    /// Returns `None` only if the coordinator goes away first.
    pub async fn recv(&mut self) -> Option<Arc<DashboardSnapshot>> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.inner.remove_subscriber(self.id);
    }
}

struct Inner {
    source: Arc<dyn SnapshotSource>,
    interval: Duration,
    subscribers: Mutex<HashMap<u64, mpsc::UnboundedSender<Arc<DashboardSnapshot>>>>,
    next_id: AtomicU64,
    /// In-flight guard: an overlapping refresh trigger is skipped entirely,
    /// never queued, bounding backing-store load to one fetch at a time.
    refreshing: AtomicBool,
    latest: RwLock<Option<Arc<DashboardSnapshot>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    async fn refresh_and_broadcast(&self) {
        if self.refreshing.swap(true, Ordering::SeqCst) {
            tracing::debug!("Snapshot refresh already in flight, skipping");
            return;
        }

        match self.source.fetch().await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *self.latest.write().expect("latest lock poisoned") = Some(Arc::clone(&snapshot));

                let subscribers = self.subscribers.lock().expect("subscriber lock poisoned");
                let mut delivered = 0usize;
                for (id, tx) in subscribers.iter() {
                    // A closed channel means the observer is gone but its
                    // Drop has not run yet; skip it, the rest still receive.
                    if tx.send(Arc::clone(&snapshot)).is_err() {
                        tracing::debug!(subscriber = id, "Skipping closed subscriber");
                    } else {
                        delivered += 1;
                    }
                }
                tracing::debug!(delivered, "Broadcast snapshot delivered");
            }
            Err(e) => {
                // Subscribers keep their last-seen snapshot; no error frame
                // is pushed.
                tracing::warn!(error = %e, "Snapshot refresh failed, skipping broadcast");
            }
        }

        self.refreshing.store(false, Ordering::SeqCst);
    }

    fn remove_subscriber(&self, id: u64) {
        let mut subscribers = self.subscribers.lock().expect("subscriber lock poisoned");
        subscribers.remove(&id);
        if subscribers.is_empty() {
            if let Some(handle) = self.timer.lock().expect("timer lock poisoned").take() {
                handle.abort();
                tracing::debug!("Last subscriber left, refresh timer stopped");
            }
        }
    }
}

/// Maintains the current dashboard snapshot and pushes it to every live
/// observer.
///
/// Cheaply cloneable; all clones share one observer registry and timer.
#[derive(Clone)]
pub struct BroadcastCoordinator {
    inner: Arc<Inner>,
}

impl BroadcastCoordinator {
    pub fn new(source: Arc<dyn SnapshotSource>) -> Self {
        Self::with_interval(source, DEFAULT_REFRESH_INTERVAL)
    }

    pub fn with_interval(source: Arc<dyn SnapshotSource>, interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                interval,
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                refreshing: AtomicBool::new(false),
                latest: RwLock::new(None),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Register an observer for every future snapshot.
    ///
    /// The first subscriber starts the refresh timer and triggers one
    /// immediate refresh. Fan-out order across observers is unspecified.
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        let started = {
            let mut subscribers = self
                .inner
                .subscribers
                .lock()
                .expect("subscriber lock poisoned");
            subscribers.insert(id, tx);
            subscribers.len() == 1
        };

        if started {
            let inner = Arc::clone(&self.inner);
            let handle = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(inner.interval);
                // Ticks that land while a refresh is still running are
                // dropped, not queued.
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    inner.refresh_and_broadcast().await;
                }
            });
            *self.inner.timer.lock().expect("timer lock poisoned") = Some(handle);
            tracing::debug!("First subscriber joined, refresh timer started");
        }

        Subscription {
            id,
            rx,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Current snapshot for a newly connected observer.
    ///
    /// Reads through the snapshot source (a cache hit when a refresh ran
    /// recently); if the source fails, falls back to the last broadcast
    /// snapshot so a connect during a store outage still gets data.
    pub async fn current(&self) -> anyhow::Result<Arc<DashboardSnapshot>> {
        match self.inner.source.fetch().await {
            Ok(snapshot) => Ok(Arc::new(snapshot)),
            Err(e) => {
                let latest = self
                    .inner
                    .latest
                    .read()
                    .expect("latest lock poisoned")
                    .clone();
                match latest {
                    Some(snapshot) => {
                        tracing::warn!(error = %e, "Snapshot fetch failed, serving last broadcast");
                        Ok(snapshot)
                    }
                    None => Err(e),
                }
            }
        }
    }

    /// Number of currently registered observers.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::snapshot::{summarize, DashboardSnapshot};

    /// Source fake that counts fetches, tracks overlap, and can be told to
    /// fail or stall.
    struct MockSource {
        fetches: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail: AtomicBool,
        delay: Duration,
    }

    impl MockSource {
        fn new() -> Self {
            Self {
                fetches: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                delay: Duration::ZERO,
            }
        }

        fn with_delay(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::new()
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SnapshotSource for MockSource {
        async fn fetch(&self) -> anyhow::Result<DashboardSnapshot> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("store unreachable");
            }
            Ok(DashboardSnapshot {
                engines: vec![],
                events: vec![],
                summary: summarize(&[]),
                generated_at: Utc::now() + chrono::Duration::seconds(n as i64),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn no_subscribers_means_no_refreshes() {
        let source = Arc::new(MockSource::new());
        let _coordinator = BroadcastCoordinator::new(Arc::clone(&source) as Arc<dyn SnapshotSource>);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(source.fetch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn first_subscriber_gets_an_immediate_refresh_then_interval_ticks() {
        let source = Arc::new(MockSource::new());
        let coordinator =
            BroadcastCoordinator::new(Arc::clone(&source) as Arc<dyn SnapshotSource>);

        let mut sub = coordinator.subscribe();

        let first = sub.recv().await.expect("first snapshot");
        assert_eq!(source.fetch_count(), 1);

        let second = sub.recv().await.expect("second snapshot");
        assert_eq!(source.fetch_count(), 2);
        assert!(second.generated_at > first.generated_at);
    }

    #[tokio::test(start_paused = true)]
    async fn two_subscribers_share_one_fetch_and_one_snapshot() {
        let source = Arc::new(MockSource::new());
        let coordinator =
            BroadcastCoordinator::new(Arc::clone(&source) as Arc<dyn SnapshotSource>);

        let mut sub_a = coordinator.subscribe();
        let mut sub_b = coordinator.subscribe();

        let snap_a = sub_a.recv().await.expect("snapshot for a");
        let snap_b = sub_b.recv().await.expect("snapshot for b");

        assert_eq!(source.fetch_count(), 1);
        assert!(Arc::ptr_eq(&snap_a, &snap_b));
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_never_overlap_even_when_work_exceeds_interval() {
        // Each fetch takes 25s against a 10s interval.
        let source = Arc::new(MockSource::with_delay(Duration::from_secs(25)));
        let coordinator = BroadcastCoordinator::with_interval(
            Arc::clone(&source) as Arc<dyn SnapshotSource>,
            Duration::from_secs(10),
        );

        let mut sub = coordinator.subscribe();
        for _ in 0..3 {
            sub.recv().await.expect("snapshot");
        }

        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_last_subscriber_stops_the_timer() {
        let source = Arc::new(MockSource::new());
        let coordinator =
            BroadcastCoordinator::new(Arc::clone(&source) as Arc<dyn SnapshotSource>);

        let mut sub = coordinator.subscribe();
        sub.recv().await.expect("snapshot");
        let fetches_before = source.fetch_count();

        drop(sub);
        assert_eq!(coordinator.subscriber_count(), 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(source.fetch_count(), fetches_before);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_skips_broadcast_and_recovers() {
        let source = Arc::new(MockSource::new());
        let coordinator =
            BroadcastCoordinator::new(Arc::clone(&source) as Arc<dyn SnapshotSource>);

        let mut sub = coordinator.subscribe();
        let first = sub.recv().await.expect("first snapshot");

        source.fail.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(15)).await;
        source.fail.store(false, Ordering::SeqCst);

        // The failing tick produced no frame; the next success does.
        let next = sub.recv().await.expect("snapshot after recovery");
        assert!(next.generated_at > first.generated_at);
        assert!(source.fetch_count() >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn a_dead_subscriber_does_not_block_the_others() {
        let source = Arc::new(MockSource::new());
        let coordinator =
            BroadcastCoordinator::new(Arc::clone(&source) as Arc<dyn SnapshotSource>);

        let mut alive = coordinator.subscribe();
        let mut dead = coordinator.subscribe();
        alive.recv().await.expect("snapshot");
        dead.recv().await.expect("snapshot");

        // Close the receiving end without deregistering.
        dead.rx.close();

        let next = alive.recv().await;
        assert!(next.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn resubscribing_restarts_the_timer() {
        let source = Arc::new(MockSource::new());
        let coordinator =
            BroadcastCoordinator::new(Arc::clone(&source) as Arc<dyn SnapshotSource>);

        let mut sub = coordinator.subscribe();
        sub.recv().await.expect("snapshot");
        drop(sub);

        let mut sub = coordinator.subscribe();
        assert!(sub.recv().await.is_some());
    }
}
