//! Signal channel
//!
//! Process-wide delivery of "I have output for you" announcements. Every
//! target directive owns a [`PendingSignalStore`] held here, so a signal sent
//! to a tool that is not mounted simply waits until a controller for that
//! directive subscribes.
//!
//! Mounted controllers observe their target through a per-target broadcast of
//! [`SignalEvent`]s. Events are published while the store lock is held, so
//! their order always matches the order of store mutations.

use crate::pending::PendingSignalStore;
use itde_core::environment::{Clock, SystemClock};
use itde_core::{IncomingSignal, ToolDirective};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Default per-target event buffer
pub const DEFAULT_TARGET_BUFFER_CAPACITY: usize = 64;

/// Change to a target's pending signals
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignalEvent {
    /// A signal was queued, possibly superseding an older one from the same source
    Queued(IncomingSignal),
    /// One generation of a source's signal left the store
    Withdrawn {
        /// Source whose signal was removed
        source_directive: ToolDirective,
        /// Generation removed
        sequence: u64,
    },
    /// Every pending signal for the target was dropped
    Cleared {
        /// `(source, sequence)` of each generation dropped
        generations: Vec<(ToolDirective, u64)>,
    },
}

struct ChannelInner {
    next_sequence: AtomicU64,
    clock: Arc<dyn Clock>,
    buffer_capacity: usize,
    stores: RwLock<HashMap<ToolDirective, PendingSignalStore>>,
    senders: RwLock<HashMap<ToolDirective, broadcast::Sender<SignalEvent>>>,
}

/// Shared signal channel
///
/// Cheap to clone; clones share the same stores and subscribers.
///
/// # Example
///
/// ```
/// use itde::SignalChannel;
/// use itde_core::ToolDirective;
///
/// let channel = SignalChannel::default();
/// let target = ToolDirective::new("diff-checker");
///
/// channel.notify(ToolDirective::new("base64-encoder"), target.clone(), "Base64");
/// channel.notify(ToolDirective::new("base64-encoder"), target.clone(), "Base64");
///
/// assert_eq!(channel.pending_count(&target), 1);
/// ```
#[derive(Clone)]
pub struct SignalChannel {
    inner: Arc<ChannelInner>,
}

impl Default for SignalChannel {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_BUFFER_CAPACITY)
    }
}

impl std::fmt::Debug for SignalChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalChannel")
            .field("next_sequence", &self.inner.next_sequence.load(Ordering::Relaxed))
            .field("buffer_capacity", &self.inner.buffer_capacity)
            .finish_non_exhaustive()
    }
}

impl SignalChannel {
    /// Channel stamping signals with wall-clock time
    #[must_use]
    pub fn new(buffer_capacity: usize) -> Self {
        Self::with_clock(Arc::new(SystemClock), buffer_capacity)
    }

    /// Channel stamping signals with `clock`
    ///
    /// `buffer_capacity` is clamped to at least 1.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>, buffer_capacity: usize) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                next_sequence: AtomicU64::new(0),
                clock,
                buffer_capacity: buffer_capacity.max(1),
                stores: RwLock::new(HashMap::new()),
                senders: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Announce that `source` has output available for `target`
    ///
    /// Queues the signal in the target's store, replacing any pending signal
    /// from the same source, and notifies the target's subscribers. Works
    /// whether or not a controller for `target` is mounted.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (indicates a panic in another thread)
    #[tracing::instrument(skip_all, fields(source = %source, target = %target))]
    #[allow(clippy::expect_used)]
    pub fn notify(
        &self,
        source: ToolDirective,
        target: ToolDirective,
        source_tool_title: impl Into<String>,
    ) -> IncomingSignal {
        let signal = IncomingSignal {
            source_directive: source,
            source_tool_title: source_tool_title.into(),
            target_directive: target,
            sequence: self.next_sequence(),
            sent_at: self.inner.clock.now(),
        };

        let mut stores = self
            .inner
            .stores
            .write()
            .expect("Signal channel store lock poisoned - indicates a panic in another thread");
        let store = stores.entry(signal.target_directive.clone()).or_default();
        let superseded = store.contains(&signal.source_directive);

        if store.upsert(signal.clone()) {
            metrics::counter!("itde.signals.notified").increment(1);
            if superseded {
                metrics::counter!("itde.signals.superseded").increment(1);
            }
            tracing::info!(
                sequence = signal.sequence,
                superseded,
                pending = store.len(),
                "Signal queued"
            );
            self.publish(&signal.target_directive, SignalEvent::Queued(signal.clone()));
        }

        signal
    }

    /// Subscribe to changes of `target`'s pending signals
    ///
    /// Subscribe before reading [`SignalChannel::pending`] so nothing queued
    /// in between is missed; duplicates are harmless to a
    /// [`PendingSignalStore`] mirror.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (indicates a panic in another thread)
    #[allow(clippy::expect_used)]
    pub fn subscribe(&self, target: &ToolDirective) -> broadcast::Receiver<SignalEvent> {
        if let Some(sender) = self.sender(target) {
            return sender.subscribe();
        }

        let mut senders = self
            .inner
            .senders
            .write()
            .expect("Signal channel sender lock poisoned - indicates a panic in another thread");
        let sender = senders.entry(target.clone()).or_insert_with(|| {
            let (sender, _receiver) = broadcast::channel(self.inner.buffer_capacity);
            sender
        });
        sender.subscribe()
    }

    /// Signals pending for `target`, in arrival order
    #[must_use]
    pub fn pending(&self, target: &ToolDirective) -> Vec<IncomingSignal> {
        self.read_store(target, |store| store.list().to_vec())
    }

    /// Number of signals pending for `target`
    #[must_use]
    pub fn pending_count(&self, target: &ToolDirective) -> usize {
        self.read_store(target, PendingSignalStore::len)
    }

    /// Remove `source`'s signal for `target`; no-op when absent
    pub fn remove(&self, target: &ToolDirective, source: &ToolDirective) -> Option<IncomingSignal> {
        self.write_store(target, |store| {
            let removed = store.remove(source)?;
            self.publish(
                target,
                SignalEvent::Withdrawn {
                    source_directive: removed.source_directive.clone(),
                    sequence: removed.sequence,
                },
            );
            Some(removed)
        })
    }

    /// Remove `source`'s signal only if it is still generation `sequence`
    ///
    /// Returns whether a signal was removed. A newer notification from the same
    /// source that arrived meanwhile stays pending.
    pub fn remove_if_current(
        &self,
        target: &ToolDirective,
        source: &ToolDirective,
        sequence: u64,
    ) -> bool {
        self.write_store(target, |store| {
            let removed = store.remove_if_sequence(source, sequence).is_some();
            if removed {
                self.publish(
                    target,
                    SignalEvent::Withdrawn {
                        source_directive: source.clone(),
                        sequence,
                    },
                );
            }
            removed
        })
    }

    /// Drop every signal pending for `target`, returning how many were dropped
    pub fn clear(&self, target: &ToolDirective) -> usize {
        self.write_store(target, |store| {
            let generations: Vec<_> = store
                .clear()
                .into_iter()
                .map(|signal| (signal.source_directive, signal.sequence))
                .collect();
            let cleared = generations.len();
            if cleared > 0 {
                self.publish(target, SignalEvent::Cleared { generations });
            }
            cleared
        })
    }

    #[allow(clippy::expect_used)]
    fn read_store<T>(
        &self,
        target: &ToolDirective,
        f: impl FnOnce(&PendingSignalStore) -> T,
    ) -> T
    where
        T: Default,
    {
        let stores = self
            .inner
            .stores
            .read()
            .expect("Signal channel store lock poisoned - indicates a panic in another thread");
        stores.get(target).map(f).unwrap_or_default()
    }

    #[allow(clippy::expect_used)]
    fn write_store<T>(
        &self,
        target: &ToolDirective,
        f: impl FnOnce(&mut PendingSignalStore) -> T,
    ) -> T {
        let mut stores = self
            .inner
            .stores
            .write()
            .expect("Signal channel store lock poisoned - indicates a panic in another thread");
        f(stores.entry(target.clone()).or_default())
    }

    fn publish(&self, target: &ToolDirective, event: SignalEvent) {
        if let Some(sender) = self.sender(target) {
            if sender.receiver_count() > 0 {
                let _ = sender.send(event);
            }
        }
    }

    #[allow(clippy::expect_used)]
    fn sender(&self, target: &ToolDirective) -> Option<broadcast::Sender<SignalEvent>> {
        self.inner
            .senders
            .read()
            .expect("Signal channel sender lock poisoned - indicates a panic in another thread")
            .get(target)
            .cloned()
    }

    fn next_sequence(&self) -> u64 {
        self.inner.next_sequence.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itde_testing::test_clock;
    use std::time::Duration;
    use tokio::sync::broadcast::error::TryRecvError;

    const TEST_TIMEOUT: Duration = Duration::from_secs(2);

    fn channel() -> SignalChannel {
        SignalChannel::with_clock(Arc::new(test_clock()), 8)
    }

    fn d(directive: &str) -> ToolDirective {
        ToolDirective::new(directive)
    }

    #[test]
    fn sequences_are_monotonic_across_targets() {
        let channel = channel();
        let first = channel.notify(d("a"), d("t1"), "A");
        let second = channel.notify(d("a"), d("t2"), "A");
        assert!(second.sequence > first.sequence);
        assert_eq!(first.sent_at, test_clock().now());
    }

    #[test]
    fn notify_without_subscriber_queues() {
        let channel = channel();
        channel.notify(d("json-diff"), d("text-whitespace-remover"), "JSON Diff");
        assert_eq!(channel.pending_count(&d("text-whitespace-remover")), 1);
        assert_eq!(channel.pending_count(&d("other")), 0);
    }

    #[tokio::test]
    #[allow(clippy::expect_used)] // Panics: test fails if no event arrives
    async fn subscriber_sees_queue_and_withdrawal() {
        let channel = channel();
        let mut events = channel.subscribe(&d("t"));

        let signal = channel.notify(d("a"), d("t"), "A");
        let queued = tokio::time::timeout(TEST_TIMEOUT, events.recv())
            .await
            .expect("event should arrive")
            .expect("channel should be open");
        assert_eq!(queued, SignalEvent::Queued(signal.clone()));

        assert!(channel.remove_if_current(&d("t"), &d("a"), signal.sequence));
        let withdrawn = events.recv().await.expect("channel should be open");
        assert_eq!(
            withdrawn,
            SignalEvent::Withdrawn {
                source_directive: d("a"),
                sequence: signal.sequence,
            }
        );
    }

    #[test]
    fn events_are_scoped_to_target() {
        let channel = channel();
        let mut events = channel.subscribe(&d("t1"));

        channel.notify(d("a"), d("t2"), "A");
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn stale_remove_keeps_newer_generation() {
        let channel = channel();
        let old = channel.notify(d("a"), d("t"), "A");
        let new = channel.notify(d("a"), d("t"), "A");

        assert!(!channel.remove_if_current(&d("t"), &d("a"), old.sequence));
        assert_eq!(channel.pending(&d("t")), vec![new]);
    }

    #[test]
    fn clear_publishes_dropped_generations_once() {
        let channel = channel();
        let mut events = channel.subscribe(&d("t"));
        let a = channel.notify(d("a"), d("t"), "A");
        let b = channel.notify(d("b"), d("t"), "B");

        assert_eq!(channel.clear(&d("t")), 2);
        assert_eq!(channel.clear(&d("t")), 0);

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }
        let cleared: Vec<_> = received
            .iter()
            .filter(|e| matches!(e, SignalEvent::Cleared { .. }))
            .collect();
        assert_eq!(
            cleared,
            vec![&SignalEvent::Cleared {
                generations: vec![(d("a"), a.sequence), (d("b"), b.sequence)],
            }]
        );
    }

    #[test]
    fn double_remove_is_noop() {
        let channel = channel();
        channel.notify(d("a"), d("t"), "A");
        assert!(channel.remove(&d("t"), &d("a")).is_some());
        assert!(channel.remove(&d("t"), &d("a")).is_none());
    }
}
