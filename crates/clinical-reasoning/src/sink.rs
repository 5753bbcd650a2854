//! Snapshot publication.
//!
//! A [`SnapshotSink`] receives every completed snapshot. The engine never
//! publishes partial results, so a subscriber always sees a whole segment.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use crate::types::{ReasoningSnapshot, SessionId};

/// A completed snapshot tagged with its session.
#[derive(Clone, Debug)]
pub struct SnapshotUpdate {
    pub session: SessionId,
    pub snapshot: Arc<ReasoningSnapshot>,
}

/// Receiver of completed snapshots, such as a UI layer.
pub trait SnapshotSink: Send + Sync {
    fn publish(&self, update: SnapshotUpdate);

    /// Called once a session has been removed from its registry.
    fn close(&self, _session: &SessionId) {}
}

type SnapshotSender = watch::Sender<Option<Arc<ReasoningSnapshot>>>;

/// Publishes each session's latest snapshot on its own `tokio::sync::watch`
/// channel.
///
/// Subscribers only ever observe the most recent snapshot of the session they
/// subscribed to; intermediate snapshots are overwritten if nobody reads them
/// in time. Closing a session drops its channel, which ends its receivers.
#[derive(Debug, Default)]
pub struct WatchSink {
    channels: DashMap<SessionId, SnapshotSender>,
}

impl WatchSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to future snapshots of one session.
    ///
    /// Subscribing before the first publish is allowed; the receiver starts
    /// out holding `None`.
    pub fn subscribe(&self, session: &SessionId) -> watch::Receiver<Option<Arc<ReasoningSnapshot>>> {
        self.channels
            .entry(session.clone())
            .or_insert_with(|| watch::channel(None).0)
            .subscribe()
    }

    /// The most recently published snapshot of a session.
    pub fn latest(&self, session: &SessionId) -> Option<Arc<ReasoningSnapshot>> {
        self.channels
            .get(session)
            .and_then(|sender| sender.borrow().clone())
    }

    /// Sessions with an open channel.
    pub fn sessions(&self) -> Vec<SessionId> {
        self.channels.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl SnapshotSink for WatchSink {
    fn publish(&self, update: SnapshotUpdate) {
        self.channels
            .entry(update.session)
            .or_insert_with(|| watch::channel(None).0)
            .send_replace(Some(update.snapshot));
    }

    fn close(&self, session: &SessionId) {
        self.channels.remove(session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(session: &str, segment: u64) -> SnapshotUpdate {
        let mut snapshot = ReasoningSnapshot::empty("test");
        snapshot.segment_index = segment;
        SnapshotUpdate {
            session: SessionId::new(session),
            snapshot: Arc::new(snapshot),
        }
    }

    fn segment(sink: &WatchSink, session: &str) -> Option<u64> {
        sink.latest(&SessionId::new(session))
            .map(|s| s.segment_index)
    }

    #[test]
    fn latest_is_none_before_publish() {
        let sink = WatchSink::new();
        assert!(sink.latest(&SessionId::new("a")).is_none());
    }

    #[test]
    fn publish_without_subscribers_is_retained() {
        let sink = WatchSink::new();
        sink.publish(update("a", 1));
        sink.publish(update("a", 2));
        assert_eq!(segment(&sink, "a"), Some(2));
    }

    #[test]
    fn sessions_publish_independently() {
        let sink = WatchSink::new();
        sink.publish(update("a", 4));
        sink.publish(update("b", 1));

        assert_eq!(segment(&sink, "a"), Some(4));
        assert_eq!(segment(&sink, "b"), Some(1));
        assert_eq!(sink.sessions().len(), 2);
    }

    #[test]
    fn close_drops_only_that_session() {
        let sink = WatchSink::new();
        sink.publish(update("a", 1));
        sink.publish(update("b", 1));
        sink.close(&SessionId::new("a"));

        assert!(segment(&sink, "a").is_none());
        assert_eq!(segment(&sink, "b"), Some(1));
    }

    #[tokio::test]
    async fn subscriber_sees_only_its_session() {
        let sink = WatchSink::new();
        let mut rx = sink.subscribe(&SessionId::new("encounter-1"));

        sink.publish(update("encounter-2", 7));
        assert!(!rx.has_changed().unwrap());

        sink.publish(update("encounter-1", 3));
        rx.changed().await.unwrap();
        let seen = rx.borrow_and_update().clone().unwrap();
        assert_eq!(seen.segment_index, 3);
    }

    #[tokio::test]
    async fn closing_ends_the_subscription() {
        let sink = WatchSink::new();
        let session = SessionId::new("encounter-1");
        let mut rx = sink.subscribe(&session);

        sink.close(&session);
        assert!(rx.changed().await.is_err());
    }

    #[test]
    fn sink_trait_is_object_safe() {
        fn _takes_sink(_sink: &dyn SnapshotSink) {}
    }
}
