//! Concurrent registry of encounter sessions.
//!
//! Each session's state is isolated under its own [`SessionId`]; the
//! knowledge base and reasoner are shared read-only across all of them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{info, warn};

use crate::engine::{ClinicalReasoner, EncounterSession};
use crate::error::{ReasoningError, ReasoningResult};
use crate::sink::{SnapshotSink, SnapshotUpdate};
use crate::types::{ReasoningSnapshot, SessionId};

/// Bounded map of active encounter sessions.
pub struct SessionRegistry {
    reasoner: Arc<ClinicalReasoner>,
    sessions: DashMap<SessionId, EncounterSession>,
    /// Slots reserved by sessions that are open or being opened.
    reserved: AtomicUsize,
    max_sessions: usize,
    sink: Option<Arc<dyn SnapshotSink>>,
}

impl SessionRegistry {
    /// Capacity comes from the reasoner's configuration.
    pub fn new(reasoner: Arc<ClinicalReasoner>) -> Self {
        let max_sessions = reasoner.config().max_sessions;
        Self {
            reasoner,
            sessions: DashMap::new(),
            reserved: AtomicUsize::new(0),
            max_sessions,
            sink: None,
        }
    }

    /// Publish every new snapshot to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Open a session under a generated identifier.
    pub fn open(&self) -> ReasoningResult<SessionId> {
        let id = SessionId::generate();
        self.open_with_id(id.clone())?;
        Ok(id)
    }

    /// Open a session under a caller-supplied identifier.
    pub fn open_with_id(&self, id: SessionId) -> ReasoningResult<()> {
        if !self.reserve_slot() {
            warn!(
                limit = self.max_sessions,
                session = %id,
                "Session registry full, rejecting session"
            );
            return Err(ReasoningError::TooManySessions(self.max_sessions));
        }

        match self.sessions.entry(id.clone()) {
            Entry::Occupied(_) => {
                self.release_slot();
                Err(ReasoningError::SessionExists(id.to_string()))
            }
            Entry::Vacant(slot) => {
                slot.insert(EncounterSession::new(id.clone(), Arc::clone(&self.reasoner)));
                info!(session = %id, "Opened encounter session");
                Ok(())
            }
        }
    }

    /// Claim capacity for one session. Checking and claiming is a single
    /// atomic step, so concurrent opens never exceed `max_sessions`.
    fn reserve_slot(&self) -> bool {
        self.reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_sessions).then_some(n + 1)
            })
            .is_ok()
    }

    fn release_slot(&self) {
        self.reserved.fetch_sub(1, Ordering::AcqRel);
    }

    /// Process one segment for a session and publish the resulting snapshot.
    pub fn ingest(&self, id: &SessionId, text: &str) -> ReasoningResult<Arc<ReasoningSnapshot>> {
        let snapshot = {
            let mut session = self
                .sessions
                .get_mut(id)
                .ok_or_else(|| ReasoningError::SessionNotFound(id.to_string()))?;
            session.ingest(text)
        };

        if let Some(sink) = &self.sink {
            sink.publish(SnapshotUpdate {
                session: id.clone(),
                snapshot: Arc::clone(&snapshot),
            });
        }

        Ok(snapshot)
    }

    /// The latest snapshot of a session.
    pub fn snapshot(&self, id: &SessionId) -> ReasoningResult<Arc<ReasoningSnapshot>> {
        self.sessions
            .get(id)
            .map(|session| session.snapshot())
            .ok_or_else(|| ReasoningError::SessionNotFound(id.to_string()))
    }

    /// Remove a session, returning its final snapshot.
    pub fn close(&self, id: &SessionId) -> ReasoningResult<Arc<ReasoningSnapshot>> {
        let (_, session) = self
            .sessions
            .remove(id)
            .ok_or_else(|| ReasoningError::SessionNotFound(id.to_string()))?;
        self.release_slot();
        if let Some(sink) = &self.sink {
            sink.close(id);
        }
        info!(
            session = %id,
            segments = session.segments_processed(),
            "Closed encounter session"
        );
        Ok(session.snapshot())
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .field("max_sessions", &self.max_sessions)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::KnowledgeBase;
    use crate::config::ReasonerConfig;
    use crate::sink::WatchSink;

    fn registry(max_sessions: usize) -> SessionRegistry {
        let config = ReasonerConfig {
            max_sessions,
            ..ReasonerConfig::default()
        };
        let reasoner =
            ClinicalReasoner::new(Arc::new(KnowledgeBase::builtin().unwrap()), config).unwrap();
        SessionRegistry::new(Arc::new(reasoner))
    }

    fn mi_probability(snapshot: &ReasoningSnapshot) -> f64 {
        snapshot
            .hypothesis("Acute Myocardial Infarction")
            .map_or(0.0, |h| h.probability)
    }

    #[test]
    fn sessions_are_isolated() {
        let registry = registry(8);
        let a = registry.open().unwrap();
        let b = registry.open().unwrap();

        registry.ingest(&a, "crushing chest pain with diaphoresis").unwrap();
        registry.ingest(&a, "chest pain radiating to the jaw").unwrap();
        registry.ingest(&b, "mild headache since morning").unwrap();

        let a_snapshot = registry.snapshot(&a).unwrap();
        let b_snapshot = registry.snapshot(&b).unwrap();
        assert_eq!(a_snapshot.segment_index, 2);
        assert_eq!(b_snapshot.segment_index, 1);
        assert!(mi_probability(&a_snapshot) > 0.3);
        assert_eq!(mi_probability(&b_snapshot), 0.0);
    }

    #[test]
    fn unknown_session_is_an_error() {
        let registry = registry(8);
        let ghost = SessionId::new("ghost");
        assert!(matches!(
            registry.ingest(&ghost, "chest pain"),
            Err(ReasoningError::SessionNotFound(_))
        ));
        assert!(registry.snapshot(&ghost).is_err());
        assert!(registry.close(&ghost).is_err());
    }

    #[test]
    fn capacity_is_enforced() {
        let registry = registry(2);
        registry.open().unwrap();
        let second = registry.open().unwrap();
        assert!(matches!(
            registry.open(),
            Err(ReasoningError::TooManySessions(2))
        ));

        registry.close(&second).unwrap();
        assert!(registry.open().is_ok());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let registry = registry(8);
        let id = SessionId::new("bay-4");
        registry.open_with_id(id.clone()).unwrap();
        assert!(matches!(
            registry.open_with_id(id),
            Err(ReasoningError::SessionExists(_))
        ));
    }

    #[test]
    fn close_returns_final_snapshot() {
        let registry = registry(8);
        let id = registry.open().unwrap();
        registry.ingest(&id, "fever and chills").unwrap();
        let last = registry.close(&id).unwrap();
        assert_eq!(last.segment_index, 1);
        assert!(!registry.contains(&id));
        assert!(registry.is_empty());
    }

    #[test]
    fn ingest_publishes_to_sink() {
        let sink = Arc::new(WatchSink::new());
        let registry = registry(8).with_sink(sink.clone());
        let id = registry.open().unwrap();
        let snapshot = registry.ingest(&id, "shortness of breath").unwrap();

        let published = sink.latest(&id).unwrap();
        assert!(Arc::ptr_eq(&published, &snapshot));
    }

    #[test]
    fn sink_keeps_each_session_latest() {
        let sink = Arc::new(WatchSink::new());
        let registry = registry(8).with_sink(sink.clone());
        let a = registry.open().unwrap();
        let b = registry.open().unwrap();

        let a_snapshot = registry.ingest(&a, "crushing chest pain").unwrap();
        let b_snapshot = registry.ingest(&b, "fever and cough").unwrap();

        assert!(Arc::ptr_eq(&sink.latest(&a).unwrap(), &a_snapshot));
        assert!(Arc::ptr_eq(&sink.latest(&b).unwrap(), &b_snapshot));

        registry.close(&a).unwrap();
        assert!(sink.latest(&a).is_none());
        assert!(sink.latest(&b).is_some());
    }

    #[test]
    fn capacity_holds_under_contention() {
        const CAP: usize = 4;
        const THREADS: usize = 32;

        let registry = Arc::new(registry(CAP));
        let barrier = Arc::new(std::sync::Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    registry.open()
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let opened = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(opened, CAP);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, ReasoningError::TooManySessions(CAP))));
        assert_eq!(registry.len(), CAP);
    }

    #[test]
    fn duplicate_open_does_not_leak_capacity() {
        let registry = registry(2);
        let id = SessionId::new("bay-4");
        registry.open_with_id(id.clone()).unwrap();
        for _ in 0..5 {
            assert!(registry.open_with_id(id.clone()).is_err());
        }
        assert!(registry.open().is_ok());
    }

    #[test]
    fn concurrent_sessions_across_threads() {
        let registry = Arc::new(registry(64));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let id = registry.open().unwrap();
                    for _ in 0..3 {
                        registry.ingest(&id, "chest pain and nausea").unwrap();
                    }
                    registry.snapshot(&id).unwrap().segment_index
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 3);
        }
        assert_eq!(registry.len(), 8);
    }
}
