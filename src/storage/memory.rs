//! In-memory progress storage for testing.
//!
//! This module provides a thread-safe in-memory implementation of the
//! ProgressStore trait, primarily for use in unit tests.

use std::sync::RwLock;

use crate::core::{Compound, CompoundId, CompoundStats, DimensionKind, DimensionUnlock};
use crate::error::Result;
use crate::history::AttemptEvent;
use crate::storage::{ProgressSnapshot, ProgressStore};

/// In-memory progress store for testing.
///
/// Thread-safe implementation using `RwLock<ProgressSnapshot>`.
/// Progress is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    state: RwLock<ProgressSnapshot>,
    events: RwLock<Vec<AttemptEvent>>,
}

impl MemoryProgressStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with an existing snapshot.
    pub fn from_snapshot(snapshot: ProgressSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
            events: RwLock::new(Vec::new()),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state.read().unwrap().clone()
    }

    /// Attempts recorded since creation or the last replace.
    pub fn events(&self) -> Vec<AttemptEvent> {
        self.events.read().unwrap().clone()
    }

    /// Insert statistics directly, bypassing the state machine.
    pub fn insert_statistics(&self, stats: CompoundStats) {
        self.state.write().unwrap().stats.insert(stats.id(), stats);
    }

    /// Set the session counter directly.
    pub fn set_session(&self, session: u64) {
        self.state.write().unwrap().session = session;
    }
}

impl ProgressStore for MemoryProgressStore {
    fn get_statistics(&self, id: &CompoundId) -> Result<Option<CompoundStats>> {
        Ok(self.state.read().unwrap().get(id).cloned())
    }

    fn all_statistics(&self) -> Result<Vec<CompoundStats>> {
        Ok(self.state.read().unwrap().practiced())
    }

    fn current_session(&self) -> Result<u64> {
        Ok(self.state.read().unwrap().session)
    }

    fn is_dimension_unlocked(&self, kind: DimensionKind) -> Result<bool> {
        Ok(self.state.read().unwrap().is_unlocked(kind))
    }

    fn unlock_dimension(&self, kind: DimensionKind, session: u64) -> Result<()> {
        self.state.write().unwrap().unlock(kind, session);
        Ok(())
    }

    fn unlocks(&self) -> Result<Vec<DimensionUnlock>> {
        Ok(self.state.read().unwrap().unlocks.clone())
    }

    fn recent_dimension_changes(&self, lookback: usize) -> Result<Vec<DimensionKind>> {
        Ok(self.state.read().unwrap().recent_changes(lookback))
    }

    fn last_compound(&self) -> Result<Option<Compound>> {
        Ok(self.state.read().unwrap().last_compound.clone())
    }

    fn record_attempt(&self, event: &AttemptEvent, stats: &CompoundStats) -> Result<CompoundStats> {
        let stored = self.state.write().unwrap().record(event, stats);
        self.events.write().unwrap().push(event.clone());
        Ok(stored)
    }

    fn replace(&self, snapshot: ProgressSnapshot, history: &[AttemptEvent]) -> Result<()> {
        *self.events.write().unwrap() = history.to_vec();
        *self.state.write().unwrap() = snapshot;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::tests::test_progress_store_roundtrip;
    use std::sync::Arc;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryProgressStore::new();
        test_progress_store_roundtrip(&store);
    }

    #[test]
    fn test_arc_store_roundtrip() {
        let store = Arc::new(MemoryProgressStore::new());
        test_progress_store_roundtrip(&store);
    }

    #[test]
    fn test_replace_swaps_events_and_state() {
        let store = MemoryProgressStore::new();
        let compound = Compound::new("blues", "e_shape", "quarter", "stepwise", "alternate");
        let first = AttemptEvent::new(1, compound.clone(), 250.0, None, None);

        store
            .record_attempt(&first, &CompoundStats::new(compound.clone()))
            .unwrap();
        assert_eq!(store.events().len(), 1);
        assert_eq!(store.current_session().unwrap(), 1);

        let history = vec![
            AttemptEvent::new(1, compound.clone(), 300.0, None, None),
            AttemptEvent::new(2, compound, 310.0, None, None),
        ];
        let mut snapshot = ProgressSnapshot::default();
        snapshot.session = 2;

        store.replace(snapshot.clone(), &history).unwrap();
        assert_eq!(store.events(), history);
        assert_eq!(store.snapshot(), snapshot);
    }

    #[test]
    fn test_insert_statistics_and_set_session() {
        let store = MemoryProgressStore::new();
        let compound = Compound::new("blues", "e_shape", "quarter", "stepwise", "alternate");
        let mut stats = CompoundStats::new(compound.clone());
        stats.attempts = 4;

        store.insert_statistics(stats);
        store.set_session(9);

        assert_eq!(store.current_session().unwrap(), 9);
        assert_eq!(
            store.get_statistics(&compound.id()).unwrap().unwrap().attempts,
            4
        );
    }

    #[test]
    fn test_from_snapshot() {
        let mut snapshot = ProgressSnapshot::default();
        snapshot.session = 12;
        snapshot.unlock(DimensionKind::NotePattern, 7);

        let store = MemoryProgressStore::from_snapshot(snapshot.clone());
        assert_eq!(store.snapshot(), snapshot);
        assert!(store
            .is_dimension_unlocked(DimensionKind::NotePattern)
            .unwrap());
    }
}
