//! Progress storage traits for fretpath.
//!
//! This module defines the `ProgressStore` trait: the read/write surface the
//! engine and the progression state machine consume.

use std::sync::Arc;

use crate::core::{related, Compound, CompoundId, CompoundStats, DimensionKind, DimensionUnlock};
use crate::error::Result;
use crate::history::AttemptEvent;
use crate::storage::ProgressSnapshot;

/// Trait for progress storage backends.
///
/// Missing statistics are not an error: `get_statistics` returns `Ok(None)`
/// for a compound that was never practiced.
pub trait ProgressStore: Send + Sync {
    /// Statistics for one compound.
    fn get_statistics(&self, id: &CompoundId) -> Result<Option<CompoundStats>>;

    /// Statistics of every practiced compound (attempts > 0).
    fn all_statistics(&self) -> Result<Vec<CompoundStats>>;

    /// Statistics of practiced compounds exactly one dimension away.
    fn related(&self, compound: &Compound) -> Result<Vec<CompoundStats>> {
        let all = self.all_statistics()?;
        Ok(related(compound, &all).into_iter().cloned().collect())
    }

    /// Index of the most recent session (0 before the first attempt).
    fn current_session(&self) -> Result<u64>;

    /// Whether a dimension has been unlocked.
    ///
    /// Only tracks explicit unlocks; tier-0 dimensions are never stored.
    fn is_dimension_unlocked(&self, kind: DimensionKind) -> Result<bool>;

    /// Record an unlock. Unlocking an already unlocked dimension is a no-op.
    fn unlock_dimension(&self, kind: DimensionKind, session: u64) -> Result<()>;

    /// All unlocks in the order they happened.
    fn unlocks(&self) -> Result<Vec<DimensionUnlock>>;

    /// Dimensions changed by the last `lookback` attempts, most recent first.
    ///
    /// Attempts whose change was undefined contribute nothing.
    fn recent_dimension_changes(&self, lookback: usize) -> Result<Vec<DimensionKind>>;

    /// Compound of the most recent attempt.
    fn last_compound(&self) -> Result<Option<Compound>>;

    /// Persist an attempt together with the compound's updated statistics.
    ///
    /// The session counter moves to `event.session` in the same write, so a
    /// failed call leaves neither the attempt nor a session bump behind.
    /// Returns the statistics as stored.
    fn record_attempt(&self, event: &AttemptEvent, stats: &CompoundStats) -> Result<CompoundStats>;

    /// Swap in a rebuilt snapshot together with the full attempt history.
    ///
    /// The history is committed before the snapshot, so a failure part way
    /// never loses logged attempts.
    fn replace(&self, snapshot: ProgressSnapshot, history: &[AttemptEvent]) -> Result<()>;
}

/// Blanket implementation of ProgressStore for Arc-wrapped stores.
///
/// This allows using `Arc<T>` where `T: ProgressStore` is expected,
/// which is useful for sharing stores between tests and commands.
impl<T: ProgressStore + ?Sized> ProgressStore for Arc<T> {
    fn get_statistics(&self, id: &CompoundId) -> Result<Option<CompoundStats>> {
        (**self).get_statistics(id)
    }

    fn all_statistics(&self) -> Result<Vec<CompoundStats>> {
        (**self).all_statistics()
    }

    fn related(&self, compound: &Compound) -> Result<Vec<CompoundStats>> {
        (**self).related(compound)
    }

    fn current_session(&self) -> Result<u64> {
        (**self).current_session()
    }

    fn is_dimension_unlocked(&self, kind: DimensionKind) -> Result<bool> {
        (**self).is_dimension_unlocked(kind)
    }

    fn unlock_dimension(&self, kind: DimensionKind, session: u64) -> Result<()> {
        (**self).unlock_dimension(kind, session)
    }

    fn unlocks(&self) -> Result<Vec<DimensionUnlock>> {
        (**self).unlocks()
    }

    fn recent_dimension_changes(&self, lookback: usize) -> Result<Vec<DimensionKind>> {
        (**self).recent_dimension_changes(lookback)
    }

    fn last_compound(&self) -> Result<Option<Compound>> {
        (**self).last_compound()
    }

    fn record_attempt(&self, event: &AttemptEvent, stats: &CompoundStats) -> Result<CompoundStats> {
        (**self).record_attempt(event, stats)
    }

    fn replace(&self, snapshot: ProgressSnapshot, history: &[AttemptEvent]) -> Result<()> {
        (**self).replace(snapshot, history)
    }
}
