//! Serializable progress state shared by the store implementations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{Compound, CompoundId, CompoundStats, DimensionKind, DimensionUnlock};
use crate::history::AttemptEvent;

/// Schema version of the snapshot file.
pub const SNAPSHOT_SCHEMA_VERSION: u8 = 1;

/// Per-attempt change entries kept for the diversity lookback.
pub const CHANGE_HISTORY_LIMIT: usize = 64;

/// Everything a store persists between runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProgressSnapshot {
    /// Schema version for forward compatibility.
    pub v: u8,
    /// Session counter.
    pub session: u64,
    /// Statistics keyed by compound identity.
    pub stats: BTreeMap<CompoundId, CompoundStats>,
    /// Unlocked dimensions in unlock order.
    pub unlocks: Vec<DimensionUnlock>,
    /// Changed dimension of each recent attempt, oldest first.
    pub changes: Vec<Option<DimensionKind>>,
    /// Compound of the most recent attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_compound: Option<Compound>,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            v: SNAPSHOT_SCHEMA_VERSION,
            session: 0,
            stats: BTreeMap::new(),
            unlocks: Vec::new(),
            changes: Vec::new(),
            last_compound: None,
        }
    }
}

impl ProgressSnapshot {
    /// Statistics for one compound.
    pub fn get(&self, id: &CompoundId) -> Option<&CompoundStats> {
        self.stats.get(id)
    }

    /// Practiced compounds in identity order.
    pub fn practiced(&self) -> Vec<CompoundStats> {
        self.stats
            .values()
            .filter(|s| s.is_practiced())
            .cloned()
            .collect()
    }

    /// Whether `kind` has an unlock entry.
    pub fn is_unlocked(&self, kind: DimensionKind) -> bool {
        self.unlocks.iter().any(|u| u.dimension == kind)
    }

    /// Add an unlock entry. Returns false if one already existed.
    pub fn unlock(&mut self, kind: DimensionKind, session: u64) -> bool {
        if self.is_unlocked(kind) {
            return false;
        }
        self.unlocks.push(DimensionUnlock {
            dimension: kind,
            session,
        });
        true
    }

    /// Defined changes among the last `lookback` attempts, most recent first.
    pub fn recent_changes(&self, lookback: usize) -> Vec<DimensionKind> {
        self.changes
            .iter()
            .rev()
            .take(lookback)
            .filter_map(|c| *c)
            .collect()
    }

    /// Store the statistics and history entry of one attempt.
    ///
    /// Also moves the session counter up to the event's session.
    pub fn record(&mut self, event: &AttemptEvent, stats: &CompoundStats) -> CompoundStats {
        self.stats.insert(stats.id(), stats.clone());

        self.changes.push(event.changed);
        if self.changes.len() > CHANGE_HISTORY_LIMIT {
            let excess = self.changes.len() - CHANGE_HISTORY_LIMIT;
            self.changes.drain(..excess);
        }

        self.last_compound = Some(event.compound.clone());
        self.session = self.session.max(event.session);

        stats.clone()
    }
}
