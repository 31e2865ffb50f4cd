//! Per-compound statistics.
//!
//! One row per practiced compound, created lazily on the first attempt and
//! updated by the progression state machine on every attempt after that.

use serde::{Deserialize, Serialize};

use crate::core::compound::{Compound, CompoundId};

/// Mutable counters for one compound.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompoundStats {
    /// The compound these counters belong to.
    pub compound: Compound,
    /// Number of logged attempts.
    pub attempts: u32,
    /// Best speed score ever logged.
    pub best_speed: f64,
    /// Exponential moving average of speed score.
    pub ema_speed: f64,
    /// Speed score of the most recent attempt.
    pub last_speed: f64,
    /// Metronome tempo of the most recent attempt, when one was given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_bpm: Option<u32>,
    /// Consecutive attempts at or above the mastery threshold.
    pub mastery_streak: u32,
    /// Consecutive attempts below the struggling threshold.
    pub struggling_streak: u32,
    /// Whether an attempt has ever reached the expansion threshold.
    pub has_expanded: bool,
    /// Whether the mastery streak has ever reached its required length.
    pub is_mastered: bool,
    /// Session index of the most recent attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_practiced_session: Option<u64>,
}

impl CompoundStats {
    /// Zeroed counters for a compound that has never been practiced.
    pub fn new(compound: Compound) -> Self {
        Self {
            compound,
            attempts: 0,
            best_speed: 0.0,
            ema_speed: 0.0,
            last_speed: 0.0,
            last_bpm: None,
            mastery_streak: 0,
            struggling_streak: 0,
            has_expanded: false,
            is_mastered: false,
            last_practiced_session: None,
        }
    }

    /// Identity of the underlying compound.
    pub fn id(&self) -> CompoundId {
        self.compound.id()
    }

    /// Whether at least one attempt was logged.
    pub fn is_practiced(&self) -> bool {
        self.attempts > 0
    }

    /// Whether the latest attempts fell below the struggling threshold.
    pub fn is_struggling(&self) -> bool {
        self.struggling_streak > 0
    }

    /// Sessions elapsed since the last attempt, or `None` if never practiced.
    pub fn sessions_since(&self, current_session: u64) -> Option<u64> {
        self.last_practiced_session
            .map(|last| current_session.saturating_sub(last))
    }

    /// Derived lifecycle state.
    pub fn state(&self) -> ProgressState {
        if self.is_mastered {
            ProgressState::Mastered
        } else if self.has_expanded {
            ProgressState::Expanded
        } else if self.attempts > 0 {
            ProgressState::Practicing
        } else {
            ProgressState::Unpracticed
        }
    }
}

/// Lifecycle of a compound: `Unpracticed -> Practicing -> Expanded -> Mastered`.
///
/// Struggling is orthogonal and read from [`CompoundStats::is_struggling`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
    /// No attempts yet.
    Unpracticed,
    /// Attempted, never at the expansion threshold.
    Practicing,
    /// Good enough to branch out from.
    Expanded,
    /// Sustained performance above the mastery threshold.
    Mastered,
}

impl ProgressState {
    /// Lowercase display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unpracticed => "unpracticed",
            Self::Practicing => "practicing",
            Self::Expanded => "expanded",
            Self::Mastered => "mastered",
        }
    }
}

/// Rows whose compound is exactly one dimension away from `compound`.
pub fn related<'a, I>(compound: &Compound, rows: I) -> Vec<&'a CompoundStats>
where
    I: IntoIterator<Item = &'a CompoundStats>,
{
    rows.into_iter()
        .filter(|stats| stats.compound.dimension_distance(compound) == 1)
        .collect()
}
