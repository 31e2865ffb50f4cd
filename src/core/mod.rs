//! Core types and logic for fretpath.
//!
//! This module contains the skill-space data model (dimensions, compounds,
//! per-compound statistics) and the progression state machine.

pub mod compound;
pub mod dimension;
pub mod progression;
pub mod stats;

pub use compound::{Compound, CompoundId};
pub use dimension::{Dimension, DimensionKind, DimensionSet};
pub use progression::{
    advance, validate_speed, AttemptOutcome, DimensionUnlock, Progression, RebuildReport,
};
pub use stats::{related, CompoundStats, ProgressState};
