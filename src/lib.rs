//! fretpath - compound-based practice progression for guitarists
//!
//! A practice exercise is a compound: one value per skill dimension (scale,
//! position, rhythm, note pattern, articulation). fretpath tracks speed per
//! compound, opens neighboring compounds once one is solid, unlocks further
//! dimensions as expansions accumulate, and recommends the next exercise
//! with a weighted random pick over scored candidates.

pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod history;
pub mod storage;

pub use config::{Config, RecommendStrategy};
pub use core::{
    advance, AttemptOutcome, Compound, CompoundId, CompoundStats, Dimension, DimensionKind,
    DimensionSet, DimensionUnlock, ProgressState, Progression, RebuildReport,
};
pub use engine::{
    select, Candidate, CandidateKind, Coach, Factor, RandomSource, Recommendation,
    ScoreBreakdown, SeededRandom, StatusReport,
};
pub use error::{FretpathError, Result};
pub use history::{AttemptEvent, AttemptLog, ATTEMPT_SCHEMA_VERSION};
pub use storage::{FileProgressStore, MemoryProgressStore, ProgressSnapshot, ProgressStore};

// CLI commands
pub use cli::{InitCommand, LogCommand, RebuildCommand, RecommendCommand, StatusCommand};
