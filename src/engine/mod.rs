//! Recommendation engine for fretpath.
//!
//! Scoring, candidate generation and weighted selection, plus the `Coach`
//! facade that ties them to a store and the progression state machine.

pub mod candidates;
pub mod coach;
pub mod scoring;
pub mod selector;

pub use candidates::{Candidate, CandidateGenerator, CandidateKind, FALLBACK_SCORE};
pub use coach::{Coach, Recommendation, StatusReport};
pub use scoring::{Factor, ScoreBreakdown, ScoringContext};
pub use selector::{
    select, ConstantRandom, FixedSequence, RandomSource, SeededRandom, ThreadRandom,
};
