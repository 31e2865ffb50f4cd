//! Candidate generation for recommendations.
//!
//! Two generators share the same neighbor expansion:
//! - full history (canonical): expand from every practiced compound, then
//!   keep only candidates within one dimension of the current compound
//! - single origin (superseded): expand from the current compound only

use std::collections::HashMap;

use serde::Serialize;

use crate::config::RecommendStrategy;
use crate::core::{Compound, CompoundId, Dimension, DimensionKind};
use crate::engine::scoring::{recency_boost, struggling_boost, ScoreBreakdown, ScoringContext};

/// Score of the synthetic candidate used when nothing else qualifies.
pub const FALLBACK_SCORE: f64 = 1.0;

/// How a candidate relates to the current compound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    /// Repeat the current compound.
    Stay,
    /// Change exactly one dimension.
    Neighbor(DimensionKind),
    /// Synthetic repeat of the current compound when nothing qualified.
    Fallback,
}

/// A scored next-exercise option.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// The compound to practice.
    pub compound: Compound,
    /// Selection score (the breakdown's total).
    pub score: f64,
    /// Per-factor values behind the score.
    pub breakdown: ScoreBreakdown,
    /// How the compound relates to the current one.
    pub kind: CandidateKind,
}

impl Candidate {
    fn scored(compound: Compound, breakdown: ScoreBreakdown, current: &Compound) -> Self {
        let kind = match current.changed_dimension(&compound) {
            Some(dimension) => CandidateKind::Neighbor(dimension),
            None => CandidateKind::Stay,
        };
        Self {
            compound,
            score: breakdown.total,
            breakdown,
            kind,
        }
    }

    /// The synthetic candidate: the current compound at a fixed score.
    pub fn fallback(current: &Compound) -> Self {
        Self {
            compound: current.clone(),
            score: FALLBACK_SCORE,
            breakdown: ScoreBreakdown::fixed(FALLBACK_SCORE),
            kind: CandidateKind::Fallback,
        }
    }

    /// Human-readable reason for this candidate.
    pub fn rationale(&self) -> String {
        match self.kind {
            CandidateKind::Fallback => {
                "Nothing nearby is ready to move to; stay with the current exercise.".to_string()
            }
            _ => self.breakdown.rationale(),
        }
    }
}

/// Insertion-ordered candidate set, deduplicated by identity.
#[derive(Debug, Default)]
struct CandidateSet {
    candidates: Vec<Candidate>,
    index: HashMap<CompoundId, usize>,
}

impl CandidateSet {
    /// Insert, keeping the higher score on collision.
    fn offer(&mut self, candidate: Candidate) {
        let id = candidate.compound.id();
        match self.index.get(&id) {
            Some(&at) => {
                if candidate.score > self.candidates[at].score {
                    self.candidates[at] = candidate;
                }
            }
            None => {
                self.index.insert(id, self.candidates.len());
                self.candidates.push(candidate);
            }
        }
    }

    fn into_vec(self) -> Vec<Candidate> {
        self.candidates
    }
}

/// Builds the scored candidate list for one recommendation.
#[derive(Debug)]
pub struct CandidateGenerator<'a> {
    context: &'a ScoringContext<'a>,
    selectable: &'a [&'a Dimension],
}

impl<'a> CandidateGenerator<'a> {
    /// `selectable` lists the dimensions that may be varied, in tier order.
    pub fn new(context: &'a ScoringContext<'a>, selectable: &'a [&'a Dimension]) -> Self {
        Self {
            context,
            selectable,
        }
    }

    /// Generate with the configured strategy.
    pub fn generate(&self, strategy: RecommendStrategy) -> Vec<Candidate> {
        let candidates = match strategy {
            RecommendStrategy::FullHistory => self.full_history(),
            RecommendStrategy::SingleOrigin => self.single_origin(),
        };
        tracing::debug!(
            strategy = strategy.name(),
            count = candidates.len(),
            "generated candidates"
        );
        candidates
    }

    /// Expand from every practiced compound.
    ///
    /// Never empty: falls back to the current compound at a fixed score.
    pub fn full_history(&self) -> Vec<Candidate> {
        let current = self.context.current();
        let practiced = self.context.practiced();
        let session = self.context.session();
        let mut set = CandidateSet::default();

        for origin in practiced {
            let recency = recency_boost(origin, session, practiced.len());
            let struggling = struggling_boost(origin);

            if !origin.is_mastered {
                self.offer(&mut set, origin.compound.clone(), recency, struggling);
            }

            for dimension in self.selectable {
                if dimension.tier() == 0 && !origin.has_expanded {
                    continue;
                }
                for compound in self.neighbors_of(&origin.compound, dimension) {
                    self.offer(&mut set, compound, recency, 0.0);
                }
            }
        }

        let candidates = set.into_vec();
        if candidates.is_empty() {
            return vec![Candidate::fallback(current)];
        }
        candidates
    }

    /// Expand from the current compound only, without boosts.
    pub fn single_origin(&self) -> Vec<Candidate> {
        let current = self.context.current();
        let stats = self.context.stats(current);
        let expanded = stats.is_some_and(|s| s.has_expanded);
        let mut set = CandidateSet::default();

        if !self.context.is_mastered(current) {
            self.offer(&mut set, current.clone(), 0.0, 0.0);
        }

        for dimension in self.selectable {
            if dimension.tier() == 0 && !expanded {
                continue;
            }
            for compound in self.neighbors_of(current, dimension) {
                self.offer(&mut set, compound, 0.0, 0.0);
            }
        }

        let candidates = set.into_vec();
        if !candidates.is_empty() {
            return candidates;
        }

        match self.first_unmastered_variant(current) {
            Some(compound) => {
                let breakdown = self.context.score(&compound, 0.0, 0.0);
                vec![Candidate::scored(compound, breakdown, current)]
            }
            None => vec![Candidate::fallback(current)],
        }
    }

    /// Unmastered one-dimension variants of `origin` along `dimension`.
    fn neighbors_of(&self, origin: &Compound, dimension: &Dimension) -> Vec<Compound> {
        dimension
            .neighbors(origin.value(dimension.kind()))
            .into_iter()
            .map(|value| origin.with(dimension.kind(), value))
            .filter(|compound| !self.context.is_mastered(compound))
            .collect()
    }

    /// Walk each selectable dimension's neighbors, then its full value list,
    /// for the first unmastered variant of `current`.
    ///
    /// Only one dimension is ever changed. Blending a choice from every
    /// dimension could move several dimensions at once and produce a
    /// candidate more than one dimension away from `current`.
    fn first_unmastered_variant(&self, current: &Compound) -> Option<Compound> {
        self.selectable.iter().find_map(|dimension| {
            let kind = dimension.kind();
            let value = current.value(kind);
            dimension
                .neighbors(value)
                .into_iter()
                .chain(dimension.all_values().iter().map(String::as_str))
                .filter(|v| *v != value)
                .map(|v| current.with(kind, v))
                .find(|compound| !self.context.is_mastered(compound))
        })
    }

    /// Score and insert `compound` if it is within one dimension of current.
    fn offer(&self, set: &mut CandidateSet, compound: Compound, recency: f64, struggling: f64) {
        let current = self.context.current();
        if compound.dimension_distance(current) > 1 {
            return;
        }
        let breakdown = self.context.score(&compound, recency, struggling);
        set.offer(Candidate::scored(compound, breakdown, current));
    }
}
