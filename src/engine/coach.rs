//! The practice coach: recommendation and attempt logging over one store.

use serde::Serialize;

use crate::config::Config;
use crate::core::{
    AttemptOutcome, Compound, CompoundStats, Dimension, DimensionKind, DimensionSet,
    DimensionUnlock, Progression, RebuildReport,
};
use crate::engine::candidates::{Candidate, CandidateGenerator, CandidateKind};
use crate::engine::scoring::{Factor, ScoreBreakdown, ScoringContext};
use crate::engine::selector::{select, RandomSource, ThreadRandom};
use crate::error::Result;
use crate::history::AttemptEvent;
use crate::storage::ProgressStore;

/// The exercise picked for the next attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    /// The compound to practice.
    pub compound: Compound,
    /// Its score.
    pub score: f64,
    /// Raw factor values behind the score.
    pub breakdown: ScoreBreakdown,
    /// How it relates to the current compound.
    pub kind: CandidateKind,
    /// The factor that contributed most.
    pub dominant_factor: Option<Factor>,
    /// One-sentence explanation.
    pub rationale: String,
    /// Size of the candidate pool it was drawn from.
    pub candidates: usize,
    /// Session index of the most recent attempt.
    pub session: u64,
}

impl Recommendation {
    fn from_candidate(candidate: &Candidate, pool: usize, session: u64, fresh: bool) -> Self {
        let rationale = if fresh {
            "Nothing logged yet: start with the entry-point exercise.".to_string()
        } else {
            candidate.rationale()
        };

        Self {
            compound: candidate.compound.clone(),
            score: candidate.score,
            breakdown: candidate.breakdown.clone(),
            kind: candidate.kind,
            dominant_factor: candidate.breakdown.dominant_factor(),
            rationale,
            candidates: pool,
            session,
        }
    }
}

/// Snapshot of overall progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    /// Session counter.
    pub session: u64,
    /// The compound recommendations are anchored on.
    pub current: Compound,
    /// Dimensions unlocked so far, in unlock order.
    pub unlocks: Vec<DimensionUnlock>,
    /// Dimensions still locked.
    pub locked: Vec<DimensionKind>,
    /// Practiced compounds, most recently practiced first.
    pub compounds: Vec<CompoundStats>,
}

/// Facade over a store, the configuration and the dimension set.
#[derive(Debug)]
pub struct Coach<S: ProgressStore> {
    store: S,
    config: Config,
    dimensions: DimensionSet,
}

impl<S: ProgressStore> Coach<S> {
    /// Validate `config` and build a coach over `store`.
    pub fn new(store: S, config: Config) -> Result<Self> {
        config.validate()?;
        let dimensions = DimensionSet::from_config(&config.dimensions)?;
        Ok(Self {
            store,
            config,
            dimensions,
        })
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The configured dimensions.
    pub fn dimensions(&self) -> &DimensionSet {
        &self.dimensions
    }

    fn progression(&self) -> Progression<'_, S> {
        Progression::new(&self.store, &self.dimensions, &self.config.progression)
    }

    /// Parse compound text against the configured dimensions.
    pub fn parse_compound(&self, text: &str) -> Result<Compound> {
        self.dimensions.parse_compound(text)
    }

    /// The most recently practiced compound, or the entry compound.
    pub fn current_compound(&self) -> Result<Compound> {
        Ok(self
            .store
            .last_compound()?
            .unwrap_or_else(|| self.dimensions.entry_compound()))
    }

    /// Dimensions that may currently be varied, in tier order.
    pub fn selectable_dimensions(&self) -> Result<Vec<&Dimension>> {
        self.progression().selectable_dimensions()
    }

    /// Every scored candidate for the next attempt.
    pub fn candidates(&self) -> Result<Vec<Candidate>> {
        let current = self.current_compound()?;
        let practiced = self.store.all_statistics()?;
        let session = self.store.current_session()?;
        let recent = self
            .store
            .recent_dimension_changes(self.config.scoring.diversity_lookback)?;
        let selectable = self.selectable_dimensions()?;

        let context = ScoringContext::new(
            &self.config.scoring,
            &self.config.progression,
            &current,
            &practiced,
            session,
            &recent,
        );
        Ok(CandidateGenerator::new(&context, &selectable).generate(self.config.recommend.strategy))
    }

    /// Recommend the next exercise using the thread-local generator.
    pub fn recommend(&self) -> Result<Recommendation> {
        self.recommend_with(&mut ThreadRandom)
    }

    /// Recommend the next exercise with an explicit random source.
    pub fn recommend_with<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Result<Recommendation> {
        let candidates = self.candidates()?;
        let scores: Vec<f64> = candidates.iter().map(|c| c.score).collect();
        let picked = select(&candidates, &scores, rng)?;

        let session = self.store.current_session()?;
        let fresh = session == 0 && picked.kind == CandidateKind::Fallback;

        tracing::debug!(
            compound = %picked.compound.id(),
            score = picked.score,
            pool = candidates.len(),
            "selected recommendation"
        );

        Ok(Recommendation::from_candidate(
            picked,
            candidates.len(),
            session,
            fresh,
        ))
    }

    /// Log an attempt and apply the state machine.
    pub fn log_attempt(
        &self,
        compound: &Compound,
        speed: f64,
        bpm: Option<u32>,
    ) -> Result<AttemptOutcome> {
        self.progression().log_attempt(compound, speed, bpm)
    }

    /// Overall progress.
    pub fn status(&self) -> Result<StatusReport> {
        let mut compounds = self.store.all_statistics()?;
        compounds.sort_by(|a, b| {
            b.last_practiced_session
                .cmp(&a.last_practiced_session)
                .then_with(|| a.compound.cmp(&b.compound))
        });

        let progression = self.progression();
        let mut locked = Vec::new();
        for dimension in self.dimensions.by_tier() {
            if !progression.is_selectable(dimension.kind())? {
                locked.push(dimension.kind());
            }
        }

        Ok(StatusReport {
            session: self.store.current_session()?,
            current: self.current_compound()?,
            unlocks: self.store.unlocks()?,
            locked,
            compounds,
        })
    }

    /// Recompute all progress by replaying `events`.
    pub fn rebuild(&self, events: &[AttemptEvent]) -> Result<RebuildReport> {
        self.progression().rebuild(events)
    }
}
