//! Candidate scoring for fretpath recommendations.
//!
//! Four independent heuristics, each in [0, 1], combined linearly:
//! - Consolidation: keep repeating the current compound until it is solid
//! - Staleness: revisit compounds not practiced for a while
//! - Readiness: estimated probability of success, with transfer from
//!   compounds one dimension away
//! - Diversity: prefer changing a dimension not varied recently
//!
//! The candidate generator adds recency and struggling boosts on top.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::config::{ProgressionConfig, ScoringConfig, ScoringWeights};
use crate::core::{related, Compound, CompoundId, CompoundStats, DimensionKind};

/// Fixed bounds and boost sizes.
pub mod limits {
    /// Lowest consolidation value of an expanded, unmastered current compound.
    pub const CONSOLIDATION_FLOOR: f64 = 0.2;
    /// Highest consolidation value of an expanded, unmastered current compound.
    pub const CONSOLIDATION_CEILING: f64 = 0.8;
    /// Attempts after which staleness is no longer attenuated.
    pub const STALENESS_FULL_ATTEMPTS: f64 = 3.0;
    /// Diversity value when the change is not among recent changes.
    pub const DIVERSITY: f64 = 0.5;
    /// Practiced compounds needed before the recency boost applies.
    pub const RECENCY_MIN_PRACTICED: usize = 3;
    /// Sessions per unit of recency boost.
    pub const RECENCY_SESSIONS: f64 = 10.0;
    /// Maximum recency boost.
    pub const RECENCY_CAP: f64 = 0.5;
    /// Boost for the STAY candidate of a struggling compound.
    pub const STRUGGLING: f64 = 0.5;
}

/// Consolidation score of `candidate`.
///
/// Nonzero only when the candidate is the current compound. Missing
/// statistics count as not yet expanded.
pub fn consolidation(
    candidate: &Compound,
    current: &Compound,
    current_stats: Option<&CompoundStats>,
    progression: &ProgressionConfig,
) -> f64 {
    if candidate != current {
        return 0.0;
    }

    match current_stats {
        Some(stats) if stats.is_mastered => 0.0,
        Some(stats) if stats.has_expanded => (1.0
            - stats.ema_speed / progression.mastery_threshold)
            .clamp(limits::CONSOLIDATION_FLOOR, limits::CONSOLIDATION_CEILING),
        _ => 1.0,
    }
}

/// Staleness score, attenuated by attempt count.
pub fn staleness(stats: Option<&CompoundStats>, session: u64, window: u64) -> f64 {
    let Some(stats) = stats.filter(|s| s.is_practiced()) else {
        return 1.0;
    };
    let Some(since) = stats.sessions_since(session) else {
        return 1.0;
    };

    let raw = (since as f64 / window.max(1) as f64).min(1.0);
    let attempt_factor = (stats.attempts as f64 / limits::STALENESS_FULL_ATTEMPTS).min(1.0);
    raw * attempt_factor
}

/// Readiness score: direct history first, then transfer from `related`.
pub fn readiness(
    candidate: &Compound,
    stats: Option<&CompoundStats>,
    related: &[&CompoundStats],
    scoring: &ScoringConfig,
    progression: &ProgressionConfig,
) -> f64 {
    if let Some(stats) = stats.filter(|s| s.is_practiced()) {
        return (stats.ema_speed / progression.expansion_threshold).min(1.0);
    }

    let weighted: Vec<f64> = related
        .iter()
        .filter(|r| r.is_practiced())
        .map(|r| r.ema_speed * scoring.transfer_for(r.compound.changed_dimension(candidate)))
        .collect();

    if weighted.is_empty() {
        return scoring.low_readiness;
    }

    let average = weighted.iter().sum::<f64>() / weighted.len() as f64;
    (average / progression.expansion_threshold).min(1.0)
}

/// Diversity score: rewards changing a dimension not among `recent_changes`.
pub fn diversity(candidate: &Compound, current: &Compound, recent_changes: &[DimensionKind]) -> f64 {
    match current.changed_dimension(candidate) {
        Some(kind) if !recent_changes.contains(&kind) => limits::DIVERSITY,
        _ => 0.0,
    }
}

/// Recency boost of a practiced origin compound.
pub fn recency_boost(stats: &CompoundStats, session: u64, practiced_count: usize) -> f64 {
    if practiced_count < limits::RECENCY_MIN_PRACTICED {
        return 0.0;
    }
    let since = stats.sessions_since(session).unwrap_or(0);
    (since as f64 / limits::RECENCY_SESSIONS).min(limits::RECENCY_CAP)
}

/// Struggling boost of a practiced origin compound.
pub fn struggling_boost(stats: &CompoundStats) -> f64 {
    if stats.is_struggling() {
        limits::STRUGGLING
    } else {
        0.0
    }
}

/// One of the four scoring heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    /// Keep working the current compound until it expands.
    Consolidation,
    /// Revisit a compound that has not been practiced for a while.
    Staleness,
    /// How prepared the player is, from the compound's own history or its related compounds.
    Readiness,
    /// Vary a dimension other than the recently changed ones.
    Diversity,
}

impl Factor {
    /// All factors, in tie-break order.
    pub const ALL: [Factor; 4] = [
        Factor::Consolidation,
        Factor::Staleness,
        Factor::Readiness,
        Factor::Diversity,
    ];

    /// Lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Consolidation => "consolidation",
            Self::Staleness => "staleness",
            Self::Readiness => "readiness",
            Self::Diversity => "diversity",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw factor values, boosts, and the weighted total of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Raw consolidation value in [0, 1].
    pub consolidation: f64,
    /// Raw staleness value in [0, 1].
    pub staleness: f64,
    /// Raw readiness value in [0, 1].
    pub readiness: f64,
    /// Raw diversity value in [0, 1].
    pub diversity: f64,
    /// Boost from a recently practiced origin compound.
    pub recency_boost: f64,
    /// Boost from a struggling origin compound.
    pub struggling_boost: f64,
    /// Weighted sum of the factors plus both boosts.
    pub total: f64,
    #[serde(skip)]
    weights: ScoringWeights,
}

impl ScoreBreakdown {
    /// Combine raw values with `weights` and add the boosts.
    pub fn new(
        raw: [f64; 4],
        weights: &ScoringWeights,
        recency_boost: f64,
        struggling_boost: f64,
    ) -> Self {
        let [consolidation, staleness, readiness, diversity] = raw;
        let total = weights.consolidation * consolidation
            + weights.staleness * staleness
            + weights.readiness * readiness
            + weights.diversity * diversity
            + recency_boost
            + struggling_boost;

        Self {
            consolidation,
            staleness,
            readiness,
            diversity,
            recency_boost,
            struggling_boost,
            total,
            weights: weights.clone(),
        }
    }

    /// Breakdown of a synthetic candidate that carries a fixed score.
    pub fn fixed(total: f64) -> Self {
        Self {
            consolidation: 0.0,
            staleness: 0.0,
            readiness: 0.0,
            diversity: 0.0,
            recency_boost: 0.0,
            struggling_boost: 0.0,
            total,
            weights: ScoringWeights::default(),
        }
    }

    /// Raw value of one factor.
    pub fn raw(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Consolidation => self.consolidation,
            Factor::Staleness => self.staleness,
            Factor::Readiness => self.readiness,
            Factor::Diversity => self.diversity,
        }
    }

    /// Weighted contribution of one factor to the total.
    pub fn contribution(&self, factor: Factor) -> f64 {
        let weight = match factor {
            Factor::Consolidation => self.weights.consolidation,
            Factor::Staleness => self.weights.staleness,
            Factor::Readiness => self.weights.readiness,
            Factor::Diversity => self.weights.diversity,
        };
        weight * self.raw(factor)
    }

    /// The factor with the largest weighted contribution.
    ///
    /// Ties go to the earlier factor in [`Factor::ALL`]; `None` when every
    /// contribution is zero.
    pub fn dominant_factor(&self) -> Option<Factor> {
        let mut best: Option<(Factor, f64)> = None;
        for factor in Factor::ALL {
            let value = self.contribution(factor);
            if value > best.map_or(0.0, |(_, v)| v) {
                best = Some((factor, value));
            }
        }
        best.map(|(factor, _)| factor)
    }

    /// One sentence explaining why this candidate scored as it did.
    pub fn rationale(&self) -> String {
        let mut text = match self.dominant_factor() {
            Some(Factor::Consolidation) => {
                "Keep repeating this exercise until it holds up at speed.".to_string()
            }
            Some(Factor::Staleness) => {
                "You haven't played this in a while; it's due for review.".to_string()
            }
            Some(Factor::Readiness) => {
                "Your progress on closely related exercises says you're ready for this."
                    .to_string()
            }
            Some(Factor::Diversity) => {
                "This varies a dimension you haven't changed recently.".to_string()
            }
            None => "No factor stands out; this keeps your practice moving.".to_string(),
        };

        if self.struggling_boost > 0.0 {
            text.push_str(" Recent attempts were slow, so it gets extra attention.");
        }
        text
    }
}

/// Everything the scorers need about the learner's current position.
#[derive(Debug)]
pub struct ScoringContext<'a> {
    scoring: &'a ScoringConfig,
    progression: &'a ProgressionConfig,
    current: &'a Compound,
    practiced: &'a [CompoundStats],
    by_id: HashMap<CompoundId, &'a CompoundStats>,
    session: u64,
    recent_changes: &'a [DimensionKind],
}

impl<'a> ScoringContext<'a> {
    /// Build a context from materialized statistics.
    pub fn new(
        scoring: &'a ScoringConfig,
        progression: &'a ProgressionConfig,
        current: &'a Compound,
        practiced: &'a [CompoundStats],
        session: u64,
        recent_changes: &'a [DimensionKind],
    ) -> Self {
        let by_id = practiced.iter().map(|s| (s.id(), s)).collect();
        Self {
            scoring,
            progression,
            current,
            practiced,
            by_id,
            session,
            recent_changes,
        }
    }

    /// The compound the learner is on.
    pub fn current(&self) -> &'a Compound {
        self.current
    }

    /// Statistics of every practiced compound.
    pub fn practiced(&self) -> &'a [CompoundStats] {
        self.practiced
    }

    /// Current session index.
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Statistics for a compound, if it was practiced.
    pub fn stats(&self, compound: &Compound) -> Option<&'a CompoundStats> {
        self.by_id.get(&compound.id()).copied()
    }

    /// Whether `compound` has been mastered.
    pub fn is_mastered(&self, compound: &Compound) -> bool {
        self.stats(compound).is_some_and(|s| s.is_mastered)
    }

    /// Score `candidate` with the given boosts.
    pub fn score(&self, candidate: &Compound, recency: f64, struggling: f64) -> ScoreBreakdown {
        let stats = self.stats(candidate);
        let current_stats = self.stats(self.current);

        let raw = [
            consolidation(candidate, self.current, current_stats, self.progression),
            staleness(stats, self.session, self.scoring.staleness_window),
            readiness(
                candidate,
                stats,
                &related(candidate, self.practiced),
                self.scoring,
                self.progression,
            ),
            diversity(candidate, self.current, self.recent_changes),
        ];

        ScoreBreakdown::new(raw, &self.scoring.weights, recency, struggling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Compound {
        Compound::new("minor_pentatonic", "e_shape", "quarter", "stepwise", "alternate")
    }

    fn stats(compound: Compound, attempts: u32, ema: f64, last_session: u64) -> CompoundStats {
        let mut s = CompoundStats::new(compound);
        s.attempts = attempts;
        s.ema_speed = ema;
        s.best_speed = ema;
        s.last_speed = ema;
        s.last_practiced_session = Some(last_session);
        s
    }

    // =========================================================================
    // Consolidation
    // =========================================================================

    #[test]
    fn test_consolidation_unexpanded_is_one() {
        let cfg = ProgressionConfig::default();
        for ema in [0.0, 150.0, 399.0] {
            let s = stats(base(), 2, ema, 1);
            assert_eq!(consolidation(&base(), &base(), Some(&s), &cfg), 1.0);
        }
        assert_eq!(consolidation(&base(), &base(), None, &cfg), 1.0);
    }

    #[test]
    fn test_consolidation_mastered_is_zero() {
        let cfg = ProgressionConfig::default();
        let mut s = stats(base(), 5, 500.0, 1);
        s.has_expanded = true;
        s.is_mastered = true;
        assert_eq!(consolidation(&base(), &base(), Some(&s), &cfg), 0.0);
    }

    #[test]
    fn test_consolidation_expanded_is_clamped() {
        let cfg = ProgressionConfig::default();
        let mut s = stats(base(), 3, 420.0, 1);
        s.has_expanded = true;
        // 1 - 420/480 = 0.125, raised to the floor
        assert!((consolidation(&base(), &base(), Some(&s), &cfg) - 0.2).abs() < 1e-9);

        s.ema_speed = 48.0;
        // 1 - 0.1 = 0.9, lowered to the ceiling
        assert!((consolidation(&base(), &base(), Some(&s), &cfg) - 0.8).abs() < 1e-9);

        s.ema_speed = 240.0;
        assert!((consolidation(&base(), &base(), Some(&s), &cfg) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_consolidation_zero_for_other_candidates() {
        let cfg = ProgressionConfig::default();
        let other = base().with(DimensionKind::Scale, "blues");
        assert_eq!(consolidation(&other, &base(), None, &cfg), 0.0);
    }

    // =========================================================================
    // Staleness
    // =========================================================================

    #[test]
    fn test_staleness_unpracticed_is_one() {
        assert_eq!(staleness(None, 5, 10), 1.0);
        let fresh = CompoundStats::new(base());
        assert_eq!(staleness(Some(&fresh), 5, 10), 1.0);
    }

    #[test]
    fn test_staleness_attenuated_by_attempts() {
        let once = stats(base(), 1, 300.0, 0);
        let value = staleness(Some(&once), 10, 10);
        assert!((value - 1.0 / 3.0).abs() < 1e-9);

        let thrice = stats(base(), 3, 300.0, 0);
        assert!((staleness(Some(&thrice), 10, 10) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_staleness_scales_with_sessions() {
        let s = stats(base(), 6, 300.0, 4);
        assert!((staleness(Some(&s), 9, 10) - 0.5).abs() < 1e-9);
        assert_eq!(staleness(Some(&s), 4, 10), 0.0);
        assert_eq!(staleness(Some(&s), 100, 10), 1.0);
    }

    // =========================================================================
    // Readiness
    // =========================================================================

    #[test]
    fn test_readiness_direct_history() {
        let scoring = ScoringConfig::default();
        let cfg = ProgressionConfig::default();
        let s = stats(base(), 2, 200.0, 1);
        assert!((readiness(&base(), Some(&s), &[], &scoring, &cfg) - 0.5).abs() < 1e-9);

        let fast = stats(base(), 2, 900.0, 1);
        assert_eq!(readiness(&base(), Some(&fast), &[], &scoring, &cfg), 1.0);
    }

    #[test]
    fn test_readiness_transfer_from_related() {
        let scoring = ScoringConfig::default();
        let cfg = ProgressionConfig::default();
        let candidate = base().with(DimensionKind::Position, "d_shape");

        let via_scale = stats(candidate.with(DimensionKind::Scale, "blues"), 3, 400.0, 1);
        let via_rhythm = stats(candidate.with(DimensionKind::Rhythm, "eighth"), 3, 400.0, 1);

        // (400 * 0.7 + 400 * 0.6) / 2 / 400 = 0.65
        let value = readiness(&candidate, None, &[&via_scale, &via_rhythm], &scoring, &cfg);
        assert!((value - 0.65).abs() < 1e-9);
    }

    #[test]
    fn test_readiness_default_transfer_for_unconfigured_dimension() {
        let scoring = ScoringConfig::default();
        let cfg = ProgressionConfig::default();
        let candidate = base().with(DimensionKind::Articulation, "legato");
        let origin = stats(base(), 3, 400.0, 1);

        let value = readiness(&candidate, None, &[&origin], &scoring, &cfg);
        assert!((value - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_readiness_without_related_history() {
        let scoring = ScoringConfig::default();
        let cfg = ProgressionConfig::default();
        assert!((readiness(&base(), None, &[], &scoring, &cfg) - 0.3).abs() < 1e-9);
    }

    // =========================================================================
    // Diversity and boosts
    // =========================================================================

    #[test]
    fn test_diversity() {
        let current = base();
        let moved = current.with(DimensionKind::Rhythm, "eighth");
        let jumped = moved.with(DimensionKind::Scale, "blues");

        assert_eq!(diversity(&current, &current, &[]), 0.0);
        assert_eq!(diversity(&moved, &current, &[]), 0.5);
        assert_eq!(diversity(&moved, &current, &[DimensionKind::Rhythm]), 0.0);
        assert_eq!(diversity(&moved, &current, &[DimensionKind::Scale]), 0.5);
        assert_eq!(diversity(&jumped, &current, &[]), 0.0);
    }

    #[test]
    fn test_recency_boost() {
        let s = stats(base(), 2, 300.0, 2);
        assert_eq!(recency_boost(&s, 12, 2), 0.0);
        assert!((recency_boost(&s, 5, 3) - 0.3).abs() < 1e-9);
        assert!((recency_boost(&s, 40, 3) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_struggling_boost() {
        let mut s = stats(base(), 2, 100.0, 2);
        assert_eq!(struggling_boost(&s), 0.0);
        s.struggling_streak = 2;
        assert_eq!(struggling_boost(&s), 0.5);
    }

    // =========================================================================
    // Breakdown
    // =========================================================================

    #[test]
    fn test_breakdown_total_and_dominant_factor() {
        let weights = ScoringWeights::default();
        let b = ScoreBreakdown::new([0.0, 1.0, 0.3, 0.5], &weights, 0.2, 0.0);

        // 0.4 + 0.24 + 0.15 + 0.2
        assert!((b.total - 0.99).abs() < 1e-9);
        assert_eq!(b.dominant_factor(), Some(Factor::Staleness));
        assert!(b.rationale().contains("while"));
    }

    #[test]
    fn test_dominant_factor_ties_and_zero() {
        let weights = ScoringWeights {
            consolidation: 1.0,
            staleness: 1.0,
            readiness: 1.0,
            diversity: 1.0,
        };
        let tied = ScoreBreakdown::new([0.5, 0.5, 0.5, 0.5], &weights, 0.0, 0.0);
        assert_eq!(tied.dominant_factor(), Some(Factor::Consolidation));

        let empty = ScoreBreakdown::fixed(1.0);
        assert_eq!(empty.dominant_factor(), None);
        assert_eq!(empty.total, 1.0);
    }

    #[test]
    fn test_rationale_mentions_struggling() {
        let weights = ScoringWeights::default();
        let b = ScoreBreakdown::new([1.0, 0.0, 0.2, 0.0], &weights, 0.0, 0.5);
        assert_eq!(b.dominant_factor(), Some(Factor::Consolidation));
        assert!(b.rationale().contains("slow"));
    }

    #[test]
    fn test_context_scores_current_and_neighbor() {
        let scoring = ScoringConfig::default();
        let progression = ProgressionConfig::default();
        let current = base();
        let practiced = vec![stats(current.clone(), 1, 300.0, 1)];

        let ctx = ScoringContext::new(&scoring, &progression, &current, &practiced, 1, &[]);

        let stay = ctx.score(&current, 0.0, 0.0);
        assert_eq!(stay.consolidation, 1.0);
        assert_eq!(stay.diversity, 0.0);
        assert!((stay.readiness - 0.75).abs() < 1e-9);

        let neighbor = current.with(DimensionKind::Position, "d_shape");
        let next = ctx.score(&neighbor, 0.0, 0.0);
        assert_eq!(next.consolidation, 0.0);
        assert_eq!(next.staleness, 1.0);
        assert_eq!(next.diversity, 0.5);
        // 300 * 0.8 / 400
        assert!((next.readiness - 0.6).abs() < 1e-9);
    }
}
