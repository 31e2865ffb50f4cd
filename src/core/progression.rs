//! Progression and dimension-unlock state machine for fretpath.
//!
//! Every logged attempt runs exactly one transition on the compound's
//! statistics, followed by the tier unlock check. All side effects of an
//! attempt are returned together in an [`AttemptOutcome`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ProgressionConfig;
use crate::core::compound::Compound;
use crate::core::dimension::{Dimension, DimensionKind, DimensionSet};
use crate::core::stats::{CompoundStats, ProgressState};
use crate::error::{FretpathError, Result};
use crate::history::AttemptEvent;
use crate::storage::{MemoryProgressStore, ProgressStore};

/// A dimension becoming selectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionUnlock {
    /// The dimension that was unlocked.
    pub dimension: DimensionKind,
    /// Session index at which it was unlocked.
    pub session: u64,
}

/// Everything that changed because of one attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptOutcome {
    /// Statistics after the attempt.
    pub stats: CompoundStats,
    /// Derived state before the attempt.
    pub previous_state: ProgressState,
    /// Derived state after the attempt.
    pub state: ProgressState,
    /// Session index the attempt was stamped with.
    pub session: u64,
    /// Dimension changed relative to the previous attempt, if exactly one.
    pub changed_dimension: Option<DimensionKind>,
    /// Dimensions unlocked by this attempt.
    pub unlocked: Vec<DimensionUnlock>,
}

impl AttemptOutcome {
    /// Whether this attempt crossed the expansion threshold for the first time.
    pub fn newly_expanded(&self) -> bool {
        self.previous_state < ProgressState::Expanded && self.stats.has_expanded
    }

    /// Whether this attempt completed the mastery streak.
    pub fn newly_mastered(&self) -> bool {
        self.previous_state != ProgressState::Mastered && self.stats.is_mastered
    }
}

/// Counts from a full history replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    /// Events applied.
    pub replayed: usize,
    /// Events dropped because their compound no longer validates.
    pub skipped: usize,
}

/// Reject speed scores that are negative or not finite.
pub fn validate_speed(speed: f64) -> Result<()> {
    if !speed.is_finite() || speed < 0.0 {
        return Err(FretpathError::invalid_input(format!(
            "speed must be a finite, non-negative number, got {}",
            speed
        )));
    }
    Ok(())
}

fn validate_bpm(bpm: Option<u32>) -> Result<()> {
    if bpm == Some(0) {
        return Err(FretpathError::invalid_input("bpm must be at least 1"));
    }
    Ok(())
}

/// Apply one attempt to a compound's statistics.
///
/// Pure: the input is left untouched and the updated copy returned.
pub fn advance(
    stats: &CompoundStats,
    speed: f64,
    bpm: Option<u32>,
    session: u64,
    config: &ProgressionConfig,
) -> CompoundStats {
    let mut next = stats.clone();

    next.attempts += 1;
    next.best_speed = next.best_speed.max(speed);
    next.ema_speed = if next.attempts == 1 {
        speed
    } else {
        config.ema_alpha * speed + (1.0 - config.ema_alpha) * next.ema_speed
    };
    next.last_speed = speed;
    next.last_bpm = bpm;

    if speed >= config.expansion_threshold {
        next.has_expanded = true;
    }

    if speed >= config.mastery_threshold {
        next.mastery_streak += 1;
        if next.mastery_streak >= config.mastery_streak {
            next.is_mastered = true;
            next.has_expanded = true;
        }
    } else {
        next.mastery_streak = 0;
    }

    if speed < config.struggling_threshold {
        next.struggling_streak += 1;
    } else {
        next.struggling_streak = 0;
    }

    next.last_practiced_session = Some(session);
    next
}

/// Progression state machine over a store.
///
/// Owns no state itself; reads and writes go through the borrowed store.
#[derive(Debug)]
pub struct Progression<'a, S: ProgressStore> {
    store: &'a S,
    dimensions: &'a DimensionSet,
    config: &'a ProgressionConfig,
}

impl<'a, S: ProgressStore> Progression<'a, S> {
    /// Create a state machine over `store`.
    pub fn new(store: &'a S, dimensions: &'a DimensionSet, config: &'a ProgressionConfig) -> Self {
        Self {
            store,
            dimensions,
            config,
        }
    }

    /// Log one attempt and apply all of its consequences.
    pub fn log_attempt(
        &self,
        compound: &Compound,
        speed: f64,
        bpm: Option<u32>,
    ) -> Result<AttemptOutcome> {
        self.apply(compound, speed, bpm, Utc::now())
    }

    fn apply(
        &self,
        compound: &Compound,
        speed: f64,
        bpm: Option<u32>,
        ts: DateTime<Utc>,
    ) -> Result<AttemptOutcome> {
        self.dimensions.validate(compound)?;
        validate_speed(speed)?;
        validate_bpm(bpm)?;

        let changed_dimension = self
            .store
            .last_compound()?
            .and_then(|previous| previous.changed_dimension(compound));

        let session = self.store.current_session()? + 1;

        let id = compound.id();
        let current = self
            .store
            .get_statistics(&id)?
            .unwrap_or_else(|| CompoundStats::new(compound.clone()));
        let previous_state = current.state();

        let next = advance(&current, speed, bpm, session, self.config);
        let event = AttemptEvent::with_timestamp(
            session,
            compound.clone(),
            speed,
            bpm,
            changed_dimension,
            ts,
        );
        let stats = self.store.record_attempt(&event, &next)?;
        let state = stats.state();

        if previous_state < ProgressState::Expanded && stats.has_expanded {
            tracing::info!(compound = %id, session, "compound expanded");
        }
        if previous_state != ProgressState::Mastered && stats.is_mastered {
            tracing::info!(compound = %id, session, "compound mastered");
        }

        let unlocked = self.check_unlocks(session)?;

        Ok(AttemptOutcome {
            stats,
            previous_state,
            state,
            session,
            changed_dimension,
            unlocked,
        })
    }

    /// Unlock every locked dimension whose requirement is now met.
    ///
    /// Dimensions are visited in ascending tier order, so unlocking one tier
    /// can cascade into the next within the same check.
    pub fn check_unlocks(&self, session: u64) -> Result<Vec<DimensionUnlock>> {
        let practiced = self.store.all_statistics()?;
        let mut unlocked = Vec::new();

        for dimension in self.dimensions.by_tier() {
            if dimension.tier() == 0 || self.store.is_dimension_unlocked(dimension.kind())? {
                continue;
            }

            let prerequisite = dimension.tier() - 1;
            if !self.tier_unlocked(prerequisite)? {
                continue;
            }

            let expanded = practiced
                .iter()
                .filter(|s| {
                    s.has_expanded && self.dimensions.compound_tier(&s.compound) == prerequisite
                })
                .count();

            if expanded >= dimension.unlock_after() as usize {
                self.store.unlock_dimension(dimension.kind(), session)?;
                tracing::info!(
                    dimension = %dimension.kind(),
                    session,
                    expanded,
                    "dimension unlocked"
                );
                unlocked.push(DimensionUnlock {
                    dimension: dimension.kind(),
                    session,
                });
            }
        }

        Ok(unlocked)
    }

    fn tier_unlocked(&self, tier: u8) -> Result<bool> {
        for dimension in self.dimensions.iter().filter(|d| d.tier() == tier) {
            if !self.is_selectable(dimension.kind())? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether a dimension may be varied: tier 0 or unlocked.
    pub fn is_selectable(&self, kind: DimensionKind) -> Result<bool> {
        if self.dimensions.get(kind).tier() == 0 {
            return Ok(true);
        }
        self.store.is_dimension_unlocked(kind)
    }

    /// Selectable dimensions, ascending tier then canonical order.
    pub fn selectable_dimensions(&self) -> Result<Vec<&'a Dimension>> {
        let mut result = Vec::new();
        for dimension in self.dimensions.by_tier() {
            if self.is_selectable(dimension.kind())? {
                result.push(dimension);
            }
        }
        Ok(result)
    }

    /// Replay `events` in order and swap the result into the store.
    ///
    /// The replay runs against an in-memory staging store, so the real store
    /// is untouched until the whole history has been applied. Sessions,
    /// change history and unlocks are recomputed rather than copied from the
    /// events; original timestamps are kept. Events whose compound no longer
    /// validates against the configured dimensions are skipped but stay in
    /// the rewritten history unchanged, so a later rebuild with a different
    /// configuration can still pick them up.
    pub fn rebuild(&self, events: &[AttemptEvent]) -> Result<RebuildReport> {
        let staging = MemoryProgressStore::new();
        let replay = Progression::new(&staging, self.dimensions, self.config);

        let mut report = RebuildReport::default();
        let mut history = Vec::with_capacity(events.len());
        for event in events {
            match replay.apply(&event.compound, event.speed, event.bpm, event.ts) {
                Ok(outcome) => {
                    report.replayed += 1;
                    history.push(AttemptEvent::with_timestamp(
                        outcome.session,
                        event.compound.clone(),
                        event.speed,
                        event.bpm,
                        outcome.changed_dimension,
                        event.ts,
                    ));
                }
                Err(err) if err.is_input_error() => {
                    tracing::warn!(
                        session = event.session,
                        "skipping attempt during rebuild: {}",
                        err
                    );
                    report.skipped += 1;
                    history.push(event.clone());
                }
                Err(err) => return Err(err),
            }
        }

        self.store.replace(staging.snapshot(), &history)?;

        tracing::debug!(
            replayed = report.replayed,
            skipped = report.skipped,
            "rebuild complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DimensionsConfig;
    use crate::storage::FileProgressStore;
    use tempfile::TempDir;

    fn dims() -> DimensionSet {
        DimensionSet::from_config(&DimensionsConfig::default()).unwrap()
    }

    fn config() -> ProgressionConfig {
        ProgressionConfig::default()
    }

    fn entry() -> Compound {
        dims().entry_compound()
    }

    // =========================================================================
    // advance
    // =========================================================================

    #[test]
    fn test_first_attempt_sets_ema_to_speed() {
        let stats = advance(&CompoundStats::new(entry()), 250.0, Some(72), 1, &config());

        assert_eq!(stats.attempts, 1);
        assert!((stats.ema_speed - 250.0).abs() < f64::EPSILON);
        assert!((stats.best_speed - 250.0).abs() < f64::EPSILON);
        assert!((stats.last_speed - 250.0).abs() < f64::EPSILON);
        assert_eq!(stats.last_bpm, Some(72));
        assert_eq!(stats.last_practiced_session, Some(1));
        assert_eq!(stats.state(), ProgressState::Practicing);
    }

    #[test]
    fn test_ema_smoothing() {
        let cfg = config();
        let first = advance(&CompoundStats::new(entry()), 300.0, None, 1, &cfg);
        let second = advance(&first, 400.0, None, 2, &cfg);

        // 0.3 * 400 + 0.7 * 300
        assert!((second.ema_speed - 330.0).abs() < 1e-9);
        assert!((second.best_speed - 400.0).abs() < f64::EPSILON);
        assert!(second.last_bpm.is_none());
    }

    #[test]
    fn test_advance_does_not_mutate_input() {
        let original = CompoundStats::new(entry());
        let _ = advance(&original, 500.0, None, 1, &config());
        assert_eq!(original.attempts, 0);
    }

    #[test]
    fn test_expansion_is_one_way() {
        let cfg = config();
        let expanded = advance(&CompoundStats::new(entry()), 410.0, None, 1, &cfg);
        assert!(expanded.has_expanded);

        let slower = advance(&expanded, 100.0, None, 2, &cfg);
        assert!(slower.has_expanded);
        assert_eq!(slower.state(), ProgressState::Expanded);
    }

    #[test]
    fn test_mastery_requires_full_streak() {
        let cfg = config();
        let mut stats = CompoundStats::new(entry());

        stats = advance(&stats, 490.0, None, 1, &cfg);
        stats = advance(&stats, 495.0, None, 2, &cfg);
        assert_eq!(stats.mastery_streak, 2);
        assert!(!stats.is_mastered);

        stats = advance(&stats, 500.0, None, 3, &cfg);
        assert!(stats.is_mastered);
        assert!(stats.has_expanded);
        assert_eq!(stats.state(), ProgressState::Mastered);
    }

    #[test]
    fn test_mastery_streak_resets_below_threshold() {
        let cfg = config();
        let mut stats = CompoundStats::new(entry());

        stats = advance(&stats, 490.0, None, 1, &cfg);
        stats = advance(&stats, 490.0, None, 2, &cfg);
        stats = advance(&stats, 470.0, None, 3, &cfg);
        assert_eq!(stats.mastery_streak, 0);

        stats = advance(&stats, 490.0, None, 4, &cfg);
        assert_eq!(stats.mastery_streak, 1);
        assert!(!stats.is_mastered);
    }

    #[test]
    fn test_mastery_is_kept_after_slow_attempt() {
        let cfg = config();
        let mut stats = CompoundStats::new(entry());
        for session in 1..=3 {
            stats = advance(&stats, 500.0, None, session, &cfg);
        }
        stats = advance(&stats, 150.0, None, 4, &cfg);

        assert!(stats.is_mastered);
        assert_eq!(stats.mastery_streak, 0);
        assert_eq!(stats.struggling_streak, 1);
    }

    #[test]
    fn test_struggling_scenario() {
        let cfg = config();
        let mut stats = CompoundStats::new(entry());

        stats = advance(&stats, 150.0, None, 1, &cfg);
        assert_eq!(stats.struggling_streak, 1);
        assert!(stats.is_struggling());

        stats = advance(&stats, 120.0, None, 2, &cfg);
        assert_eq!(stats.struggling_streak, 2);

        stats = advance(&stats, 200.0, None, 3, &cfg);
        assert_eq!(stats.struggling_streak, 0);
        assert!(!stats.is_struggling());
    }

    #[test]
    fn test_slow_attempt_after_expansion() {
        let cfg = config();
        let expanded = advance(&CompoundStats::new(entry()), 420.0, None, 1, &cfg);
        assert!(expanded.has_expanded);

        let stats = advance(&expanded, 150.0, None, 2, &cfg);

        // 0.3 * 150 + 0.7 * 420
        assert!((stats.ema_speed - 339.0).abs() < 1e-9);
        assert_eq!(stats.struggling_streak, 1);
        assert_eq!(stats.mastery_streak, 0);
        assert!(stats.has_expanded);
    }

    #[test]
    fn test_validate_speed() {
        assert!(validate_speed(0.0).is_ok());
        assert!(validate_speed(480.0).is_ok());
        assert!(validate_speed(-1.0).is_err());
        assert!(validate_speed(f64::NAN).is_err());
        assert!(validate_speed(f64::INFINITY).is_err());
    }

    // =========================================================================
    // log_attempt
    // =========================================================================

    #[test]
    fn test_log_attempt_increments_session() {
        let store = MemoryProgressStore::new();
        let dims = dims();
        let cfg = config();
        let progression = Progression::new(&store, &dims, &cfg);

        let first = progression.log_attempt(&entry(), 250.0, None).unwrap();
        let second = progression.log_attempt(&entry(), 260.0, None).unwrap();

        assert_eq!(first.session, 1);
        assert_eq!(second.session, 2);
        assert_eq!(store.current_session().unwrap(), 2);
        assert_eq!(second.stats.attempts, 2);
        assert_eq!(first.previous_state, ProgressState::Unpracticed);
        assert_eq!(first.state, ProgressState::Practicing);
    }

    #[test]
    fn test_log_attempt_records_changed_dimension() {
        let store = MemoryProgressStore::new();
        let dims = dims();
        let cfg = config();
        let progression = Progression::new(&store, &dims, &cfg);

        let first = progression.log_attempt(&entry(), 250.0, None).unwrap();
        assert_eq!(first.changed_dimension, None);

        let moved = entry().with(DimensionKind::Position, "d_shape");
        let second = progression.log_attempt(&moved, 250.0, None).unwrap();
        assert_eq!(second.changed_dimension, Some(DimensionKind::Position));

        let jumped = moved
            .with(DimensionKind::Scale, "blues")
            .with(DimensionKind::Rhythm, "eighth");
        let third = progression.log_attempt(&jumped, 250.0, None).unwrap();
        assert_eq!(third.changed_dimension, None);

        assert_eq!(
            store.recent_dimension_changes(3).unwrap(),
            vec![DimensionKind::Position]
        );
        assert_eq!(store.last_compound().unwrap(), Some(jumped));
    }

    #[test]
    fn test_log_attempt_rejects_invalid_input() {
        let store = MemoryProgressStore::new();
        let dims = dims();
        let cfg = config();
        let progression = Progression::new(&store, &dims, &cfg);

        let unknown = entry().with(DimensionKind::Scale, "lydian_dominant");
        assert!(progression.log_attempt(&unknown, 250.0, None).is_err());
        assert!(progression.log_attempt(&entry(), -3.0, None).is_err());
        assert!(progression.log_attempt(&entry(), 250.0, Some(0)).is_err());

        // Nothing was recorded
        assert_eq!(store.current_session().unwrap(), 0);
        assert!(store.all_statistics().unwrap().is_empty());
    }

    #[test]
    fn test_outcome_flags() {
        let store = MemoryProgressStore::new();
        let dims = dims();
        let cfg = config();
        let progression = Progression::new(&store, &dims, &cfg);

        let outcome = progression.log_attempt(&entry(), 420.0, None).unwrap();
        assert!(outcome.newly_expanded());
        assert!(!outcome.newly_mastered());

        let again = progression.log_attempt(&entry(), 420.0, None).unwrap();
        assert!(!again.newly_expanded());
    }

    // =========================================================================
    // Unlocks
    // =========================================================================

    fn expand(progression: &Progression<'_, MemoryProgressStore>, compound: &Compound) -> AttemptOutcome {
        progression.log_attempt(compound, 420.0, None).unwrap()
    }

    #[test]
    fn test_note_pattern_unlock_scenario() {
        let store = MemoryProgressStore::new();
        let dims = dims();
        let cfg = config();
        let progression = Progression::new(&store, &dims, &cfg);

        assert!(!progression.is_selectable(DimensionKind::NotePattern).unwrap());

        let a = entry();
        let b = a.with(DimensionKind::Scale, "major_pentatonic");
        let c = a.with(DimensionKind::Position, "d_shape");

        assert!(expand(&progression, &a).unlocked.is_empty());
        assert!(expand(&progression, &b).unlocked.is_empty());

        // Repeating an expanded compound does not count twice
        assert!(expand(&progression, &b).unlocked.is_empty());

        let outcome = expand(&progression, &c);
        assert_eq!(
            outcome.unlocked,
            vec![DimensionUnlock {
                dimension: DimensionKind::NotePattern,
                session: 4
            }]
        );
        assert!(store.is_dimension_unlocked(DimensionKind::NotePattern).unwrap());
        assert!(!store.is_dimension_unlocked(DimensionKind::Articulation).unwrap());

        // One-way: further attempts never re-report it
        assert!(expand(&progression, &c).unlocked.is_empty());
    }

    #[test]
    fn test_articulation_requires_tier_one_expansions() {
        let store = MemoryProgressStore::new();
        let dims = dims();
        let cfg = config();
        let progression = Progression::new(&store, &dims, &cfg);

        let base = entry();
        for scale in ["minor_pentatonic", "major_pentatonic", "blues", "natural_minor"] {
            expand(&progression, &base.with(DimensionKind::Scale, scale));
        }
        assert!(!store.is_dimension_unlocked(DimensionKind::Articulation).unwrap());

        let mut last = None;
        for pattern in ["thirds", "fourths", "groups_of_three"] {
            last = Some(expand(
                &progression,
                &base.with(DimensionKind::NotePattern, pattern),
            ));
        }

        let outcome = last.unwrap();
        assert_eq!(outcome.unlocked.len(), 1);
        assert_eq!(outcome.unlocked[0].dimension, DimensionKind::Articulation);
    }

    #[test]
    fn test_unlock_after_one_expansion() {
        let mut dims_cfg = DimensionsConfig::default();
        dims_cfg.note_pattern.unlock_after = 1;
        let dims = DimensionSet::from_config(&dims_cfg).unwrap();

        let store = MemoryProgressStore::new();
        let cfg = config();
        let progression = Progression::new(&store, &dims, &cfg);

        let slow = progression.log_attempt(&entry(), 300.0, None).unwrap();
        assert!(slow.unlocked.is_empty());

        let outcome = progression.log_attempt(&entry(), 450.0, None).unwrap();
        assert_eq!(outcome.unlocked.len(), 1);
        assert_eq!(outcome.unlocked[0].dimension, DimensionKind::NotePattern);
        assert_eq!(outcome.unlocked[0].session, 2);
    }

    #[test]
    fn test_locked_dimension_compound_does_not_unlock_itself() {
        let mut dims_cfg = DimensionsConfig::default();
        dims_cfg.note_pattern.unlock_after = 1;
        let dims = DimensionSet::from_config(&dims_cfg).unwrap();

        let store = MemoryProgressStore::new();
        let cfg = config();
        let progression = Progression::new(&store, &dims, &cfg);

        let patterned = dims.entry_compound().with(DimensionKind::NotePattern, "thirds");
        let outcome = progression.log_attempt(&patterned, 420.0, None).unwrap();

        assert!(outcome.unlocked.is_empty());
        assert!(!store.is_dimension_unlocked(DimensionKind::NotePattern).unwrap());
    }

    #[test]
    fn test_unlocks_cascade_within_one_check() {
        let mut dims_cfg = DimensionsConfig::default();
        dims_cfg.articulation.tier = 2;
        dims_cfg.articulation.unlock_after = 1;
        dims_cfg.note_pattern.unlock_after = 1;
        let dims = DimensionSet::from_config(&dims_cfg).unwrap();

        let store = MemoryProgressStore::new();
        let cfg = config();
        let progression = Progression::new(&store, &dims, &cfg);

        // Tier-1 expansion recorded while note_pattern is still locked
        let patterned = dims.entry_compound().with(DimensionKind::NotePattern, "thirds");
        assert!(progression
            .log_attempt(&patterned, 420.0, None)
            .unwrap()
            .unlocked
            .is_empty());

        // The first tier-0 expansion unlocks note_pattern, which lets the
        // earlier tier-1 expansion unlock articulation in the same check
        let outcome = progression
            .log_attempt(&dims.entry_compound(), 420.0, None)
            .unwrap();

        let kinds: Vec<DimensionKind> = outcome.unlocked.iter().map(|u| u.dimension).collect();
        assert_eq!(
            kinds,
            vec![DimensionKind::NotePattern, DimensionKind::Articulation]
        );
    }

    #[test]
    fn test_selectable_dimensions_follow_unlocks() {
        let store = MemoryProgressStore::new();
        let dims = dims();
        let cfg = config();
        let progression = Progression::new(&store, &dims, &cfg);

        fn kinds(p: &Progression<'_, MemoryProgressStore>) -> Vec<DimensionKind> {
            p.selectable_dimensions()
                .unwrap()
                .iter()
                .map(|d| d.kind())
                .collect()
        }

        assert_eq!(kinds(&progression).len(), 3);
        store.unlock_dimension(DimensionKind::NotePattern, 1).unwrap();
        assert_eq!(kinds(&progression).last(), Some(&DimensionKind::NotePattern));
    }

    // =========================================================================
    // Rebuild
    // =========================================================================

    #[test]
    fn test_rebuild_reproduces_state() {
        let live = MemoryProgressStore::new();
        let dims = dims();
        let cfg = config();
        let progression = Progression::new(&live, &dims, &cfg);

        let base = entry();
        let mut events = Vec::new();
        for (compound, speed) in [
            (base.clone(), 420.0),
            (base.with(DimensionKind::Scale, "major_pentatonic"), 150.0),
            (base.with(DimensionKind::Scale, "major_pentatonic"), 430.0),
            (base.with(DimensionKind::Position, "g_shape"), 500.0),
        ] {
            let outcome = progression.log_attempt(&compound, speed, Some(90)).unwrap();
            events.push(AttemptEvent::new(
                outcome.session,
                compound,
                speed,
                Some(90),
                outcome.changed_dimension,
            ));
        }

        let replayed = MemoryProgressStore::new();
        replayed.unlock_dimension(DimensionKind::Articulation, 99).unwrap();
        let report = Progression::new(&replayed, &dims, &cfg)
            .rebuild(&events)
            .unwrap();

        assert_eq!(report.replayed, 4);
        assert_eq!(report.skipped, 0);
        assert_eq!(replayed.snapshot(), live.snapshot());
    }

    #[test]
    fn test_rebuild_skips_invalid_events() {
        let store = MemoryProgressStore::new();
        let dims = dims();
        let cfg = config();

        let events = vec![
            AttemptEvent::new(1, entry(), 300.0, None, None),
            AttemptEvent::new(
                2,
                entry().with(DimensionKind::Scale, "lydian_dominant"),
                300.0,
                None,
                None,
            ),
        ];

        let report = Progression::new(&store, &dims, &cfg)
            .rebuild(&events)
            .unwrap();
        assert_eq!(report, RebuildReport { replayed: 1, skipped: 1 });
        assert_eq!(store.current_session().unwrap(), 1);

        // The skipped event stays in the history as it was logged
        let history = store.events();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1], events[1]);
    }

    #[test]
    fn test_rebuild_picks_up_previously_skipped_events() {
        let mut narrow = DimensionsConfig::default();
        narrow.scale.values.retain(|v| v != "blues");
        let narrow = DimensionSet::from_config(&narrow).unwrap();
        let dims = dims();
        let cfg = config();

        let blues = entry().with(DimensionKind::Scale, "blues");
        let events = vec![
            AttemptEvent::new(1, entry(), 300.0, None, None),
            AttemptEvent::new(2, blues.clone(), 420.0, None, Some(DimensionKind::Scale)),
        ];

        let store = MemoryProgressStore::new();
        Progression::new(&store, &narrow, &cfg)
            .rebuild(&events)
            .unwrap();
        assert!(store.get_statistics(&blues.id()).unwrap().is_none());

        let report = Progression::new(&store, &dims, &cfg)
            .rebuild(&store.events())
            .unwrap();
        assert_eq!(report, RebuildReport { replayed: 2, skipped: 0 });
        assert!(store.get_statistics(&blues.id()).unwrap().unwrap().has_expanded);
    }

    #[test]
    fn test_failed_attempt_does_not_advance_session() {
        let dir = TempDir::new().unwrap();
        let store = FileProgressStore::with_dir(dir.path()).unwrap();
        std::fs::create_dir_all(store.attempt_log().path()).unwrap();

        let dims = dims();
        let cfg = config();
        let progression = Progression::new(&store, &dims, &cfg);

        assert!(progression.log_attempt(&entry(), 300.0, None).is_err());
        assert_eq!(store.current_session().unwrap(), 0);

        std::fs::remove_dir(store.attempt_log().path()).unwrap();
        let outcome = progression.log_attempt(&entry(), 300.0, None).unwrap();
        assert_eq!(outcome.session, 1);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_speed() -> impl Strategy<Value = f64> {
            prop_oneof![
                0.0..200.0f64,
                200.0..400.0f64,
                400.0..480.0f64,
                480.0..700.0f64,
            ]
        }

        proptest! {
            // Property: a mastered compound has always expanded
            #[test]
            fn prop_mastered_implies_expanded(speeds in prop::collection::vec(arb_speed(), 1..30)) {
                let cfg = config();
                let mut stats = CompoundStats::new(entry());
                for (i, speed) in speeds.iter().enumerate() {
                    stats = advance(&stats, *speed, None, i as u64 + 1, &cfg);
                    prop_assert!(!stats.is_mastered || stats.has_expanded);
                }
            }

            // Property: each streak either grows by one or resets, never both
            // grow on the same attempt
            #[test]
            fn prop_streaks_increment_or_reset(speeds in prop::collection::vec(arb_speed(), 1..30)) {
                let cfg = config();
                let mut stats = CompoundStats::new(entry());
                for (i, speed) in speeds.iter().enumerate() {
                    let next = advance(&stats, *speed, None, i as u64 + 1, &cfg);

                    let mastery_grew = next.mastery_streak == stats.mastery_streak + 1;
                    let struggling_grew = next.struggling_streak == stats.struggling_streak + 1;

                    prop_assert!(mastery_grew || next.mastery_streak == 0);
                    prop_assert!(struggling_grew || next.struggling_streak == 0);
                    prop_assert!(!(mastery_grew && struggling_grew));

                    stats = next;
                }
            }

            // Property: ema stays within the range of logged speeds
            #[test]
            fn prop_ema_bounded(speeds in prop::collection::vec(arb_speed(), 1..30)) {
                let cfg = config();
                let mut stats = CompoundStats::new(entry());
                for (i, speed) in speeds.iter().enumerate() {
                    stats = advance(&stats, *speed, None, i as u64 + 1, &cfg);
                }
                let min = speeds.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = speeds.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                prop_assert!(stats.ema_speed >= min - 1e-9);
                prop_assert!(stats.ema_speed <= max + 1e-9);
                prop_assert!((stats.best_speed - max).abs() < 1e-9);
            }
        }
    }
}
