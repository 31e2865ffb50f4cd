//! Configuration loading for fretpath.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.fretpath/config.toml`)
//! 3. User config (`~/.fretpath/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. Thresholds, weights and dimensions are
//! loaded once per process and stay immutable for the run.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{DimensionKind, DimensionSet};
use crate::error::{FailOpen, FretpathError, Result};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Expansion, mastery and struggling thresholds.
    pub progression: ProgressionConfig,
    /// Scoring weights and scorer parameters.
    pub scoring: ScoringConfig,
    /// Candidate generation strategy.
    pub recommend: RecommendConfig,
    /// Skill dimensions.
    pub dimensions: DimensionsConfig,
}

/// Thresholds driving the progression state machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Speed score at which a compound is good enough to branch out from.
    pub expansion_threshold: f64,
    /// Speed score counted towards the mastery streak.
    pub mastery_threshold: f64,
    /// Consecutive attempts at mastery speed required to master a compound.
    pub mastery_streak: u32,
    /// Speed score below which an attempt counts as struggling.
    pub struggling_threshold: f64,
    /// Smoothing factor of the speed EMA.
    pub ema_alpha: f64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            expansion_threshold: 400.0,
            mastery_threshold: 480.0,
            mastery_streak: 3,
            struggling_threshold: 200.0,
            ema_alpha: 0.3,
        }
    }
}

impl ProgressionConfig {
    fn validate(&self) -> Result<()> {
        let thresholds = [
            ("expansion_threshold", self.expansion_threshold),
            ("mastery_threshold", self.mastery_threshold),
            ("struggling_threshold", self.struggling_threshold),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value <= 0.0 {
                return Err(FretpathError::config(format!(
                    "progression.{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        if self.struggling_threshold > self.expansion_threshold {
            return Err(FretpathError::config(
                "progression.struggling_threshold must not exceed expansion_threshold",
            ));
        }
        if self.expansion_threshold > self.mastery_threshold {
            return Err(FretpathError::config(
                "progression.expansion_threshold must not exceed mastery_threshold",
            ));
        }
        if self.mastery_streak == 0 {
            return Err(FretpathError::config(
                "progression.mastery_streak must be at least 1",
            ));
        }
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            return Err(FretpathError::config(format!(
                "progression.ema_alpha must be in (0, 1], got {}",
                self.ema_alpha
            )));
        }

        Ok(())
    }
}

/// Linear weights of the four scoring factors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringWeights {
    /// Weight of the "keep repeating the current compound" factor.
    pub consolidation: f64,
    /// Weight of the "not practiced in a while" factor.
    pub staleness: f64,
    /// Weight of the estimated probability of success.
    pub readiness: f64,
    /// Weight of the "change a different dimension" factor.
    pub diversity: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            consolidation: 1.0,
            staleness: 0.4,
            readiness: 0.8,
            diversity: 0.3,
        }
    }
}

/// Scorer parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    /// Factor weights.
    pub weights: ScoringWeights,
    /// Sessions after which a compound counts as fully stale.
    pub staleness_window: u64,
    /// Number of recent attempts whose dimension changes suppress diversity.
    pub diversity_lookback: usize,
    /// Transfer coefficient for dimensions without a configured value.
    pub default_transfer: f64,
    /// Readiness assumed when nothing related has been practiced.
    pub low_readiness: f64,
    /// Per-dimension transfer coefficients, keyed by dimension name.
    pub transfer: BTreeMap<String, f64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let mut transfer = BTreeMap::new();
        transfer.insert("scale".to_string(), 0.7);
        transfer.insert("position".to_string(), 0.8);
        transfer.insert("rhythm".to_string(), 0.6);

        Self {
            weights: ScoringWeights::default(),
            staleness_window: 10,
            diversity_lookback: 3,
            default_transfer: 0.5,
            low_readiness: 0.3,
            transfer,
        }
    }
}

impl ScoringConfig {
    /// Transfer coefficient for a changed dimension.
    ///
    /// `None` (the change could not be determined) and dimensions without a
    /// configured coefficient both get `default_transfer`.
    pub fn transfer_for(&self, kind: Option<DimensionKind>) -> f64 {
        kind.and_then(|k| {
            self.transfer
                .iter()
                .find(|(name, _)| DimensionKind::from_name(name) == Some(k))
                .map(|(_, value)| *value)
        })
        .unwrap_or(self.default_transfer)
    }

    fn validate(&self) -> Result<()> {
        let weights = [
            ("consolidation", self.weights.consolidation),
            ("staleness", self.weights.staleness),
            ("readiness", self.weights.readiness),
            ("diversity", self.weights.diversity),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(FretpathError::config(format!(
                    "scoring.weights.{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if self.staleness_window == 0 {
            return Err(FretpathError::config(
                "scoring.staleness_window must be at least 1",
            ));
        }

        for (name, value) in [
            ("default_transfer", self.default_transfer),
            ("low_readiness", self.low_readiness),
        ] {
            if !is_unit_interval(value) {
                return Err(FretpathError::config(format!(
                    "scoring.{} must be in [0, 1], got {}",
                    name, value
                )));
            }
        }

        let mut seen = Vec::new();
        for (key, value) in &self.transfer {
            let Some(kind) = DimensionKind::from_name(key) else {
                return Err(FretpathError::config(format!(
                    "scoring.transfer has unknown dimension '{}'",
                    key
                )));
            };
            if seen.contains(&kind) {
                return Err(FretpathError::config(format!(
                    "scoring.transfer sets '{}' more than once",
                    kind
                )));
            }
            seen.push(kind);
            if !is_unit_interval(*value) {
                return Err(FretpathError::config(format!(
                    "scoring.transfer.{} must be in [0, 1], got {}",
                    key, value
                )));
            }
        }

        Ok(())
    }
}

fn is_unit_interval(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

/// Which candidate generator drives recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendStrategy {
    /// Expand from every practiced compound (canonical).
    #[default]
    FullHistory,
    /// Expand from the current compound only (superseded).
    SingleOrigin,
}

/// Valid values for the strategy field.
pub const VALID_STRATEGIES: &[&str] = &["full_history", "single_origin"];

impl RecommendStrategy {
    /// Parse a strategy name.
    pub fn from_name(value: &str) -> Option<Self> {
        match value {
            "full_history" => Some(Self::FullHistory),
            "single_origin" => Some(Self::SingleOrigin),
            _ => None,
        }
    }

    /// Config name of the strategy.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FullHistory => "full_history",
            Self::SingleOrigin => "single_origin",
        }
    }
}

/// Recommendation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecommendConfig {
    /// Candidate generation strategy.
    pub strategy: RecommendStrategy,
}

/// One dimension's definition.
///
/// A `[dimensions.<name>]` table in a config file replaces the built-in
/// definition of that dimension as a whole; omitted fields take the generic
/// defaults below, not the built-in ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DimensionConfig {
    /// Legal values in progression order.
    pub values: Vec<String>,
    /// Starting value (defaults to the first value).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,
    /// Unlock tier; 0 is always selectable.
    pub tier: u8,
    /// Expanded compounds of the previous tier required to unlock.
    pub unlock_after: u32,
    /// Whether adjacency wraps from the last value to the first.
    pub wrap: bool,
    /// Explicit neighbor lists, replacing adjacency for the listed values.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub neighbors: HashMap<String, Vec<String>>,
}

impl DimensionConfig {
    fn base(values: &[&str]) -> Self {
        Self {
            values: values.iter().map(|v| v.to_string()).collect(),
            ..Self::default()
        }
    }
}

/// Definitions of all five dimensions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DimensionsConfig {
    /// Scales, tier 0.
    pub scale: DimensionConfig,
    /// CAGED fretboard positions, tier 0.
    pub position: DimensionConfig,
    /// Rhythmic subdivisions, tier 0.
    pub rhythm: DimensionConfig,
    /// Melodic sequences, tier 1.
    pub note_pattern: DimensionConfig,
    /// Picking and slur techniques, tier 2.
    pub articulation: DimensionConfig,
}

impl Default for DimensionsConfig {
    fn default() -> Self {
        let scale = DimensionConfig::base(&[
            "minor_pentatonic",
            "major_pentatonic",
            "blues",
            "natural_minor",
            "major",
            "dorian",
            "mixolydian",
            "harmonic_minor",
        ]);

        // CAGED shapes in the order they follow each other up the neck.
        let position = DimensionConfig {
            wrap: true,
            ..DimensionConfig::base(&["e_shape", "d_shape", "c_shape", "a_shape", "g_shape"])
        };

        let rhythm = DimensionConfig::base(&[
            "quarter",
            "eighth",
            "eighth_triplet",
            "sixteenth",
            "sixteenth_triplet",
        ]);

        let note_pattern = DimensionConfig {
            tier: 1,
            unlock_after: 3,
            ..DimensionConfig::base(&[
                "stepwise",
                "thirds",
                "fourths",
                "groups_of_three",
                "groups_of_four",
                "sixths",
            ])
        };

        let articulation = DimensionConfig {
            tier: 2,
            unlock_after: 3,
            ..DimensionConfig::base(&["alternate", "economy", "legato", "hybrid", "sweep"])
        };

        Self {
            scale,
            position,
            rhythm,
            note_pattern,
            articulation,
        }
    }
}

impl DimensionsConfig {
    /// Definition of one dimension.
    pub fn get(&self, kind: DimensionKind) -> &DimensionConfig {
        match kind {
            DimensionKind::Scale => &self.scale,
            DimensionKind::Position => &self.position,
            DimensionKind::Rhythm => &self.rhythm,
            DimensionKind::NotePattern => &self.note_pattern,
            DimensionKind::Articulation => &self.articulation,
        }
    }

    /// Mutable definition of one dimension.
    pub fn get_mut(&mut self, kind: DimensionKind) -> &mut DimensionConfig {
        match kind {
            DimensionKind::Scale => &mut self.scale,
            DimensionKind::Position => &mut self.position,
            DimensionKind::Rhythm => &mut self.rhythm,
            DimensionKind::NotePattern => &mut self.note_pattern,
            DimensionKind::Articulation => &mut self.articulation,
        }
    }
}

impl Config {
    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load user config from `~/.fretpath/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = fretpath_home()?;
        Self::load_layer(&home.join("config.toml"))
    }

    /// Load project config from `.fretpath/config.toml` under the project root.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        Self::load_layer(&project_dir(cwd).join("config.toml"))
    }

    /// Load one layer, warning when a present file cannot be parsed.
    fn load_layer(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        Self::load_from_file(path)
            .map(Some)
            .fail_open_with(&format!("loading {}", path.display()), None)
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| FretpathError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| FretpathError::config(e.to_string()))
    }

    /// Check thresholds, weights and dimension definitions.
    pub fn validate(&self) -> Result<()> {
        self.progression.validate()?;
        self.scoring.validate()?;
        DimensionSet::from_config(&self.dimensions).map(|_| ())
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        override_f64(
            "FRETPATH_EXPANSION_THRESHOLD",
            &mut self.progression.expansion_threshold,
        );
        override_f64(
            "FRETPATH_MASTERY_THRESHOLD",
            &mut self.progression.mastery_threshold,
        );
        override_f64(
            "FRETPATH_STRUGGLING_THRESHOLD",
            &mut self.progression.struggling_threshold,
        );

        if let Ok(val) = env::var("FRETPATH_MASTERY_STREAK") {
            match val.parse::<u32>() {
                Ok(n) if n >= 1 => self.progression.mastery_streak = n,
                _ => tracing::warn!(
                    "Invalid FRETPATH_MASTERY_STREAK value '{}'. Expected an integer >= 1. Using '{}'.",
                    val,
                    self.progression.mastery_streak
                ),
            }
        }

        if let Ok(val) = env::var("FRETPATH_STALENESS_WINDOW") {
            match val.parse::<u64>() {
                Ok(n) if n >= 1 => self.scoring.staleness_window = n,
                _ => tracing::warn!(
                    "Invalid FRETPATH_STALENESS_WINDOW value '{}'. Expected an integer >= 1. Using '{}'.",
                    val,
                    self.scoring.staleness_window
                ),
            }
        }

        if let Ok(val) = env::var("FRETPATH_STRATEGY") {
            match RecommendStrategy::from_name(&val) {
                Some(strategy) => self.recommend.strategy = strategy,
                None => tracing::warn!(
                    "Invalid FRETPATH_STRATEGY value '{}'. Valid values: {:?}. Using '{}'.",
                    val,
                    VALID_STRATEGIES,
                    self.recommend.strategy.name()
                ),
            }
        }
    }

    /// Merge another config into this one, field by field.
    ///
    /// Values in `other` that differ from the defaults win. A layer therefore
    /// cannot reset a value back to its default once a lower layer changed it.
    /// Dimension tables are merged per dimension, transfer coefficients per key.
    fn merge(mut self, other: Config) -> Self {
        let default_progression = ProgressionConfig::default();
        if other.progression.expansion_threshold != default_progression.expansion_threshold {
            self.progression.expansion_threshold = other.progression.expansion_threshold;
        }
        if other.progression.mastery_threshold != default_progression.mastery_threshold {
            self.progression.mastery_threshold = other.progression.mastery_threshold;
        }
        if other.progression.mastery_streak != default_progression.mastery_streak {
            self.progression.mastery_streak = other.progression.mastery_streak;
        }
        if other.progression.struggling_threshold != default_progression.struggling_threshold {
            self.progression.struggling_threshold = other.progression.struggling_threshold;
        }
        if other.progression.ema_alpha != default_progression.ema_alpha {
            self.progression.ema_alpha = other.progression.ema_alpha;
        }

        let default_weights = ScoringWeights::default();
        if other.scoring.weights.consolidation != default_weights.consolidation {
            self.scoring.weights.consolidation = other.scoring.weights.consolidation;
        }
        if other.scoring.weights.staleness != default_weights.staleness {
            self.scoring.weights.staleness = other.scoring.weights.staleness;
        }
        if other.scoring.weights.readiness != default_weights.readiness {
            self.scoring.weights.readiness = other.scoring.weights.readiness;
        }
        if other.scoring.weights.diversity != default_weights.diversity {
            self.scoring.weights.diversity = other.scoring.weights.diversity;
        }

        let default_scoring = ScoringConfig::default();
        if other.scoring.staleness_window != default_scoring.staleness_window {
            self.scoring.staleness_window = other.scoring.staleness_window;
        }
        if other.scoring.diversity_lookback != default_scoring.diversity_lookback {
            self.scoring.diversity_lookback = other.scoring.diversity_lookback;
        }
        if other.scoring.default_transfer != default_scoring.default_transfer {
            self.scoring.default_transfer = other.scoring.default_transfer;
        }
        if other.scoring.low_readiness != default_scoring.low_readiness {
            self.scoring.low_readiness = other.scoring.low_readiness;
        }
        for (k, v) in other.scoring.transfer {
            if default_scoring.transfer.get(&k) != Some(&v) {
                let key = DimensionKind::from_name(&k)
                    .map(|kind| kind.as_str().to_string())
                    .unwrap_or(k);
                self.scoring.transfer.insert(key, v);
            }
        }

        if other.recommend.strategy != RecommendStrategy::default() {
            self.recommend.strategy = other.recommend.strategy;
        }

        let default_dimensions = DimensionsConfig::default();
        for kind in DimensionKind::ALL {
            if other.dimensions.get(kind) != default_dimensions.get(kind) {
                *self.dimensions.get_mut(kind) = other.dimensions.get(kind).clone();
            }
        }

        self
    }
}

fn override_f64(var: &str, slot: &mut f64) {
    if let Ok(val) = env::var(var) {
        match val.parse::<f64>() {
            Ok(n) if n.is_finite() && n > 0.0 => *slot = n,
            _ => tracing::warn!(
                "Invalid {} value '{}'. Expected a positive number. Using '{}'.",
                var,
                val,
                slot
            ),
        }
    }
}

/// Name of the per-project directory.
pub const PROJECT_DIR_NAME: &str = ".fretpath";

/// Get the fretpath home directory.
///
/// Checks `FRETPATH_HOME` first, then falls back to `~/.fretpath`, then to a
/// temp directory when no home directory is available.
pub fn fretpath_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("FRETPATH_HOME") {
        if home.is_empty() {
            tracing::warn!("FRETPATH_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("FRETPATH_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(PROJECT_DIR_NAME));
    }

    let fallback = env::temp_dir().join("fretpath");
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback.display()
    );
    Some(fallback)
}

/// Find the project root for a working directory.
///
/// The nearest ancestor containing `.fretpath/` wins; otherwise the git
/// repository root; otherwise `cwd` itself.
pub fn find_project_root(cwd: &Path) -> PathBuf {
    for ancestor in cwd.ancestors() {
        if ancestor.join(PROJECT_DIR_NAME).is_dir() {
            return ancestor.to_path_buf();
        }
    }

    if let Ok(output) = std::process::Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(cwd)
        .output()
    {
        if output.status.success() {
            if let Ok(path) = String::from_utf8(output.stdout) {
                let trimmed = path.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
        }
    }

    cwd.to_path_buf()
}

/// The project's `.fretpath/` directory.
pub fn project_dir(cwd: &Path) -> PathBuf {
    find_project_root(cwd).join(PROJECT_DIR_NAME)
}
