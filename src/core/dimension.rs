//! Skill dimensions for fretpath.
//!
//! A dimension is an axis of variation (scale, fretboard position, rhythm,
//! note pattern, articulation) with an ordered list of legal values, an
//! entry-point value, a neighbor relation bounding how far a recommendation
//! may jump, and a tier gating when it becomes selectable.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{DimensionConfig, DimensionsConfig};
use crate::core::compound::Compound;
use crate::error::{FretpathError, Result};

/// The fixed set of skill axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    /// Scale or mode.
    Scale,
    /// Fretboard position (CAGED shape).
    Position,
    /// Rhythmic subdivision.
    Rhythm,
    /// Melodic sequence applied to the scale.
    NotePattern,
    /// Picking or fretting-hand technique.
    Articulation,
}

impl DimensionKind {
    /// All dimensions in canonical order.
    pub const ALL: [DimensionKind; 5] = [
        DimensionKind::Scale,
        DimensionKind::Position,
        DimensionKind::Rhythm,
        DimensionKind::NotePattern,
        DimensionKind::Articulation,
    ];

    /// Canonical name, as used in compound identities and config keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scale => "scale",
            Self::Position => "position",
            Self::Rhythm => "rhythm",
            Self::NotePattern => "note_pattern",
            Self::Articulation => "articulation",
        }
    }

    /// Look up a dimension by name. Accepts `note-pattern` as well as
    /// `note_pattern`, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
    }

    /// Position of this dimension in canonical order.
    pub fn index(&self) -> usize {
        match self {
            Self::Scale => 0,
            Self::Position => 1,
            Self::Rhythm => 2,
            Self::NotePattern => 3,
            Self::Articulation => 4,
        }
    }
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    kind: DimensionKind,
    values: Vec<String>,
    entry_point: String,
    tier: u8,
    unlock_after: u32,
    wrap: bool,
    neighbors: HashMap<String, Vec<String>>,
}

impl Dimension {
    /// Build a dimension from its config section, rejecting values that are
    /// empty, duplicated, or contain identity separators, and neighbor or
    /// entry-point references to values outside the list.
    pub fn from_config(kind: DimensionKind, config: &DimensionConfig) -> Result<Self> {
        if config.values.is_empty() {
            return Err(FretpathError::config(format!("{} has no values", kind)));
        }

        let mut seen = HashSet::new();
        for value in &config.values {
            if !is_valid_value(value) {
                return Err(FretpathError::config(format!(
                    "{} value '{}' must be non-empty and free of whitespace, '=', ',' and '|'",
                    kind, value
                )));
            }
            if !seen.insert(value.as_str()) {
                return Err(FretpathError::config(format!(
                    "{} value '{}' is listed twice",
                    kind, value
                )));
            }
        }

        let entry_point = match &config.entry_point {
            Some(entry) if seen.contains(entry.as_str()) => entry.clone(),
            Some(entry) => {
                return Err(FretpathError::config(format!(
                    "{} entry point '{}' is not one of its values",
                    kind, entry
                )))
            }
            None => config.values[0].clone(),
        };

        for (value, targets) in &config.neighbors {
            if !seen.contains(value.as_str()) {
                return Err(FretpathError::config(format!(
                    "{} neighbors declared for unknown value '{}'",
                    kind, value
                )));
            }
            if let Some(bad) = targets.iter().find(|t| !seen.contains(t.as_str())) {
                return Err(FretpathError::config(format!(
                    "{} neighbor '{}' of '{}' is not one of its values",
                    kind, bad, value
                )));
            }
        }

        Ok(Self {
            kind,
            values: config.values.clone(),
            entry_point,
            tier: config.tier,
            unlock_after: config.unlock_after,
            wrap: config.wrap,
            neighbors: config.neighbors.clone(),
        })
    }

    /// Which axis this is.
    pub fn kind(&self) -> DimensionKind {
        self.kind
    }

    /// Unlock tier (0 = always selectable).
    pub fn tier(&self) -> u8 {
        self.tier
    }

    /// Distinct expanded compounds of the prerequisite tier needed to unlock.
    pub fn unlock_after(&self) -> u32 {
        self.unlock_after
    }

    /// The value a learner starts on.
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// All legal values in configured order.
    pub fn all_values(&self) -> &[String] {
        &self.values
    }

    /// Whether `value` is legal for this dimension.
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }

    /// Values reachable in one step from `value`.
    ///
    /// Explicit neighbor overrides win; otherwise the adjacent values in the
    /// ordered list, wrapping at the ends when the dimension is cyclic.
    /// Unknown values have no neighbors.
    pub fn neighbors(&self, value: &str) -> Vec<&str> {
        if let Some(explicit) = self.neighbors.get(value) {
            return explicit
                .iter()
                .filter(|n| n.as_str() != value)
                .map(String::as_str)
                .collect();
        }

        let Some(index) = self.values.iter().position(|v| v == value) else {
            return Vec::new();
        };
        let len = self.values.len();

        let mut result: Vec<&str> = Vec::with_capacity(2);
        let mut push = |i: usize| {
            let candidate = self.values[i].as_str();
            if i != index && !result.contains(&candidate) {
                result.push(candidate);
            }
        };

        if index > 0 {
            push(index - 1);
        } else if self.wrap && len > 1 {
            push(len - 1);
        }

        if index + 1 < len {
            push(index + 1);
        } else if self.wrap && len > 1 {
            push(0);
        }

        result
    }
}

fn is_valid_value(value: &str) -> bool {
    !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '=' | ',' | '|'))
}

/// The full set of configured dimensions, indexed by [`DimensionKind`].
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionSet {
    dimensions: Vec<Dimension>,
}

impl DimensionSet {
    /// Build and validate all five dimensions from config.
    pub fn from_config(config: &DimensionsConfig) -> Result<Self> {
        let dimensions = DimensionKind::ALL
            .iter()
            .map(|&kind| Dimension::from_config(kind, config.get(kind)))
            .collect::<Result<Vec<_>>>()?;

        if !dimensions.iter().any(|d| d.tier == 0) {
            return Err(FretpathError::config(
                "at least one dimension must be tier 0",
            ));
        }

        Ok(Self { dimensions })
    }

    /// Get a dimension by kind.
    pub fn get(&self, kind: DimensionKind) -> &Dimension {
        &self.dimensions[kind.index()]
    }

    /// All dimensions in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &Dimension> {
        self.dimensions.iter()
    }

    /// Tier-0 dimensions in canonical order.
    pub fn base_dimensions(&self) -> impl Iterator<Item = &Dimension> {
        self.dimensions.iter().filter(|d| d.tier == 0)
    }

    /// Dimensions sorted by ascending tier, canonical order within a tier.
    pub fn by_tier(&self) -> Vec<&Dimension> {
        let mut sorted: Vec<&Dimension> = self.dimensions.iter().collect();
        sorted.sort_by_key(|d| (d.tier, d.kind.index()));
        sorted
    }

    /// The compound made of every dimension's entry point.
    pub fn entry_compound(&self) -> Compound {
        Compound::new(
            self.get(DimensionKind::Scale).entry_point(),
            self.get(DimensionKind::Position).entry_point(),
            self.get(DimensionKind::Rhythm).entry_point(),
            self.get(DimensionKind::NotePattern).entry_point(),
            self.get(DimensionKind::Articulation).entry_point(),
        )
    }

    /// Check every value of `compound` against its dimension.
    pub fn validate(&self, compound: &Compound) -> Result<()> {
        for dimension in &self.dimensions {
            let value = compound.value(dimension.kind);
            if !dimension.contains(value) {
                return Err(FretpathError::invalid_compound(format!(
                    "unknown {} '{}'",
                    dimension.kind, value
                )));
            }
        }
        Ok(())
    }

    /// Build a compound from explicit values, filling omitted dimensions with
    /// their entry points.
    pub fn build<I, V>(&self, values: I) -> Result<Compound>
    where
        I: IntoIterator<Item = (DimensionKind, V)>,
        V: Into<String>,
    {
        let mut compound = self.entry_compound();
        let mut assigned = HashSet::new();

        for (kind, value) in values {
            if !assigned.insert(kind) {
                return Err(FretpathError::invalid_compound(format!(
                    "{} given more than once",
                    kind
                )));
            }
            compound = compound.with(kind, value);
        }

        self.validate(&compound)?;
        Ok(compound)
    }

    /// Parse a compound from `key=value` pairs separated by `,` or `|`.
    ///
    /// This is the only place compound text is turned back into a value; it
    /// accepts the canonical identity format as well as the shorter forms
    /// typed on the command line (`scale=blues,position=c_shape`).
    pub fn parse_compound(&self, text: &str) -> Result<Compound> {
        let mut pairs = Vec::new();

        for part in text.split([',', '|']) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (key, value) = part.split_once('=').ok_or_else(|| {
                FretpathError::invalid_compound(format!("expected key=value, got '{}'", part))
            })?;

            let kind = DimensionKind::from_name(key).ok_or_else(|| {
                FretpathError::invalid_compound(format!("unknown dimension '{}'", key.trim()))
            })?;

            pairs.push((kind, value.trim().to_string()));
        }

        if pairs.is_empty() {
            return Err(FretpathError::invalid_compound("empty compound"));
        }

        self.build(pairs)
    }

    /// Tier of a compound: the highest tier among dimensions whose value
    /// differs from the entry point, or 0 when none differ.
    pub fn compound_tier(&self, compound: &Compound) -> u8 {
        self.dimensions
            .iter()
            .filter(|d| compound.value(d.kind) != d.entry_point)
            .map(|d| d.tier)
            .max()
            .unwrap_or(0)
    }
}
