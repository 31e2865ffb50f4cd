//! Compound identity for fretpath.
//!
//! A compound is one value per skill dimension, the atomic unit of progress
//! tracking. Compounds are always held in full form: a dimension that is
//! still locked carries its entry-point value, so identity never depends on
//! which dimensions happened to be unlocked when an attempt was logged.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::dimension::{DimensionKind, DimensionSet};

/// Canonical identity of a compound.
///
/// Produced only by [`Compound::id`]; the encoding lists every dimension in
/// canonical order, so it is independent of how the compound was built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompoundId(String);

impl CompoundId {
    /// The identity as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable combination of one value per dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Compound {
    scale: String,
    position: String,
    rhythm: String,
    note_pattern: String,
    articulation: String,
}

impl Compound {
    /// Create a compound from raw values.
    ///
    /// No validation happens here; use [`DimensionSet::build`] or
    /// [`DimensionSet::parse_compound`] at input boundaries.
    ///
    /// [`DimensionSet::build`]: crate::core::DimensionSet::build
    /// [`DimensionSet::parse_compound`]: crate::core::DimensionSet::parse_compound
    pub fn new(
        scale: impl Into<String>,
        position: impl Into<String>,
        rhythm: impl Into<String>,
        note_pattern: impl Into<String>,
        articulation: impl Into<String>,
    ) -> Self {
        Self {
            scale: scale.into(),
            position: position.into(),
            rhythm: rhythm.into(),
            note_pattern: note_pattern.into(),
            articulation: articulation.into(),
        }
    }

    /// Value of one dimension.
    pub fn value(&self, kind: DimensionKind) -> &str {
        match kind {
            DimensionKind::Scale => &self.scale,
            DimensionKind::Position => &self.position,
            DimensionKind::Rhythm => &self.rhythm,
            DimensionKind::NotePattern => &self.note_pattern,
            DimensionKind::Articulation => &self.articulation,
        }
    }

    /// A copy with one dimension replaced.
    pub fn with(&self, kind: DimensionKind, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        let slot = match kind {
            DimensionKind::Scale => &mut next.scale,
            DimensionKind::Position => &mut next.position,
            DimensionKind::Rhythm => &mut next.rhythm,
            DimensionKind::NotePattern => &mut next.note_pattern,
            DimensionKind::Articulation => &mut next.articulation,
        };
        *slot = value.into();
        next
    }

    /// Canonical identity.
    pub fn id(&self) -> CompoundId {
        let encoded = DimensionKind::ALL
            .iter()
            .map(|kind| format!("{}={}", kind.as_str(), self.value(*kind)))
            .collect::<Vec<_>>()
            .join("|");
        CompoundId(encoded)
    }

    /// Dimensions whose values differ between the two compounds.
    pub fn differing_dimensions(&self, other: &Compound) -> Vec<DimensionKind> {
        DimensionKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.value(*kind) != other.value(*kind))
            .collect()
    }

    /// Number of differing dimensions.
    pub fn dimension_distance(&self, other: &Compound) -> usize {
        DimensionKind::ALL
            .iter()
            .filter(|kind| self.value(**kind) != other.value(**kind))
            .count()
    }

    /// The single dimension that differs, or `None` when zero or several do.
    pub fn changed_dimension(&self, other: &Compound) -> Option<DimensionKind> {
        match self.differing_dimensions(other).as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Unlock tier of this compound under `dimensions`.
    pub fn tier(&self, dimensions: &DimensionSet) -> u8 {
        dimensions.compound_tier(self)
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / {} / {} / {}",
            self.scale, self.position, self.rhythm, self.note_pattern, self.articulation
        )
    }
}
