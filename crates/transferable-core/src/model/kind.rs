use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The shape of a relationship between an entity and its dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    /// The foreign key lives on the declaring entity's own row.
    #[serde(rename = "belongs_to")]
    BelongsToOne,
    #[serde(rename = "has_one")]
    HasOne,
    #[serde(rename = "has_many")]
    HasMany,
    /// Ownership via an intermediate table; only the intermediate pointer is rewritten.
    #[serde(rename = "has_one_through")]
    ThroughOne,
    #[serde(rename = "has_many_through")]
    ThroughMany,
    /// Polymorphic dependents, qualified by a type discriminator column.
    #[serde(rename = "morph_one")]
    MorphOne,
    #[serde(rename = "morph_many")]
    MorphMany,
    #[serde(rename = "morph_to")]
    MorphTo,
    /// Join-table relationships. Countable, never transferable.
    #[serde(rename = "many_to_many")]
    ManyToMany,
    #[serde(rename = "morph_to_many")]
    MorphToMany,
}

impl RelationKind {
    pub const ALL: [Self; 10] = [
        Self::BelongsToOne,
        Self::HasOne,
        Self::HasMany,
        Self::ThroughOne,
        Self::ThroughMany,
        Self::MorphOne,
        Self::MorphMany,
        Self::MorphTo,
        Self::ManyToMany,
        Self::MorphToMany,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BelongsToOne => "belongs_to",
            Self::HasOne => "has_one",
            Self::HasMany => "has_many",
            Self::ThroughOne => "has_one_through",
            Self::ThroughMany => "has_many_through",
            Self::MorphOne => "morph_one",
            Self::MorphMany => "morph_many",
            Self::MorphTo => "morph_to",
            Self::ManyToMany => "many_to_many",
            Self::MorphToMany => "morph_to_many",
        }
    }

    /// Kinds that route through an intermediate table.
    #[must_use]
    pub const fn is_through(self) -> bool {
        matches!(self, Self::ThroughOne | Self::ThroughMany)
    }

    /// Kinds qualified by a morph type column.
    #[must_use]
    pub const fn is_morph(self) -> bool {
        matches!(
            self,
            Self::MorphOne | Self::MorphMany | Self::MorphTo | Self::MorphToMany
        )
    }

    /// Kinds whose reference column sits on the declaring entity's row.
    #[must_use]
    pub const fn is_inverse(self) -> bool {
        matches!(self, Self::BelongsToOne | Self::MorphTo)
    }

    /// Kinds backed by a pivot table.
    #[must_use]
    pub const fn is_pivot(self) -> bool {
        matches!(self, Self::ManyToMany | Self::MorphToMany)
    }
}

/// Error returned when parsing a relation kind from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKindError {
    pub got: String,
}

impl fmt::Display for ParseKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid relation kind: '{}'", self.got)
    }
}

impl std::error::Error for ParseKindError {}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for RelationKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ParseKindError { got: s.to_string() })
    }
}
