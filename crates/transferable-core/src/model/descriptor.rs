//! Static relationship declarations.
//!
//! A [`RelationDescriptor`] is registered once per entity type and never
//! changes afterwards. Binding it to an entity instance produces a
//! [`crate::relation::Relation`].

use serde::{Deserialize, Serialize};

use super::RelationKind;

/// Metadata describing one declared relationship.
///
/// `foreign_key` is always the column that holds the reference:
/// - on the dependent table for `has_*` and `morph_one`/`morph_many`
/// - on the declaring entity's own table for `belongs_to` and `morph_to`
/// - on the intermediate table for `has_*_through`
/// - on the pivot table for `many_to_many` and `morph_to_many`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationDescriptor {
    pub kind: RelationKind,

    /// Target entity type name. For through kinds this is the far type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<String>,

    pub foreign_key: String,

    /// Intermediate entity type for through kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through: Option<String>,

    /// Column on the far table pointing at the intermediate table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_key: Option<String>,

    /// Type discriminator column for morph kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub morph_type: Option<String>,

    /// Discriminator value stored for the declaring type (defaults to its name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub morph_class: Option<String>,

    /// Join table for pivot kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot: Option<String>,

    /// Pivot column pointing at the related table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_pivot_key: Option<String>,
}

impl RelationDescriptor {
    fn bare(kind: RelationKind, related: Option<&str>, foreign_key: &str) -> Self {
        Self {
            kind,
            related: related.map(str::to_string),
            foreign_key: foreign_key.to_string(),
            through: None,
            second_key: None,
            morph_type: None,
            morph_class: None,
            pivot: None,
            related_pivot_key: None,
        }
    }

    #[must_use]
    pub fn has_one(related: &str, foreign_key: &str) -> Self {
        Self::bare(RelationKind::HasOne, Some(related), foreign_key)
    }

    #[must_use]
    pub fn has_many(related: &str, foreign_key: &str) -> Self {
        Self::bare(RelationKind::HasMany, Some(related), foreign_key)
    }

    /// `foreign_key` is the column on the declaring entity's table.
    #[must_use]
    pub fn belongs_to(related: &str, foreign_key: &str) -> Self {
        Self::bare(RelationKind::BelongsToOne, Some(related), foreign_key)
    }

    /// `first_key` lives on `through`; `second_key` lives on `related`.
    #[must_use]
    pub fn has_many_through(
        related: &str,
        through: &str,
        first_key: &str,
        second_key: &str,
    ) -> Self {
        let mut descriptor = Self::bare(RelationKind::ThroughMany, Some(related), first_key);
        descriptor.through = Some(through.to_string());
        descriptor.second_key = Some(second_key.to_string());
        descriptor
    }

    #[must_use]
    pub fn has_one_through(
        related: &str,
        through: &str,
        first_key: &str,
        second_key: &str,
    ) -> Self {
        Self {
            kind: RelationKind::ThroughOne,
            ..Self::has_many_through(related, through, first_key, second_key)
        }
    }

    #[must_use]
    pub fn morph_many(related: &str, foreign_key: &str, morph_type: &str) -> Self {
        let mut descriptor = Self::bare(RelationKind::MorphMany, Some(related), foreign_key);
        descriptor.morph_type = Some(morph_type.to_string());
        descriptor
    }

    #[must_use]
    pub fn morph_one(related: &str, foreign_key: &str, morph_type: &str) -> Self {
        Self {
            kind: RelationKind::MorphOne,
            ..Self::morph_many(related, foreign_key, morph_type)
        }
    }

    /// Both columns live on the declaring entity's table.
    #[must_use]
    pub fn morph_to(foreign_key: &str, morph_type: &str) -> Self {
        let mut descriptor = Self::bare(RelationKind::MorphTo, None, foreign_key);
        descriptor.morph_type = Some(morph_type.to_string());
        descriptor
    }

    #[must_use]
    pub fn many_to_many(
        related: &str,
        pivot: &str,
        foreign_pivot_key: &str,
        related_pivot_key: &str,
    ) -> Self {
        let mut descriptor = Self::bare(RelationKind::ManyToMany, Some(related), foreign_pivot_key);
        descriptor.pivot = Some(pivot.to_string());
        descriptor.related_pivot_key = Some(related_pivot_key.to_string());
        descriptor
    }

    #[must_use]
    pub fn morph_to_many(
        related: &str,
        pivot: &str,
        foreign_pivot_key: &str,
        related_pivot_key: &str,
        morph_type: &str,
    ) -> Self {
        Self {
            kind: RelationKind::MorphToMany,
            morph_type: Some(morph_type.to_string()),
            ..Self::many_to_many(related, pivot, foreign_pivot_key, related_pivot_key)
        }
    }

    /// Override the discriminator value stored for the declaring type.
    #[must_use]
    pub fn morph_class(mut self, class: &str) -> Self {
        self.morph_class = Some(class.to_string());
        self
    }

    /// Check that every key the kind needs is present and non-blank.
    ///
    /// Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        require("foreign_key", Some(&self.foreign_key))?;

        if self.kind == RelationKind::MorphTo {
            if self.related.is_some() {
                return Err("morph_to resolves its target from `morph_type`; drop `related`".into());
            }
        } else {
            require("related", self.related.as_ref())?;
        }

        if self.kind.is_through() {
            require("through", self.through.as_ref())?;
            require("second_key", self.second_key.as_ref())?;
        } else if self.through.is_some() || self.second_key.is_some() {
            return Err(format!(
                "`through`/`second_key` are only valid for through kinds, not {}",
                self.kind
            ));
        }

        if self.kind.is_morph() {
            require("morph_type", self.morph_type.as_ref())?;
        } else if self.morph_type.is_some() || self.morph_class.is_some() {
            return Err(format!(
                "`morph_type`/`morph_class` are only valid for morph kinds, not {}",
                self.kind
            ));
        }

        if self.kind.is_pivot() {
            require("pivot", self.pivot.as_ref())?;
            require("related_pivot_key", self.related_pivot_key.as_ref())?;
        } else if self.pivot.is_some() || self.related_pivot_key.is_some() {
            return Err(format!(
                "`pivot`/`related_pivot_key` are only valid for pivot kinds, not {}",
                self.kind
            ));
        }

        Ok(())
    }
}

fn require(field: &str, value: Option<&String>) -> Result<(), String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        Some(_) => Err(format!("`{field}` must not be blank")),
        None => Err(format!("missing `{field}`")),
    }
}
