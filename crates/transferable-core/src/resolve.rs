//! Foreign-key column resolution.
//!
//! The single dispatch point shared by the transfer engine: every supported
//! [`RelationKind`] maps to exactly one column to rewrite, and pivot kinds fail.

use crate::error::{Error, Result};
use crate::model::RelationKind;
use crate::relation::Relation;

/// The column a transfer rewrites, and the table it lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKeyColumn<'a> {
    pub table: &'a str,
    pub column: &'a str,
}

/// Resolve the foreign-key column of a bound relation.
///
/// # Errors
///
/// Returns [`Error::UnresolvableRelationship`] for `many_to_many` and
/// `morph_to_many`, whose references live in a join table with two keys.
pub fn resolve_foreign_key(relation: &Relation) -> Result<ForeignKeyColumn<'_>> {
    match relation.kind() {
        // the owner's row, found through the entity's own reference column
        RelationKind::BelongsToOne
        | RelationKind::MorphTo
        // the dependent table
        | RelationKind::HasOne
        | RelationKind::HasMany
        | RelationKind::MorphOne
        | RelationKind::MorphMany
        // the intermediate table only; far rows follow it
        | RelationKind::ThroughOne
        | RelationKind::ThroughMany => Ok(ForeignKeyColumn {
            table: relation.holder_table(),
            column: relation.foreign_key(),
        }),
        RelationKind::ManyToMany | RelationKind::MorphToMany => {
            Err(Error::UnresolvableRelationship {
                entity_type: relation.entity_type().to_string(),
                relation: relation.name().to_string(),
                kind: relation.kind(),
            })
        }
    }
}
