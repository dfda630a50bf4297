//! Dependent-row counting.
//!
//! The checker is read-only: one `COUNT(*)` per declared relationship, no
//! transaction.

use rusqlite::Connection;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{EntityType, HasRelationships, KeyValue, RelationKind};
use crate::registry::{Binding, Registry};

/// Rows matched (or affected) by one declared relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationCount {
    pub name: String,
    pub kind: RelationKind,
    pub count: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct DanglingChecker<'r> {
    registry: &'r Registry,
}

impl<'r> DanglingChecker<'r> {
    #[must_use]
    pub const fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Per-relationship counts in declaration order. Attribute names are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is unknown, a declared name cannot be
    /// bound, or a count query fails.
    pub fn breakdown<E>(&self, conn: &Connection, entity: &E) -> Result<Vec<RelationCount>>
    where
        E: HasRelationships + ?Sized,
    {
        let entity_type = self.registry.get(entity.entity_type())?;
        self.breakdown_for(conn, entity_type, &entity.key())
    }

    pub(crate) fn breakdown_for(
        &self,
        conn: &Connection,
        entity_type: &EntityType,
        key: &KeyValue,
    ) -> Result<Vec<RelationCount>> {
        let mut counts = Vec::with_capacity(entity_type.transferable.len());
        for name in &entity_type.transferable {
            let relation = match self.registry.bind_declared(conn, entity_type, key, name)? {
                Binding::Relation(relation) => relation,
                Binding::Attribute(name) => {
                    tracing::debug!(entity_type = %entity_type.name, %name, "skipping attribute");
                    continue;
                }
            };
            let count = relation.count(conn)?;
            tracing::trace!(
                entity_type = %entity_type.name,
                %key,
                relation = %name,
                count,
                "counted dependents"
            );
            counts.push(RelationCount {
                name: name.clone(),
                kind: relation.kind(),
                count,
            });
        }
        Ok(counts)
    }

    /// Total dependent rows across every declared relationship.
    ///
    /// # Errors
    ///
    /// See [`breakdown`](Self::breakdown).
    pub fn count_dependents<E>(&self, conn: &Connection, entity: &E) -> Result<u64>
    where
        E: HasRelationships + ?Sized,
    {
        Ok(self.breakdown(conn, entity)?.iter().map(|c| c.count).sum())
    }

    /// Count dependents and optionally fail when any remain.
    ///
    /// Returns 0 when clean, or the count when `raise_on_nonzero` is false.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DanglingRelationships`] when dependents remain and
    /// `raise_on_nonzero` is set, plus any counting error.
    pub fn check_dangling<E>(
        &self,
        conn: &Connection,
        entity: &E,
        raise_on_nonzero: bool,
    ) -> Result<u64>
    where
        E: HasRelationships + ?Sized,
    {
        let entity_type = self.registry.get(entity.entity_type())?;
        let key = entity.key();
        let total: u64 = self
            .breakdown_for(conn, entity_type, &key)?
            .iter()
            .map(|c| c.count)
            .sum();

        if total > 0 && raise_on_nonzero {
            return Err(Error::DanglingRelationships {
                entity_type: entity_type.name.clone(),
                key,
                count: total,
                keyword: entity_type.delete_policy().keyword(),
            });
        }
        Ok(total)
    }
}
