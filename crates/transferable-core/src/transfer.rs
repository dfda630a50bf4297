//! Ownership transfer.
//!
//! Re-points every dependent row of a source entity to a target entity of
//! the same type, inside one savepoint. Either every declared relationship is
//! rewritten or none is.

use rusqlite::Connection;
use serde::Serialize;

use crate::dangling::RelationCount;
use crate::error::{Error, Result};
use crate::model::{EntityType, HasRelationships, KeyValue};
use crate::registry::{Binding, Registry};
use crate::resolve::resolve_foreign_key;
use crate::scope::Scope;

/// Outcome of a transfer, per declared relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub entity_type: String,
    pub source: KeyValue,
    pub target: KeyValue,
    pub dry_run: bool,
    /// Affected rows per relationship; empty for a self-transfer.
    pub relations: Vec<RelationCount>,
}

impl TransferReport {
    /// Rows affected (or that would have been, for a dry run).
    #[must_use]
    pub fn total(&self) -> u64 {
        self.relations.iter().map(|r| r.count).sum()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TransferEngine<'r> {
    registry: &'r Registry,
}

impl<'r> TransferEngine<'r> {
    #[must_use]
    pub const fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Transfer ownership of `source`'s dependents to `target`.
    ///
    /// Returns the number of rows affected. A dry run performs the updates,
    /// then rolls them back, and still reports the count.
    ///
    /// # Errors
    ///
    /// See [`transfer_report`](Self::transfer_report).
    pub fn transfer<S, T>(
        &self,
        conn: &Connection,
        source: &S,
        target: &T,
        dry_run: bool,
    ) -> Result<u64>
    where
        S: HasRelationships + ?Sized,
        T: HasRelationships + ?Sized,
    {
        Ok(self.transfer_report(conn, source, target, dry_run)?.total())
    }

    /// Transfer ownership and report per-relationship affected rows.
    ///
    /// Equal keys short-circuit to an empty report without opening a scope
    /// or binding any relationship.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEntityType`] or [`Error::TypeMismatch`] before
    /// any write, [`Error::UnresolvableRelationship`] if a declared
    /// relationship is a pivot kind, and binding or SQL errors. Every error
    /// raised after the scope opens rolls back all relationships.
    pub fn transfer_report<S, T>(
        &self,
        conn: &Connection,
        source: &S,
        target: &T,
        dry_run: bool,
    ) -> Result<TransferReport>
    where
        S: HasRelationships + ?Sized,
        T: HasRelationships + ?Sized,
    {
        let entity_type = self.registry.get(source.entity_type())?;
        let target_type = self.registry.get(target.entity_type())?;
        if entity_type.name != target_type.name {
            return Err(Error::TypeMismatch {
                source_type: entity_type.name.clone(),
                target_type: target_type.name.clone(),
            });
        }

        let mut report = TransferReport {
            entity_type: entity_type.name.clone(),
            source: source.key(),
            target: target.key(),
            dry_run,
            relations: Vec::new(),
        };

        if report.source == report.target {
            tracing::debug!(
                entity_type = %report.entity_type,
                key = %report.source,
                "self-transfer is a no-op"
            );
            return Ok(report);
        }

        let scope = Scope::begin(conn, "transfer")?;
        match self.rewrite(conn, entity_type, &report.source, &report.target) {
            Ok(relations) => report.relations = relations,
            Err(err) => {
                drop(scope);
                return Err(err);
            }
        }

        if dry_run {
            scope.rollback()?;
        } else {
            scope.commit()?;
        }

        tracing::info!(
            entity_type = %report.entity_type,
            source = %report.source,
            target = %report.target,
            dry_run,
            affected = report.total(),
            "transferred ownership"
        );
        Ok(report)
    }

    fn rewrite(
        &self,
        conn: &Connection,
        entity_type: &EntityType,
        source: &KeyValue,
        target: &KeyValue,
    ) -> Result<Vec<RelationCount>> {
        let mut relations = Vec::with_capacity(entity_type.transferable.len());
        for name in &entity_type.transferable {
            let relation = match self.registry.bind_declared(conn, entity_type, source, name)? {
                Binding::Relation(relation) => relation,
                Binding::Attribute(name) => {
                    tracing::debug!(entity_type = %entity_type.name, %name, "skipping attribute");
                    continue;
                }
            };
            let column = resolve_foreign_key(&relation)?;
            let affected = relation.update_foreign_key(conn, &column, target)?;
            tracing::debug!(
                entity_type = %entity_type.name,
                relation = %name,
                table = column.table,
                column = column.column,
                affected,
                "rewrote foreign key"
            );
            relations.push(RelationCount {
                name: name.clone(),
                kind: relation.kind(),
                count: affected,
            });
        }
        Ok(relations)
    }
}
