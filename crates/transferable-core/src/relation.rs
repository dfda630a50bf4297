//! Relations bound to a specific entity instance.
//!
//! A [`Relation`] is built fresh on every binding and discarded after use.
//! It carries the SQL needed to count the rows it matches and to bulk-update
//! the column that holds the reference.

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params_from_iter};

use crate::db::quote_ident;
use crate::error::{Error, Result};
use crate::model::{EntityType, KeyValue, RelationDescriptor, RelationKind};
use crate::registry::Registry;
use crate::resolve::ForeignKeyColumn;

/// Rows matched by a bound relation.
#[derive(Debug, Clone)]
struct RowSet {
    /// `FROM ... WHERE ...` clause for counting.
    count_from: String,
    /// Unqualified `WHERE` predicate over `holder_table` for updates.
    update_filter: String,
    params: Vec<Value>,
}

/// A relationship declaration bound to one entity.
#[derive(Debug, Clone)]
pub struct Relation {
    entity_type: String,
    name: String,
    kind: RelationKind,
    /// Table whose rows carry `foreign_key`.
    holder_table: String,
    foreign_key: String,
    /// `None` when the entity's own reference column is NULL.
    rows: Option<RowSet>,
}

impl Relation {
    /// Bind `descriptor` (declared as `name` on `owner`) to the row keyed by `key`.
    ///
    /// Inverse kinds (`belongs_to`, `morph_to`) read the entity's own row to
    /// find the referenced owner.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced entity type is not registered or a
    /// lookup query fails.
    pub fn bind(
        conn: &Connection,
        registry: &Registry,
        owner: &EntityType,
        name: &str,
        descriptor: &RelationDescriptor,
        key: &KeyValue,
    ) -> Result<Self> {
        let mut relation = Self {
            entity_type: owner.name.clone(),
            name: name.to_string(),
            kind: descriptor.kind,
            holder_table: String::new(),
            foreign_key: descriptor.foreign_key.clone(),
            rows: None,
        };
        let fk = quote_ident(&descriptor.foreign_key);
        let key_param = Value::from(key.clone());

        match descriptor.kind {
            RelationKind::HasOne | RelationKind::HasMany => {
                let related = registry.get(required(&descriptor.related, owner, name)?)?;
                let table = quote_ident(&related.table);
                relation.holder_table.clone_from(&related.table);
                relation.rows = Some(RowSet {
                    count_from: format!("FROM {table} WHERE {fk} = ?"),
                    update_filter: format!("{fk} = ?"),
                    params: vec![key_param],
                });
            }
            RelationKind::MorphOne | RelationKind::MorphMany => {
                let related = registry.get(required(&descriptor.related, owner, name)?)?;
                let table = quote_ident(&related.table);
                let morph_type = quote_ident(required(&descriptor.morph_type, owner, name)?);
                let class = morph_class(descriptor, owner);
                relation.holder_table.clone_from(&related.table);
                relation.rows = Some(RowSet {
                    count_from: format!("FROM {table} WHERE {fk} = ? AND {morph_type} = ?"),
                    update_filter: format!("{fk} = ? AND {morph_type} = ?"),
                    params: vec![key_param, Value::Text(class)],
                });
            }
            RelationKind::ThroughOne | RelationKind::ThroughMany => {
                let far = registry.get(required(&descriptor.related, owner, name)?)?;
                let through = registry.get(required(&descriptor.through, owner, name)?)?;
                let far_table = quote_ident(&far.table);
                let through_table = quote_ident(&through.table);
                let through_pk = quote_ident(&through.primary_key);
                let second_key = quote_ident(required(&descriptor.second_key, owner, name)?);
                relation.holder_table.clone_from(&through.table);
                relation.rows = Some(RowSet {
                    count_from: format!(
                        "FROM {far_table} INNER JOIN {through_table} \
                         ON {through_table}.{through_pk} = {far_table}.{second_key} \
                         WHERE {through_table}.{fk} = ?"
                    ),
                    update_filter: format!("{fk} = ?"),
                    params: vec![key_param],
                });
            }
            RelationKind::BelongsToOne => {
                let target = registry.get(required(&descriptor.related, owner, name)?)?;
                relation.holder_table.clone_from(&target.table);
                let referenced = read_own_columns(conn, owner, key, &[&descriptor.foreign_key])?
                    .and_then(|mut values| values.pop())
                    .and_then(KeyValue::from_column);
                relation.rows = referenced.map(|referenced| owner_rows(target, referenced));
            }
            RelationKind::MorphTo => {
                let morph_type = required(&descriptor.morph_type, owner, name)?;
                let values =
                    read_own_columns(conn, owner, key, &[morph_type, &descriptor.foreign_key])?;
                let (type_name, referenced) = match values.as_deref() {
                    Some([Value::Text(type_name), referenced]) => {
                        (Some(type_name.clone()), KeyValue::from_column(referenced.clone()))
                    }
                    _ => (None, None),
                };
                match (type_name, referenced) {
                    (Some(type_name), Some(referenced)) => {
                        let target = registry.get(&type_name)?;
                        relation.holder_table.clone_from(&target.table);
                        relation.rows = Some(owner_rows(target, referenced));
                    }
                    _ => relation.holder_table.clone_from(&owner.table),
                }
            }
            // Pivot rows are counted whether or not the related row still exists.
            RelationKind::ManyToMany | RelationKind::MorphToMany => {
                let pivot_name = required(&descriptor.pivot, owner, name)?;
                let pivot = quote_ident(pivot_name);
                let mut update_filter = format!("{fk} = ?");
                let mut params = vec![key_param];
                if descriptor.kind == RelationKind::MorphToMany {
                    let morph_type = quote_ident(required(&descriptor.morph_type, owner, name)?);
                    let class = morph_class(descriptor, owner);
                    update_filter.push_str(&format!(" AND {morph_type} = ?"));
                    params.push(Value::Text(class));
                }
                relation.holder_table = pivot_name.to_string();
                relation.rows = Some(RowSet {
                    count_from: format!("FROM {pivot} WHERE {update_filter}"),
                    update_filter,
                    params,
                });
            }
        }

        Ok(relation)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    #[must_use]
    pub const fn kind(&self) -> RelationKind {
        self.kind
    }

    /// Column name as known by the relation. Use
    /// [`crate::resolve::resolve_foreign_key`] before writing to it.
    #[must_use]
    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    #[must_use]
    pub fn holder_table(&self) -> &str {
        &self.holder_table
    }

    /// Count the rows this relation currently matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the count query fails.
    pub fn count(&self, conn: &Connection) -> Result<u64> {
        let Some(rows) = &self.rows else {
            return Ok(0);
        };
        let sql = format!("SELECT COUNT(*) {}", rows.count_from);
        let count: i64 = conn.query_row(&sql, params_from_iter(rows.params.iter()), |row| {
            row.get(0)
        })?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Set `column` to `new_key` on every row this relation matches.
    ///
    /// Returns the number of rows affected.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn update_foreign_key(
        &self,
        conn: &Connection,
        column: &ForeignKeyColumn<'_>,
        new_key: &KeyValue,
    ) -> Result<u64> {
        let Some(rows) = &self.rows else {
            return Ok(0);
        };
        let sql = format!(
            "UPDATE {} SET {} = ? WHERE {}",
            quote_ident(column.table),
            quote_ident(column.column),
            rows.update_filter
        );
        let params =
            std::iter::once(Value::from(new_key.clone())).chain(rows.params.iter().cloned());
        let affected = conn.execute(&sql, params_from_iter(params))?;
        Ok(affected as u64)
    }
}

fn required<'a>(value: &'a Option<String>, owner: &EntityType, name: &str) -> Result<&'a str> {
    value.as_deref().ok_or_else(|| Error::InvalidDeclaration {
        entity_type: owner.name.clone(),
        relation: name.to_string(),
        reason: "descriptor is missing a key its kind requires".to_string(),
    })
}

fn morph_class(descriptor: &RelationDescriptor, owner: &EntityType) -> String {
    descriptor
        .morph_class
        .clone()
        .unwrap_or_else(|| owner.name.clone())
}

/// Read columns from the entity's own row. `None` when the row does not exist.
fn read_own_columns(
    conn: &Connection,
    owner: &EntityType,
    key: &KeyValue,
    columns: &[&str],
) -> Result<Option<Vec<Value>>> {
    let select = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {select} FROM {} WHERE {} = ?1",
        quote_ident(&owner.table),
        quote_ident(&owner.primary_key)
    );
    let values = conn
        .query_row(&sql, [key], |row| {
            (0..columns.len())
                .map(|i| row.get::<_, Value>(i))
                .collect::<rusqlite::Result<Vec<_>>>()
        })
        .optional()?;
    Ok(values)
}

fn owner_rows(target: &EntityType, referenced: KeyValue) -> RowSet {
    let table = quote_ident(&target.table);
    let pk = quote_ident(&target.primary_key);
    RowSet {
        count_from: format!("FROM {table} WHERE {pk} = ?"),
        update_filter: format!("{pk} = ?"),
        params: vec![Value::from(referenced)],
    }
}
