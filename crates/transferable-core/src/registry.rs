//! Entity-type registry and declared-name binding.
//!
//! Each entity type is registered once with its relationship descriptors.
//! Binding looks a declared name up on the type and binds the descriptor to
//! a concrete row; there is no dynamic dispatch on names.

use rusqlite::Connection;
use std::collections::BTreeMap;

use crate::config::RegistryConfig;
use crate::error::{Error, Result};
use crate::model::{EntityType, HasRelationships, KeyValue, Member, RelationKind};
use crate::relation::Relation;

/// Result of binding a declared name on an entity.
#[derive(Debug, Clone)]
pub enum Binding {
    Relation(Relation),
    /// The name is a plain attribute; callers skip it.
    Attribute(String),
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: BTreeMap<String, EntityType>,
    strict_declarations: bool,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with [`Error::AttributeDeclared`] instead of skipping attribute names.
    #[must_use]
    pub const fn with_strict_declarations(mut self, strict: bool) -> Self {
        self.strict_declarations = strict;
        self
    }

    #[must_use]
    pub const fn strict_declarations(&self) -> bool {
        self.strict_declarations
    }

    /// Build and validate a registry from a parsed registry file.
    ///
    /// # Errors
    ///
    /// Returns an error if a type is registered twice, a descriptor is
    /// incomplete, or a descriptor names an unregistered type.
    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        let mut registry =
            Self::new().with_strict_declarations(config.settings.strict_declarations);
        for entity_type in &config.entities {
            registry.register(entity_type.clone())?;
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Add an entity type. Descriptors are checked for completeness here;
    /// references to other types are checked by [`validate`](Self::validate).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDeclaration`] for duplicate types, blank
    /// table/key names, or incomplete descriptors.
    pub fn register(&mut self, entity_type: EntityType) -> Result<()> {
        let invalid = |relation: &str, reason: String| Error::InvalidDeclaration {
            entity_type: entity_type.name.clone(),
            relation: relation.to_string(),
            reason,
        };

        if self.types.contains_key(&entity_type.name) {
            return Err(invalid("", "entity type registered twice".to_string()));
        }
        if entity_type.table.trim().is_empty() || entity_type.primary_key.trim().is_empty() {
            return Err(invalid("", "table and primary_key must not be blank".to_string()));
        }
        for (name, descriptor) in &entity_type.relations {
            descriptor.validate().map_err(|reason| invalid(name, reason))?;
            if entity_type.attributes.contains(name) {
                return Err(invalid(name, "declared as both relation and attribute".to_string()));
            }
        }

        tracing::debug!(
            entity_type = %entity_type.name,
            table = %entity_type.table,
            relations = entity_type.relations.len(),
            strict = entity_type.strict,
            "registered entity type"
        );
        self.types.insert(entity_type.name.clone(), entity_type);
        Ok(())
    }

    /// Check that every descriptor refers to registered types.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDeclaration`] naming the first dangling reference.
    pub fn validate(&self) -> Result<()> {
        for entity_type in self.types.values() {
            for (name, descriptor) in &entity_type.relations {
                let referenced = [descriptor.related.as_deref(), descriptor.through.as_deref()];
                for type_name in referenced.into_iter().flatten() {
                    if !self.types.contains_key(type_name) {
                        return Err(Error::InvalidDeclaration {
                            entity_type: entity_type.name.clone(),
                            relation: name.clone(),
                            reason: format!("references unregistered type `{type_name}`"),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Look up a registered type by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEntityType`] if the name is not registered.
    pub fn get(&self, name: &str) -> Result<&EntityType> {
        self.types
            .get(name)
            .ok_or_else(|| Error::UnknownEntityType(name.to_string()))
    }

    pub fn types(&self) -> impl Iterator<Item = &EntityType> {
        self.types.values()
    }

    /// Bind a declared name on `entity` to a [`Relation`], or report it as an
    /// attribute.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRelationship`] if the name is neither a relation
    /// nor an attribute, [`Error::AttributeDeclared`] for attributes when
    /// strict declarations are on, and binding errors from [`Relation::bind`].
    pub fn bind<E>(&self, conn: &Connection, entity: &E, name: &str) -> Result<Binding>
    where
        E: HasRelationships + ?Sized,
    {
        let entity_type = self.get(entity.entity_type())?;
        self.bind_declared(conn, entity_type, &entity.key(), name)
    }

    pub(crate) fn bind_declared(
        &self,
        conn: &Connection,
        entity_type: &EntityType,
        key: &KeyValue,
        name: &str,
    ) -> Result<Binding> {
        match entity_type.member(name) {
            Some(Member::Relation(descriptor)) => {
                Relation::bind(conn, self, entity_type, name, descriptor, key)
                    .map(Binding::Relation)
            }
            Some(Member::Attribute) if self.strict_declarations => Err(Error::AttributeDeclared {
                entity_type: entity_type.name.clone(),
                name: name.to_string(),
            }),
            Some(Member::Attribute) => Ok(Binding::Attribute(name.to_string())),
            None => Err(Error::UnknownRelationship {
                entity_type: entity_type.name.clone(),
                name: name.to_string(),
            }),
        }
    }

    /// Declared names on `entity_type` whose kind can never be transferred.
    #[must_use]
    pub fn untransferable(&self, entity_type: &EntityType) -> Vec<(String, RelationKind)> {
        entity_type
            .transferable
            .iter()
            .filter_map(|name| match entity_type.member(name) {
                Some(Member::Relation(d)) if d.kind.is_pivot() => Some((name.clone(), d.kind)),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Binding, Registry};
    use crate::config::parse_config;
    use crate::error::Error;
    use crate::model::{Entity, EntityType, RelationDescriptor, RelationKind};
    use rusqlite::Connection;

    fn genre() -> EntityType {
        EntityType::new("genre", "genres")
            .strict(true)
            .relation("books", RelationDescriptor::has_many("book", "genre_id"))
            .relation(
                "tags",
                RelationDescriptor::many_to_many("tag", "genre_tags", "genre_id", "tag_id"),
            )
            .attribute("name")
            .transferable(["books", "name", "tags"])
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register(genre()).expect("genre");
        registry.register(EntityType::new("book", "books")).expect("book");
        registry.register(EntityType::new("tag", "tags")).expect("tag");
        registry
    }

    fn db() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch("CREATE TABLE books (id INTEGER PRIMARY KEY, genre_id INTEGER);")
            .expect("schema");
        conn
    }

    #[test]
    fn binds_relations_and_attributes() {
        let (registry, conn) = (registry(), db());
        let genre = Entity::new("genre", 1);

        match registry.bind(&conn, &genre, "books").expect("bind books") {
            Binding::Relation(relation) => assert_eq!(relation.kind(), RelationKind::HasMany),
            Binding::Attribute(name) => panic!("unexpected attribute {name}"),
        }
        assert!(matches!(
            registry.bind(&conn, &genre, "name").expect("bind name"),
            Binding::Attribute(ref name) if name == "name"
        ));
    }

    #[test]
    fn unknown_names_are_errors() {
        let (registry, conn) = (registry(), db());
        let err = registry
            .bind(&conn, &Entity::new("genre", 1), "authors")
            .expect_err("unknown name");
        assert!(matches!(err, Error::UnknownRelationship { ref name, .. } if name == "authors"));
    }

    #[test]
    fn strict_declarations_reject_attributes() {
        let registry = registry().with_strict_declarations(true);
        let err = registry
            .bind(&db(), &Entity::new("genre", 1), "name")
            .expect_err("attribute rejected");
        assert!(matches!(err, Error::AttributeDeclared { .. }));
    }

    #[test]
    fn unknown_entity_type_is_an_error() {
        let err = registry()
            .bind(&db(), &Entity::new("author", 1), "books")
            .expect_err("unknown type");
        assert!(matches!(err, Error::UnknownEntityType(ref t) if t == "author"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = registry();
        let err = registry.register(genre()).expect_err("duplicate");
        assert!(matches!(err, Error::InvalidDeclaration { .. }));
    }

    #[test]
    fn relation_and_attribute_name_clash_is_rejected() {
        let mut registry = Registry::new();
        let err = registry
            .register(genre().attribute("books"))
            .expect_err("clash");
        assert!(err.to_string().contains("both relation and attribute"));
    }

    #[test]
    fn validate_catches_dangling_type_references() {
        let mut registry = Registry::new();
        registry.register(genre()).expect("genre");
        let err = registry.validate().expect_err("book not registered");
        assert!(err.to_string().contains("unregistered type `book`"), "{err}");
    }

    #[test]
    fn from_config_honours_settings() {
        let config = parse_config(
            r#"
[settings]
strict_declarations = true

[[entity]]
name = "genre"
table = "genres"

[[entity]]
name = "book"
table = "books"

[entity.relations.genre]
kind = "belongs_to"
related = "genre"
foreign_key = "genre_id"
"#,
        )
        .expect("parse");
        let registry = Registry::from_config(&config).expect("build registry");
        assert!(registry.strict_declarations());
        assert_eq!(registry.types().count(), 2);
    }

    #[test]
    fn untransferable_lists_pivot_declarations() {
        let registry = registry();
        let genre = registry.get("genre").expect("genre");
        assert_eq!(
            registry.untransferable(genre),
            vec![("tags".to_string(), RelationKind::ManyToMany)]
        );
    }
}
