use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{KeyValue, RelationDescriptor};

/// Anything identifiable as a row of a registered entity type.
///
/// Host applications implement this for their own record types; the
/// checker, transfer engine and deletion guard only need the type name and
/// primary key.
pub trait HasRelationships {
    /// Registered entity type name.
    fn entity_type(&self) -> &str;

    /// Primary-key value of this row.
    fn key(&self) -> KeyValue;
}

/// A plain entity reference: type name plus primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub entity_type: String,
    pub key: KeyValue,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>, key: impl Into<KeyValue>) -> Self {
        Self {
            entity_type: entity_type.into(),
            key: key.into(),
        }
    }
}

impl HasRelationships for Entity {
    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn key(&self) -> KeyValue {
        self.key.clone()
    }
}

/// What happens when an entity with dependents is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Deletion is refused while dependents remain.
    Strict,
    /// Deletion always proceeds; dependents are left dangling.
    Lenient,
}

impl DeletePolicy {
    /// Phrase used in dangling-relationship messages.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Strict => "must",
            Self::Lenient => "can",
        }
    }
}

/// A name on an entity type, as seen by relationship binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member<'a> {
    Relation(&'a RelationDescriptor),
    Attribute,
}

/// Static configuration of one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityType {
    pub name: String,
    pub table: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Refuse deletion while dependents remain.
    #[serde(default)]
    pub strict: bool,
    /// Declared relationship names, checked and transferred in this order.
    #[serde(default)]
    pub transferable: Vec<String>,
    #[serde(default)]
    pub relations: BTreeMap<String, RelationDescriptor>,
    /// Plain columns; tolerated in `transferable` and skipped.
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl EntityType {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            primary_key: default_primary_key(),
            strict: false,
            transferable: Vec::new(),
            relations: BTreeMap::new(),
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub fn primary_key(mut self, column: &str) -> Self {
        self.primary_key = column.to_string();
        self
    }

    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Define a relation without declaring it transferable.
    #[must_use]
    pub fn relation(mut self, name: &str, descriptor: RelationDescriptor) -> Self {
        self.relations.insert(name.to_string(), descriptor);
        self
    }

    #[must_use]
    pub fn attribute(mut self, name: &str) -> Self {
        self.attributes.push(name.to_string());
        self
    }

    /// Append names to the declared transferable set.
    #[must_use]
    pub fn transferable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transferable.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub const fn delete_policy(&self) -> DeletePolicy {
        if self.strict {
            DeletePolicy::Strict
        } else {
            DeletePolicy::Lenient
        }
    }

    /// Look up a name among relations first, then attributes.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<Member<'_>> {
        if let Some(descriptor) = self.relations.get(name) {
            return Some(Member::Relation(descriptor));
        }
        self.attributes
            .iter()
            .any(|attribute| attribute == name)
            .then_some(Member::Attribute)
    }
}

fn default_primary_key() -> String {
    "id".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genre() -> EntityType {
        EntityType::new("genre", "genres")
            .strict(true)
            .relation("books", RelationDescriptor::has_many("book", "genre_id"))
            .attribute("name")
            .transferable(["books", "name"])
    }

    #[test]
    fn member_lookup_prefers_relations() {
        let ty = genre();
        assert!(matches!(ty.member("books"), Some(Member::Relation(_))));
        assert_eq!(ty.member("name"), Some(Member::Attribute));
        assert_eq!(ty.member("authors"), None);
    }

    #[test]
    fn strict_flag_maps_to_policy() {
        assert_eq!(genre().delete_policy(), DeletePolicy::Strict);
        assert_eq!(genre().strict(false).delete_policy(), DeletePolicy::Lenient);
        assert_eq!(DeletePolicy::Strict.keyword(), "must");
        assert_eq!(DeletePolicy::Lenient.keyword(), "can");
    }

    #[test]
    fn transferable_preserves_declaration_order() {
        let ty = genre().transferable(["covers"]);
        assert_eq!(ty.transferable, vec!["books", "name", "covers"]);
    }

    #[test]
    fn defaults_apply_when_deserializing() {
        let ty: EntityType = toml::from_str(
            r#"
name = "book"
table = "books"
"#,
        )
        .expect("parse entity type");
        assert_eq!(ty.primary_key, "id");
        assert!(!ty.strict);
        assert!(ty.transferable.is_empty());
        assert!(ty.relations.is_empty());
    }

    #[test]
    fn entity_exposes_type_and_key() {
        let entity = Entity::new("genre", 2);
        assert_eq!(entity.entity_type(), "genre");
        assert_eq!(entity.key(), KeyValue::Integer(2));
    }
}
