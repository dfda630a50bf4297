//! Entity types, relationship declarations and key values.

pub mod descriptor;
pub mod entity;
pub mod key;
pub mod kind;

pub use descriptor::RelationDescriptor;
pub use entity::{DeletePolicy, Entity, EntityType, HasRelationships, Member};
pub use key::KeyValue;
pub use kind::{ParseKindError, RelationKind};
