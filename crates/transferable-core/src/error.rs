use std::fmt;

use crate::model::{KeyValue, RelationKind};

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InvalidDeclaration,
    UnknownEntityType,
    UnknownRelationship,
    AttributeDeclared,
    UnresolvableRelationship,
    TypeMismatch,
    DanglingRelationships,
    DatabaseError,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InvalidDeclaration => "E1002",
            Self::UnknownEntityType => "E2001",
            Self::UnknownRelationship => "E2002",
            Self::AttributeDeclared => "E2003",
            Self::UnresolvableRelationship => "E3001",
            Self::TypeMismatch => "E3002",
            Self::DanglingRelationships => "E4001",
            Self::DatabaseError => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Registry file parse error",
            Self::InvalidDeclaration => "Invalid relationship declaration",
            Self::UnknownEntityType => "Unknown entity type",
            Self::UnknownRelationship => "Unknown relationship",
            Self::AttributeDeclared => "Attribute declared as transferable",
            Self::UnresolvableRelationship => "Relationship cannot be resolved to a column",
            Self::TypeMismatch => "Entity types do not match",
            Self::DanglingRelationships => "Dependent rows still reference the entity",
            Self::DatabaseError => "Database error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in the registry file and retry."),
            Self::InvalidDeclaration => {
                Some("Add the keys the relationship kind requires (see `xfer describe`).")
            }
            Self::UnknownEntityType => Some("Register the entity type in the registry file."),
            Self::UnknownRelationship => {
                Some("Declare the name under `relations` or `attributes` for this type.")
            }
            Self::AttributeDeclared => Some(
                "Remove the attribute from `transferable` or disable `strict_declarations`.",
            ),
            Self::UnresolvableRelationship => Some(
                "Many-to-many relationships cannot be transferred; drop them from `transferable`.",
            ),
            Self::TypeMismatch => Some("Transfer only between entities of the same type."),
            Self::DanglingRelationships => {
                Some("Transfer the dependents to another entity before deleting.")
            }
            Self::DatabaseError => Some("Retry once. If persistent, check the database file."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by relationship resolution, dangling checks and transfers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A declared relationship has a kind with no single foreign-key column.
    #[error("can't resolve relationship `{relation}` ({kind}) on {entity_type}")]
    UnresolvableRelationship {
        entity_type: String,
        relation: String,
        kind: RelationKind,
    },

    /// Dependents remain and the caller asked for a hard failure.
    #[error("{entity_type}({key}) still has {count} items that {keyword} be transferred")]
    DanglingRelationships {
        entity_type: String,
        key: KeyValue,
        count: u64,
        keyword: &'static str,
    },

    #[error("unknown entity type `{0}`")]
    UnknownEntityType(String),

    #[error("`{name}` is neither a relation nor an attribute of {entity_type}")]
    UnknownRelationship { entity_type: String, name: String },

    #[error("`{name}` on {entity_type} is an attribute, not a relation")]
    AttributeDeclared { entity_type: String, name: String },

    #[error("cannot transfer from {source_type} to {target_type}: types differ")]
    TypeMismatch {
        source_type: String,
        target_type: String,
    },

    #[error("invalid declaration `{relation}` on {entity_type}: {reason}")]
    InvalidDeclaration {
        entity_type: String,
        relation: String,
        reason: String,
    },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnresolvableRelationship { .. } => ErrorCode::UnresolvableRelationship,
            Self::DanglingRelationships { .. } => ErrorCode::DanglingRelationships,
            Self::UnknownEntityType(_) => ErrorCode::UnknownEntityType,
            Self::UnknownRelationship { .. } => ErrorCode::UnknownRelationship,
            Self::AttributeDeclared { .. } => ErrorCode::AttributeDeclared,
            Self::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            Self::InvalidDeclaration { .. } => ErrorCode::InvalidDeclaration,
            Self::Sqlite(_) => ErrorCode::DatabaseError,
        }
    }

    /// Optional remediation hint for operators and agents.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
