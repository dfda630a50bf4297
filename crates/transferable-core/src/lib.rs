#![forbid(unsafe_code)]
//! transferable-core library.
//!
//! Declared relationships between entity types, dangling-dependent checks,
//! atomic ownership transfer and a pre-delete guard over SQLite.
//!
//! # Conventions
//!
//! - **Errors**: [`Error`] with stable [`ErrorCode`]s; `anyhow::Result` at
//!   configuration boundaries.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod dangling;
pub mod db;
pub mod error;
pub mod guard;
pub mod model;
pub mod registry;
pub mod relation;
pub mod resolve;
pub mod scope;
pub mod transfer;

pub use dangling::{DanglingChecker, RelationCount};
pub use error::{Error, ErrorCode, Result};
pub use guard::DeletionGuard;
pub use model::{
    DeletePolicy, Entity, EntityType, HasRelationships, KeyValue, RelationDescriptor, RelationKind,
};
pub use registry::{Binding, Registry};
pub use resolve::{ForeignKeyColumn, resolve_foreign_key};
pub use transfer::{TransferEngine, TransferReport};
