//! `xfer delete`: guarded delete of one entity row.
//!
//! The row is removed inside the same savepoint as the dangling check, so a
//! strict entity is never deleted between a passing check and the delete.

use crate::cmd::{SessionArgs, parse_key};
use crate::output::{OutputMode, render_mode};
use anyhow::bail;
use clap::Args;
use serde::Serialize;
use transferable_core::db::quote_ident;
use transferable_core::{DeletePolicy, DeletionGuard, Entity, KeyValue};

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Registered entity type.
    pub entity_type: String,

    /// Primary key of the row to delete.
    #[arg(value_parser = parse_key)]
    pub key: KeyValue,
}

#[derive(Debug, Serialize)]
struct DeleteOutput {
    entity_type: String,
    key: KeyValue,
    policy: DeletePolicy,
    deleted: usize,
}

pub fn run_delete(
    args: &DeleteArgs,
    session: &SessionArgs,
    output: OutputMode,
) -> anyhow::Result<()> {
    let session = session.open()?;
    let entity_type = session.registry.get(&args.entity_type)?;
    let entity = Entity::new(entity_type.name.as_str(), args.key.clone());
    let sql = format!(
        "DELETE FROM {} WHERE {} = ?1",
        quote_ident(&entity_type.table),
        quote_ident(&entity_type.primary_key)
    );

    let guard = DeletionGuard::new(&session.registry);
    let deleted = guard.delete_with(&session.conn, &entity, |conn| {
        Ok(conn.execute(&sql, [&entity.key])?)
    })?;
    if deleted == 0 {
        bail!("{}({}) not found", entity.entity_type, entity.key);
    }

    let payload = DeleteOutput {
        entity_type: entity.entity_type,
        key: entity.key,
        policy: entity_type.delete_policy(),
        deleted,
    };

    render_mode(
        output,
        &payload,
        |p, w| writeln!(w, "{}\t{}\tdeleted", p.entity_type, p.key),
        |p, w| writeln!(w, "deleted {}({})", p.entity_type, p.key),
    )
}
