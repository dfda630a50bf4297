//! `xfer check`: fail when an entity still has dependents.

use crate::cmd::{SessionArgs, parse_key};
use crate::output::{OutputMode, render_mode};
use clap::Args;
use serde::Serialize;
use transferable_core::{DanglingChecker, DeletePolicy, DeletionGuard, Entity, KeyValue};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Registered entity type.
    pub entity_type: String,

    /// Primary key of the entity.
    #[arg(value_parser = parse_key)]
    pub key: KeyValue,

    /// Report the count instead of failing when dependents remain.
    #[arg(long)]
    pub no_raise: bool,
}

#[derive(Debug, Serialize)]
struct CheckOutput {
    entity_type: String,
    key: KeyValue,
    policy: DeletePolicy,
    dangling: u64,
}

pub fn run_check(
    args: &CheckArgs,
    session: &SessionArgs,
    output: OutputMode,
) -> anyhow::Result<()> {
    let session = session.open()?;
    let entity = Entity::new(args.entity_type.as_str(), args.key.clone());
    let policy = DeletionGuard::new(&session.registry).policy(&entity)?;
    let dangling = DanglingChecker::new(&session.registry).check_dangling(
        &session.conn,
        &entity,
        !args.no_raise,
    )?;

    let payload = CheckOutput {
        entity_type: entity.entity_type,
        key: entity.key,
        policy,
        dangling,
    };

    render_mode(
        output,
        &payload,
        |p, w| writeln!(w, "{}\t{}\t{}", p.entity_type, p.key, p.dangling),
        |p, w| {
            if p.dangling == 0 {
                writeln!(w, "{}({}) has no dependents", p.entity_type, p.key)
            } else {
                writeln!(
                    w,
                    "{}({}) still has {} items that {} be transferred",
                    p.entity_type,
                    p.key,
                    p.dangling,
                    p.policy.keyword()
                )
            }
        },
    )
}
