//! `xfer transfer`: move every dependent of one entity to another.

use crate::cmd::{SessionArgs, parse_key};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};
use clap::Args;
use transferable_core::{Entity, KeyValue, TransferEngine};

#[derive(Args, Debug)]
pub struct TransferArgs {
    /// Registered entity type of both entities.
    pub entity_type: String,

    /// Key of the entity giving up its dependents.
    #[arg(value_parser = parse_key)]
    pub from: KeyValue,

    /// Key of the entity receiving them.
    #[arg(value_parser = parse_key)]
    pub to: KeyValue,

    /// Perform the updates, report the counts, then roll back.
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run_transfer(
    args: &TransferArgs,
    session: &SessionArgs,
    output: OutputMode,
) -> anyhow::Result<()> {
    let session = session.open()?;
    let source = Entity::new(args.entity_type.as_str(), args.from.clone());
    let target = Entity::new(args.entity_type.as_str(), args.to.clone());

    let report = TransferEngine::new(&session.registry).transfer_report(
        &session.conn,
        &source,
        &target,
        args.dry_run,
    )?;

    render_mode(
        output,
        &report,
        |r, w| {
            for relation in &r.relations {
                writeln!(w, "{}\t{}\t{}", relation.name, relation.kind, relation.count)?;
            }
            writeln!(w, "total\t-\t{}", r.total())
        },
        |r, w| {
            let verb = if r.dry_run { "would move" } else { "moved" };
            pretty_section(
                w,
                &format!("{}({}) -> {}({})", r.entity_type, r.source, r.entity_type, r.target),
            )?;
            for relation in &r.relations {
                writeln!(
                    w,
                    "  {:<16} {:<18} {:>6}",
                    relation.name, relation.kind, relation.count
                )?;
            }
            pretty_kv(w, verb, r.total().to_string())?;
            if r.dry_run {
                writeln!(w, "dry run: nothing was changed")?;
            }
            Ok(())
        },
    )
}
