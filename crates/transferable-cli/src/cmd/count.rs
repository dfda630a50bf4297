//! `xfer count`: per-relationship dependent counts for one entity.

use crate::cmd::{SessionArgs, parse_key};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};
use clap::Args;
use serde::Serialize;
use transferable_core::{DanglingChecker, Entity, KeyValue, RelationCount};

#[derive(Args, Debug)]
pub struct CountArgs {
    /// Registered entity type.
    pub entity_type: String,

    /// Primary key of the entity.
    #[arg(value_parser = parse_key)]
    pub key: KeyValue,
}

#[derive(Debug, Serialize)]
struct CountOutput {
    entity_type: String,
    key: KeyValue,
    relations: Vec<RelationCount>,
    total: u64,
}

pub fn run_count(
    args: &CountArgs,
    session: &SessionArgs,
    output: OutputMode,
) -> anyhow::Result<()> {
    let session = session.open()?;
    let entity = Entity::new(args.entity_type.as_str(), args.key.clone());
    let relations = DanglingChecker::new(&session.registry).breakdown(&session.conn, &entity)?;

    let payload = CountOutput {
        entity_type: entity.entity_type,
        key: entity.key,
        total: relations.iter().map(|r| r.count).sum(),
        relations,
    };

    render_mode(
        output,
        &payload,
        |p, w| {
            for r in &p.relations {
                writeln!(w, "{}\t{}\t{}", r.name, r.kind, r.count)?;
            }
            writeln!(w, "total\t-\t{}", p.total)
        },
        |p, w| {
            pretty_section(w, &format!("{}({}) dependents", p.entity_type, p.key))?;
            for r in &p.relations {
                writeln!(w, "  {:<16} {:<18} {:>6}", r.name, r.kind, r.count)?;
            }
            pretty_kv(w, "total", p.total.to_string())
        },
    )
}
