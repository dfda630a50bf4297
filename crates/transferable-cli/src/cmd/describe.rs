//! `xfer describe`: list registered entity types and their declarations.

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};
use clap::Args;
use serde::Serialize;
use std::path::Path;
use transferable_core::{DeletePolicy, EntityType, Registry, RelationKind};

#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// Only describe this entity type.
    pub entity_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct RelationSummary {
    name: String,
    kind: RelationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    related: Option<String>,
    foreign_key: String,
    transferable: bool,
}

#[derive(Debug, Serialize)]
struct TypeSummary {
    name: String,
    table: String,
    primary_key: String,
    policy: DeletePolicy,
    declared: Vec<String>,
    relations: Vec<RelationSummary>,
    /// Declared names that a transfer would reject.
    untransferable: Vec<String>,
}

impl TypeSummary {
    fn new(registry: &Registry, entity_type: &EntityType) -> Self {
        let relations = entity_type
            .relations
            .iter()
            .map(|(name, descriptor)| RelationSummary {
                name: name.clone(),
                kind: descriptor.kind,
                related: descriptor.related.clone(),
                foreign_key: descriptor.foreign_key.clone(),
                transferable: entity_type.transferable.contains(name),
            })
            .collect();
        Self {
            name: entity_type.name.clone(),
            table: entity_type.table.clone(),
            primary_key: entity_type.primary_key.clone(),
            policy: entity_type.delete_policy(),
            declared: entity_type.transferable.clone(),
            relations,
            untransferable: registry
                .untransferable(entity_type)
                .into_iter()
                .map(|(name, _)| name)
                .collect(),
        }
    }
}

const fn policy_label(policy: DeletePolicy) -> &'static str {
    match policy {
        DeletePolicy::Strict => "strict",
        DeletePolicy::Lenient => "lenient",
    }
}

pub fn run_describe(
    args: &DescribeArgs,
    registry_path: &Path,
    output: OutputMode,
) -> anyhow::Result<()> {
    let (_, registry) = super::load_registry(registry_path)?;

    let summaries = match args.entity_type.as_deref() {
        Some(name) => vec![TypeSummary::new(&registry, registry.get(name)?)],
        None => registry
            .types()
            .map(|entity_type| TypeSummary::new(&registry, entity_type))
            .collect(),
    };

    render_mode(
        output,
        &summaries,
        |types, w| {
            for t in types {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}",
                    t.name,
                    t.table,
                    policy_label(t.policy),
                    t.declared.join(",")
                )?;
            }
            Ok(())
        },
        |types, w| {
            if types.is_empty() {
                writeln!(w, "No entity types registered in {}", registry_path.display())?;
                return Ok(());
            }
            for t in types {
                pretty_section(w, &format!("{} ({}.{})", t.name, t.table, t.primary_key))?;
                pretty_kv(w, "policy", policy_label(t.policy))?;
                pretty_kv(w, "declared", t.declared.join(", "))?;
                for r in &t.relations {
                    let marker = if r.transferable { "*" } else { " " };
                    writeln!(
                        w,
                        "  {marker} {:<16} {:<18} {} via {}",
                        r.name,
                        r.kind,
                        r.related.as_deref().unwrap_or("(polymorphic)"),
                        r.foreign_key
                    )?;
                }
                if !t.untransferable.is_empty() {
                    pretty_kv(w, "blocked", t.untransferable.join(", "))?;
                }
                writeln!(w)?;
            }
            Ok(())
        },
    )
}
