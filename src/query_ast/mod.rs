//! Logical catalog query compiler.
//!
//! Translates a [`Select`] over logical column names into SQL against the physical
//! catalog schema, inferring the tables to join and how. Each call owns its scratch
//! state, so concurrent compilations never interact.

pub mod ast;
mod context;
mod emitter;
mod linkage;
pub mod schema;

use std::collections::HashMap;

use log::debug;

pub use ast::*;
pub use schema::SchemaCatalog;

use crate::errors::QueryError;
use context::{CompilationContext, InstanceId, ResolvedCondition, ResolvedSelection};

/// Turns query text into a [`Select`]. Implemented by the catalog's query-text parser.
pub trait SelectParser {
    fn parse(&self, text: &str) -> Result<Select, QueryError>;
}

impl<F> SelectParser for F
where
    F: Fn(&str) -> Result<Select, QueryError>,
{
    fn parse(&self, text: &str) -> Result<Select, QueryError> { self(text) }
}

/// Compile against the built-in catalog schema.
pub fn compile(select: &Select) -> Result<String, QueryError> { compile_with(SchemaCatalog::global(), select) }

pub fn compile_with(catalog: &SchemaCatalog, select: &Select) -> Result<String, QueryError> {
    if select.selections.is_empty() {
        return Err(QueryError::invalid("selections are empty"));
    }
    if select.conditions.is_empty() {
        return Err(QueryError::invalid("no conditions provided"));
    }
    for sel in &select.selections {
        if let Selection::Function(func) = sel
            && !is_identifier(&func.name)
        {
            return Err(QueryError::invalid(format!("invalid function name [{}]", func.name)));
        }
    }

    let mut ctx = CompilationContext::new(catalog);

    // selections first so the join tree is rooted at a selected table
    let mut selections = Vec::with_capacity(select.selections.len());
    for sel in &select.selections {
        selections.push(match sel {
            Selection::Function(func) => ResolvedSelection::Function(func.name.clone()),
            Selection::Column(name) => {
                let info = catalog.resolve_column(name)?;
                catalog.table(info.table)?;
                ResolvedSelection::Column { instance: ctx.selection_instance(info.table), column: info.column }
            }
        });
    }

    let mut conditions = Vec::with_capacity(select.conditions.len());
    for entry in &select.conditions {
        conditions.push(resolve_entry(&mut ctx, entry)?);
    }
    debug!("referenced tables: {:?}", ctx.referenced);

    linkage::resolve_linkage(&mut ctx)?;
    linkage::reconcile_aliases(&mut ctx)?;

    let sql = emitter::emit_select(&ctx, &selections, &conditions)?;
    debug!("compiled catalog query: {}", sql);
    Ok(sql)
}

/// Routes one top-level condition entry to table instances. All leaves of the entry
/// that touch the same table share one instance.
fn resolve_entry<'a>(ctx: &mut CompilationContext<'_>, entry: &'a ConditionExpr) -> Result<ResolvedCondition<'a>, QueryError> {
    let mut by_table: Vec<(&'static str, Vec<&'static str>)> = Vec::new();
    for leaf in entry.leaves() {
        let info = ctx.catalog.resolve_column(&leaf.column)?;
        ctx.catalog.table(info.table)?;
        match by_table.iter_mut().find(|(t, _)| *t == info.table) {
            Some((_, cols)) => {
                if !cols.contains(&info.column) {
                    cols.push(info.column);
                }
            }
            None => by_table.push((info.table, vec![info.column])),
        }
    }

    let mut routed: HashMap<&'static str, InstanceId> = HashMap::new();
    for (table, cols) in &by_table {
        routed.insert(*table, ctx.condition_instance(*table, cols));
    }
    build_condition(ctx, &routed, entry)
}

fn build_condition<'a>(
    ctx: &CompilationContext<'_>,
    routed: &HashMap<&'static str, InstanceId>,
    expr: &'a ConditionExpr,
) -> Result<ResolvedCondition<'a>, QueryError> {
    Ok(match expr {
        ConditionExpr::Condition(c) => {
            let info = ctx.catalog.resolve_column(&c.column)?;
            let instance = routed
                .get(info.table)
                .copied()
                .ok_or_else(|| QueryError::invalid(format!("Table does not exist [{}]", info.table)))?;
            ResolvedCondition::Leaf { instance, column: info.column, operator: &c.operator }
        }
        ConditionExpr::And(l, r) => ResolvedCondition::And(
            Box::new(build_condition(ctx, routed, l)?),
            Box::new(build_condition(ctx, routed, r)?),
        ),
        ConditionExpr::Or(l, r) => ResolvedCondition::Or(
            Box::new(build_condition(ctx, routed, l)?),
            Box::new(build_condition(ctx, routed, r)?),
        ),
        ConditionExpr::Not(inner) => ResolvedCondition::Not(Box::new(build_condition(ctx, routed, inner)?)),
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}
