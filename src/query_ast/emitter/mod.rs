use super::context::{CompilationContext, ResolvedCondition, ResolvedSelection};
use crate::errors::QueryError;

pub mod conditions;
use conditions::emit_condition;

/// Assembles `SELECT <selections> FROM <from> WHERE <conditions>[ AND <joins>]`.
pub(crate) fn emit_select(
    ctx: &CompilationContext<'_>,
    selections: &[ResolvedSelection],
    conditions: &[ResolvedCondition<'_>],
) -> Result<String, QueryError> {
    let selection_sql = emit_selections(ctx, selections)?;

    let from = ctx
        .from
        .iter()
        .map(|&id| Ok(ctx.catalog.table(ctx.instances[id].table)?.from_fragment(ctx.alias_of(id))))
        .collect::<Result<Vec<_>, QueryError>>()?
        .join(", ");

    let where_clause = conditions
        .iter()
        .map(|c| emit_condition(ctx, c))
        .collect::<Result<Vec<_>, _>>()?
        .join(" AND ");

    let mut sql = format!("SELECT {} FROM {} WHERE {}", selection_sql, from, where_clause);
    if !ctx.joins.is_empty() {
        let joins = ctx
            .joins
            .iter()
            .map(|j| ctx.catalog.edge(j.edge).predicate(ctx.alias_of(j.left), ctx.alias_of(j.right)))
            .collect::<Vec<_>>()
            .join(" AND ");
        sql.push_str(" AND ");
        sql.push_str(&joins);
    }
    Ok(sql)
}

/// Renders the selection list.
///
/// A function wraps the selection that follows it. The paren counter is bumped after
/// the function itself is rendered and closes the call after its argument.
pub(crate) fn emit_selections(ctx: &CompilationContext<'_>, selections: &[ResolvedSelection]) -> Result<String, QueryError> {
    if selections.is_empty() {
        return Err(QueryError::invalid("selections are empty"));
    }

    let mut out = String::new();
    let mut paren = 0u8;
    for (idx, sel) in selections.iter().enumerate() {
        match sel {
            ResolvedSelection::Function(name) => {
                match selections.get(idx + 1) {
                    Some(ResolvedSelection::Column { .. }) => {}
                    Some(ResolvedSelection::Function(next)) => {
                        return Err(QueryError::invalid(format!(
                            "function [{}] cannot take function [{}] as its argument",
                            name, next
                        )));
                    }
                    None => return Err(QueryError::invalid(format!("function [{}] has no argument", name))),
                }
                out.push_str(name);
                out.push('(');
                paren = 1;
            }
            ResolvedSelection::Column { instance, column } => {
                out.push_str(ctx.alias_of(*instance));
                out.push('.');
                out.push_str(column);
            }
        }

        match paren {
            0 => out.push_str(", "),
            1 => paren = 2,
            _ => {
                out.push_str("), ");
                paren = 0;
            }
        }
    }

    if out.ends_with(", ") {
        out.truncate(out.len() - 2);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_ast::schema::SchemaCatalog;

    fn ctx_with_alias(alias: &str) -> CompilationContext<'static> {
        let mut ctx = CompilationContext::new(SchemaCatalog::global());
        let id = ctx.selection_instance("R_DATA_MAIN");
        ctx.instances[id].alias = alias.to_string();
        ctx
    }

    fn col(column: &'static str) -> ResolvedSelection { ResolvedSelection::Column { instance: 0, column } }

    #[test]
    fn test_function_wraps_next_selection() {
        let ctx = ctx_with_alias("tbl");
        let sql = emit_selections(&ctx, &[ResolvedSelection::Function("count".into()), col("x")]).expect("render");
        assert_eq!(sql, "count(tbl.x)");
    }

    #[test]
    fn test_plain_columns_are_comma_separated() {
        let ctx = ctx_with_alias("tbl");
        let sql = emit_selections(&ctx, &[col("a"), col("b")]).expect("render");
        assert_eq!(sql, "tbl.a, tbl.b");
    }

    #[test]
    fn test_function_between_columns() {
        let ctx = ctx_with_alias("t");
        let sql = emit_selections(&ctx, &[col("a"), ResolvedSelection::Function("sum".into()), col("b"), col("c")])
            .expect("render");
        assert_eq!(sql, "t.a, sum(t.b), t.c");
    }

    #[test]
    fn test_dangling_function_rejected() {
        let ctx = ctx_with_alias("t");
        let err = emit_selections(&ctx, &[col("a"), ResolvedSelection::Function("max".into())]).unwrap_err();
        assert!(matches!(err, QueryError::InvalidInput(_)));
    }

    #[test]
    fn test_nested_function_rejected() {
        let ctx = ctx_with_alias("t");
        let err = emit_selections(
            &ctx,
            &[ResolvedSelection::Function("max".into()), ResolvedSelection::Function("min".into()), col("a")],
        )
        .unwrap_err();
        assert!(err.to_string().contains("[max]"));
    }
}
