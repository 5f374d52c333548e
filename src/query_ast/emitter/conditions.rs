//! Condition rendering.
//!
//! Boolean combinators use the catalog's own `&&` / `||` syntax, not SQL `AND` / `OR`.

use crate::errors::QueryError;
use crate::query_ast::ast::{ConditionOperator, quote, quote_list};
use crate::query_ast::context::{CompilationContext, ResolvedCondition};

pub(crate) fn emit_condition(ctx: &CompilationContext<'_>, cond: &ResolvedCondition<'_>) -> Result<String, QueryError> {
    Ok(match cond {
        ResolvedCondition::Leaf { instance, column, operator } => {
            format!("{}.{} {}", ctx.alias_of(*instance), column, emit_operator(operator)?)
        }
        ResolvedCondition::And(l, r) => format!("{} && {}", emit_condition(ctx, l)?, emit_condition(ctx, r)?),
        ResolvedCondition::Or(l, r) => format!("{} || {}", emit_condition(ctx, l)?, emit_condition(ctx, r)?),
        ResolvedCondition::Not(inner) => format!("NOT {}", emit_condition(ctx, inner)?),
    })
}

/// Operator and operand text. Every operand is quoted, `>=` included.
pub(crate) fn emit_operator(op: &ConditionOperator) -> Result<String, QueryError> {
    use ConditionOperator as O;
    Ok(match op {
        O::Equal(v) => format!("= {}", quote(v)),
        O::NotEqual(v) => format!("!= {}", quote(v)),
        O::LessThan(v) => format!("< {}", quote(v)),
        O::LessThanOrEqual(v) => format!("<= {}", quote(v)),
        O::GreaterThan(v) => format!("> {}", quote(v)),
        O::GreaterThanOrEqual(v) => format!(">= {}", quote(v)),
        O::Like(v) => format!("LIKE {}", quote(v)),
        O::Between { low, high } => format!("BETWEEN {} AND {}", quote(low), quote(high)),
        O::In(list) => {
            if list.is_empty() {
                return Err(QueryError::invalid("IN requires at least one value"));
            }
            format!("IN {}", quote_list(list))
        }
        O::ParentOf(path) => format!("IN {}", quote_list(&parent_paths(path)?)),
        O::BeginningOf(s) => format!("IN {}", quote_list(&prefixes(s)?)),
    })
}

/// Every ancestor collection of an absolute path: `/a/b/c` -> `/`, `/a`, `/a/b`.
pub(crate) fn parent_paths(path: &str) -> Result<Vec<String>, QueryError> {
    let trimmed = path.trim_end_matches('/');
    if !path.starts_with('/') || trimmed.is_empty() {
        return Err(QueryError::invalid(format!("PARENT_OF requires an absolute path below the root, got [{}]", path)));
    }

    let segments: Vec<&str> = trimmed[1..].split('/').collect();
    let mut out = vec!["/".to_string()];
    let mut current = String::new();
    for seg in &segments[..segments.len() - 1] {
        current.push('/');
        current.push_str(seg);
        out.push(current.clone());
    }
    Ok(out)
}

/// Every non-empty prefix of `s`, shortest first, split on char boundaries.
pub(crate) fn prefixes(s: &str) -> Result<Vec<String>, QueryError> {
    if s.is_empty() {
        return Err(QueryError::invalid("BEGINNING_OF requires a non-empty value"));
    }
    Ok(s.char_indices().map(|(i, c)| s[..i + c.len_utf8()].to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_quoting() {
        assert_eq!(emit_operator(&ConditionOperator::GreaterThanOrEqual("5".into())).expect("op"), ">= '5'");
        assert_eq!(emit_operator(&ConditionOperator::Equal("o'k".into())).expect("op"), "= 'o''k'");
        assert_eq!(
            emit_operator(&ConditionOperator::Between { low: "1".into(), high: "9".into() }).expect("op"),
            "BETWEEN '1' AND '9'"
        );
        assert_eq!(
            emit_operator(&ConditionOperator::In(vec!["a".into(), "b".into()])).expect("op"),
            "IN ('a', 'b')"
        );
    }

    #[test]
    fn test_empty_in_rejected() {
        assert!(emit_operator(&ConditionOperator::In(vec![])).is_err());
    }

    #[test]
    fn test_parent_paths() {
        assert_eq!(parent_paths("/a/b/c").expect("paths"), vec!["/", "/a", "/a/b"]);
        assert_eq!(parent_paths("/zone/home/").expect("paths"), vec!["/", "/zone"]);
        assert_eq!(parent_paths("/a").expect("paths"), vec!["/"]);
        assert!(parent_paths("/").is_err());
        assert!(parent_paths("relative/path").is_err());
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(prefixes("abc").expect("prefixes"), vec!["a", "ab", "abc"]);
        assert_eq!(prefixes("né").expect("prefixes"), vec!["n", "né"]);
        assert!(prefixes("").is_err());
    }

    #[test]
    fn test_boolean_combinators() {
        use crate::query_ast::schema::SchemaCatalog;
        let mut ctx = CompilationContext::new(SchemaCatalog::global());
        let id = ctx.selection_instance("R_DATA_MAIN");
        ctx.instances[id].alias = "R_DATA_MAIN".into();
        let a = ConditionOperator::Equal("x".into());
        let b = ConditionOperator::Like("y%".into());
        let left = ResolvedCondition::Leaf { instance: id, column: "data_name", operator: &a };
        let right = ResolvedCondition::Leaf { instance: id, column: "data_name", operator: &b };
        let cond = ResolvedCondition::Or(Box::new(left), Box::new(ResolvedCondition::Not(Box::new(right))));
        assert_eq!(
            emit_condition(&ctx, &cond).expect("render"),
            "R_DATA_MAIN.data_name = 'x' || NOT R_DATA_MAIN.data_name LIKE 'y%'"
        );
    }
}
