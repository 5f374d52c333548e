//! Parsed form of a logical catalog query.
//!
//! Produced by an external parser (see [`super::SelectParser`]) or deserialized from JSON,
//! consumed once by [`super::compile`].

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Select {
    pub selections: Vec<Selection>,
    pub conditions: Vec<ConditionExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    Column(String),
    /// Wraps the selection that follows it, e.g. `count` + `DATA_ID` -> `count(DATA_ID)`.
    Function(SelectFunction),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectFunction {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionExpr {
    Condition(Condition),
    And(Box<ConditionExpr>, Box<ConditionExpr>),
    Or(Box<ConditionExpr>, Box<ConditionExpr>),
    Not(Box<ConditionExpr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub operator: ConditionOperator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equal(String),
    NotEqual(String),
    LessThan(String),
    LessThanOrEqual(String),
    GreaterThan(String),
    GreaterThanOrEqual(String),
    Between { low: String, high: String },
    In(Vec<String>),
    Like(String),
    ParentOf(String),
    BeginningOf(String),
}

impl Select {
    pub fn new(selections: Vec<Selection>, conditions: Vec<ConditionExpr>) -> Self {
        Self { selections, conditions }
    }
}

impl Selection {
    pub fn column(name: impl Into<String>) -> Self { Selection::Column(name.into()) }
    pub fn function(name: impl Into<String>) -> Self { Selection::Function(SelectFunction { name: name.into() }) }
}

impl ConditionExpr {
    pub fn leaf(column: impl Into<String>, operator: ConditionOperator) -> Self {
        ConditionExpr::Condition(Condition { column: column.into(), operator })
    }

    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::leaf(column, ConditionOperator::Equal(value.into()))
    }

    pub fn and(left: ConditionExpr, right: ConditionExpr) -> Self { ConditionExpr::And(Box::new(left), Box::new(right)) }
    pub fn or(left: ConditionExpr, right: ConditionExpr) -> Self { ConditionExpr::Or(Box::new(left), Box::new(right)) }
    pub fn not(expr: ConditionExpr) -> Self { ConditionExpr::Not(Box::new(expr)) }

    /// Leaf conditions in left-to-right order.
    pub fn leaves(&self) -> Vec<&Condition> {
        fn rec<'a>(e: &'a ConditionExpr, out: &mut Vec<&'a Condition>) {
            match e {
                ConditionExpr::Condition(c) => out.push(c),
                ConditionExpr::And(l, r) | ConditionExpr::Or(l, r) => {
                    rec(l, out);
                    rec(r, out);
                }
                ConditionExpr::Not(inner) => rec(inner, out),
            }
        }
        let mut out = Vec::new();
        rec(self, &mut out);
        out
    }
}

/// Single-quotes a literal, doubling embedded quotes.
pub(crate) fn quote(literal: &str) -> String {
    format!("'{}'", literal.replace('\'', "''"))
}

pub(crate) fn quote_list<S: AsRef<str>>(items: &[S]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| quote(s.as_ref())).collect();
    format!("({})", quoted.join(", "))
}

// Query-text rendering. This is the surface syntax accepted by the general catalog
// entrypoint, so an AST can be submitted there without going through the compiler.

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        let mut items = Vec::new();
        let mut iter = self.selections.iter();
        while let Some(sel) = iter.next() {
            match sel {
                Selection::Column(c) => items.push(c.clone()),
                Selection::Function(func) => match iter.next() {
                    Some(Selection::Column(c)) => items.push(format!("{}({})", func.name, c)),
                    _ => items.push(format!("{}()", func.name)),
                },
            }
        }
        f.write_str(&items.join(", "))?;
        if !self.conditions.is_empty() {
            let conds: Vec<String> = self.conditions.iter().map(|c| c.to_string()).collect();
            write!(f, " WHERE {}", conds.join(" AND "))?;
        }
        Ok(())
    }
}

impl fmt::Display for ConditionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionExpr::Condition(c) => write!(f, "{} {}", c.column, c.operator),
            ConditionExpr::And(l, r) => write!(f, "{} && {}", l, r),
            ConditionExpr::Or(l, r) => write!(f, "{} || {}", l, r),
            ConditionExpr::Not(e) => write!(f, "NOT {}", e),
        }
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ConditionOperator as O;
        match self {
            O::Equal(v) => write!(f, "= {}", quote(v)),
            O::NotEqual(v) => write!(f, "!= {}", quote(v)),
            O::LessThan(v) => write!(f, "< {}", quote(v)),
            O::LessThanOrEqual(v) => write!(f, "<= {}", quote(v)),
            O::GreaterThan(v) => write!(f, "> {}", quote(v)),
            O::GreaterThanOrEqual(v) => write!(f, ">= {}", quote(v)),
            O::Between { low, high } => write!(f, "BETWEEN {} {}", quote(low), quote(high)),
            O::In(list) => write!(f, "IN {}", quote_list(list)),
            O::Like(v) => write!(f, "LIKE {}", quote(v)),
            O::ParentOf(v) => write!(f, "PARENT_OF {}", quote(v)),
            O::BeginningOf(v) => write!(f, "BEGINNING_OF {}", quote(v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_query_text() {
        let select = Select::new(
            vec![Selection::function("count"), Selection::column("DATA_ID"), Selection::column("COLL_NAME")],
            vec![
                ConditionExpr::eq("DATA_NAME", "it's"),
                ConditionExpr::leaf("DATA_RESC_ID", ConditionOperator::In(vec!["1".into(), "2".into()])),
            ],
        );
        assert_eq!(
            select.to_string(),
            "SELECT count(DATA_ID), COLL_NAME WHERE DATA_NAME = 'it''s' AND DATA_RESC_ID IN ('1', '2')"
        );
    }

    #[test]
    fn test_leaves_order() {
        let expr = ConditionExpr::or(
            ConditionExpr::eq("A", "1"),
            ConditionExpr::not(ConditionExpr::eq("B", "2")),
        );
        let cols: Vec<&str> = expr.leaves().iter().map(|c| c.column.as_str()).collect();
        assert_eq!(cols, vec!["A", "B"]);
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "selections": [{"column": "DATA_NAME"}],
            "conditions": [{"condition": {"column": "META_DATA_ATTR_NAME", "operator": {"equal": "a0"}}}]
        }"#;
        let select: Select = serde_json::from_str(json).expect("ok");
        assert_eq!(select.selections, vec![Selection::column("DATA_NAME")]);
        assert_eq!(select.conditions, vec![ConditionExpr::eq("META_DATA_ATTR_NAME", "a0")]);
    }
}
