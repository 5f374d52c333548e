//! Scratch state owned by a single `compile` call.

use std::collections::{HashMap, HashSet};

use super::ast::ConditionOperator;
use super::schema::SchemaCatalog;

pub(crate) type InstanceId = usize;

/// One occurrence of a table in the FROM clause.
#[derive(Debug, Clone)]
pub(crate) struct TableInstance {
    pub table: &'static str,
    /// Referenced by a selection; such tables never get a second instance.
    pub selected: bool,
    /// Columns constrained by conditions routed to this instance.
    pub constrained: HashSet<&'static str>,
    /// Final alias, assigned by alias reconciliation.
    pub alias: String,
}

#[derive(Debug, Clone)]
pub(crate) enum ResolvedSelection {
    Function(String),
    Column { instance: InstanceId, column: &'static str },
}

#[derive(Debug, Clone)]
pub(crate) enum ResolvedCondition<'a> {
    Leaf { instance: InstanceId, column: &'static str, operator: &'a ConditionOperator },
    And(Box<ResolvedCondition<'a>>, Box<ResolvedCondition<'a>>),
    Or(Box<ResolvedCondition<'a>>, Box<ResolvedCondition<'a>>),
    Not(Box<ResolvedCondition<'a>>),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct JoinPredicate {
    pub edge: usize,
    pub left: InstanceId,
    pub right: InstanceId,
}

pub(crate) struct CompilationContext<'s> {
    pub catalog: &'s SchemaCatalog,
    pub instances: Vec<TableInstance>,
    /// Distinct referenced tables, selections first.
    pub referenced: Vec<&'static str>,
    /// FROM list in placement order.
    pub from: Vec<InstanceId>,
    pub joins: Vec<JoinPredicate>,
    /// Join tree over distinct tables: child -> (parent, edge index).
    pub parents: HashMap<&'static str, (&'static str, usize)>,
    /// Tables connected to the join tree, in connection order.
    pub connected: Vec<&'static str>,
    pub visited: HashSet<&'static str>,
}

impl<'s> CompilationContext<'s> {
    pub fn new(catalog: &'s SchemaCatalog) -> Self {
        Self {
            catalog,
            instances: Vec::new(),
            referenced: Vec::new(),
            from: Vec::new(),
            joins: Vec::new(),
            parents: HashMap::new(),
            connected: Vec::new(),
            visited: HashSet::new(),
        }
    }

    pub fn add_instance(&mut self, table: &'static str, selected: bool) -> InstanceId {
        self.instances.push(TableInstance {
            table,
            selected,
            constrained: HashSet::new(),
            alias: String::new(),
        });
        self.instances.len() - 1
    }

    fn reference(&mut self, table: &'static str) {
        if !self.referenced.contains(&table) {
            self.referenced.push(table);
        }
    }

    /// Instances of `table` in creation order.
    pub fn instances_of(&self, table: &str) -> Vec<InstanceId> {
        self.instances.iter().enumerate().filter(|(_, i)| i.table == table).map(|(id, _)| id).collect()
    }

    /// The one instance of a selected table, created on first use.
    pub fn selection_instance(&mut self, table: &'static str) -> InstanceId {
        self.reference(table);
        match self.instances.iter().position(|i| i.table == table) {
            Some(id) => {
                self.instances[id].selected = true;
                id
            }
            None => self.add_instance(table, true),
        }
    }

    /// Routes the columns one top-level condition constrains on `table` to an instance.
    ///
    /// Selected tables always use their single instance. Otherwise the first instance
    /// not yet constraining any of `columns` is reused, or a new one is created.
    pub fn condition_instance(&mut self, table: &'static str, columns: &[&'static str]) -> InstanceId {
        self.reference(table);
        let existing = self.instances_of(table);
        let chosen = match existing.first().copied() {
            Some(first) if self.instances[first].selected => Some(first),
            _ => existing
                .into_iter()
                .find(|&id| columns.iter().all(|c| !self.instances[id].constrained.contains(c))),
        };
        let id = chosen.unwrap_or_else(|| self.add_instance(table, false));
        self.instances[id].constrained.extend(columns.iter().copied());
        id
    }

    pub fn is_referenced(&self, table: &str) -> bool { self.referenced.iter().any(|t| *t == table) }

    pub fn alias_of(&self, id: InstanceId) -> &str { &self.instances[id].alias }
}
