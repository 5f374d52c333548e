//! Join-graph compilation.
//!
//! Every referenced table is attached to a join tree rooted at the first selected
//! table, each through the shortest foreign-key path to the tree. Cycle-flagged tables
//! may end a path but are never pivoted through. Tables that carry more than one
//! instance (self-joins) then get their own copy of the link table that ties them to
//! the rest of the tree, and alias reconciliation numbers every multiply-used table.

use std::collections::{HashMap, VecDeque};

use log::debug;

use super::context::{CompilationContext, InstanceId, JoinPredicate};
use crate::errors::QueryError;

/// Builds the join tree, the FROM list and the join predicates.
pub(crate) fn resolve_linkage(ctx: &mut CompilationContext<'_>) -> Result<(), QueryError> {
    let Some(&root) = ctx.referenced.first() else {
        return Err(QueryError::invalid("from tables is empty"));
    };
    ctx.catalog.table(root)?;
    ctx.connected.push(root);

    let targets: Vec<&'static str> = ctx.referenced.iter().skip(1).copied().collect();
    for table in targets {
        if ctx.connected.contains(&table) {
            continue;
        }
        for (child, parent, edge) in find_path(ctx, table)? {
            debug!("joining {} to {} via {}", child, parent, ctx.catalog.edge(edge).join_predicate_sql());
            ctx.parents.insert(child, (parent, edge));
            ctx.connected.push(child);
        }
    }

    place_instances(ctx)
}

/// Breadth-first search from `start` to the nearest table already in the join tree.
///
/// Returns `(child, parent, edge)` links ordered from the tree outward.
fn find_path(
    ctx: &mut CompilationContext<'_>,
    start: &'static str,
) -> Result<Vec<(&'static str, &'static str, usize)>, QueryError> {
    let catalog = ctx.catalog;
    catalog.table(start)?;

    ctx.visited.clear();
    ctx.visited.insert(start);
    let mut came_from: HashMap<&'static str, (&'static str, usize)> = HashMap::new();
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        if node != start && catalog.is_cyclic(node)? {
            continue;
        }
        let neighbours: Vec<(usize, &'static str)> = catalog
            .forward_edges(node)
            .map(|(idx, e)| (idx, e.right))
            .chain(catalog.reverse_edges(node).map(|(idx, e)| (idx, e.left)))
            .collect();

        for (edge, next) in neighbours {
            if !ctx.visited.insert(next) {
                continue;
            }
            came_from.insert(next, (node, edge));
            if ctx.connected.contains(&next) {
                let mut path = Vec::new();
                let mut cur = next;
                while cur != start {
                    let (prev, via) = came_from[&cur];
                    path.push((prev, cur, via));
                    cur = prev;
                }
                return Ok(path);
            }
            queue.push_back(next);
        }
    }

    Err(QueryError::invalid(format!("no join path to table [{}]", start)))
}

fn orient(ctx: &CompilationContext<'_>, edge: usize, parent: (&str, InstanceId), child: InstanceId) -> JoinPredicate {
    if ctx.catalog.edge(edge).left == parent.0 {
        JoinPredicate { edge, left: parent.1, right: child }
    } else {
        JoinPredicate { edge, left: child, right: parent.1 }
    }
}

fn place_instances(ctx: &mut CompilationContext<'_>) -> Result<(), QueryError> {
    let connected = ctx.connected.clone();
    let mut primary: HashMap<&'static str, InstanceId> = HashMap::new();

    for &table in &connected {
        let id = match ctx.instances_of(table).first() {
            Some(&id) => id,
            None => ctx.add_instance(table, false),
        };
        primary.insert(table, id);
        ctx.from.push(id);
        if let Some(&(parent, edge)) = ctx.parents.get(table) {
            let join = orient(ctx, edge, (parent, primary[parent]), id);
            ctx.joins.push(join);
        }
    }

    let mut children: HashMap<&'static str, usize> = HashMap::new();
    for &(parent, _) in ctx.parents.values() {
        *children.entry(parent).or_default() += 1;
    }

    for &table in &connected {
        let extras: Vec<InstanceId> = ctx.instances_of(table).into_iter().skip(1).collect();
        for extra in extras {
            // the copy is the table plus at most its unshared link table; it re-attaches
            // to the single instance above that pair
            let mut chain: Vec<(&'static str, Option<InstanceId>)> = vec![(table, Some(extra))];
            let Some(&(parent, _)) = ctx.parents.get(table) else {
                return Err(QueryError::invalid(format!("no join path to table [{}]", table)));
            };
            let mut anchor = parent;
            let shared = ctx.is_referenced(anchor) || children.get(anchor).copied().unwrap_or(0) > 1;
            if !shared {
                if let Some(&(owner, _)) = ctx.parents.get(parent) {
                    chain.push((parent, None));
                    anchor = owner;
                }
            }

            let mut above = (anchor, primary[anchor]);
            for (t, inst) in chain.into_iter().rev() {
                let id = match inst {
                    Some(id) => id,
                    None => ctx.add_instance(t, false),
                };
                ctx.from.push(id);
                let (_, edge) = ctx.parents[t];
                let join = orient(ctx, edge, above, id);
                ctx.joins.push(join);
                above = (t, id);
            }
        }
    }

    Ok(())
}

/// Names every instance in the FROM list.
///
/// A table placed once keeps its catalog alias; a table placed `n` times is aliased
/// `<alias>_1` .. `<alias>_n` in FROM order.
pub(crate) fn reconcile_aliases(ctx: &mut CompilationContext<'_>) -> Result<(), QueryError> {
    let mut totals: HashMap<&'static str, usize> = HashMap::new();
    for &id in &ctx.from {
        *totals.entry(ctx.instances[id].table).or_default() += 1;
    }

    let mut seen: HashMap<&'static str, usize> = HashMap::new();
    for idx in 0..ctx.from.len() {
        let id = ctx.from[idx];
        let table = ctx.instances[id].table;
        let base = ctx.catalog.table(table)?.alias;
        let alias = if totals[table] > 1 {
            let n = seen.entry(table).or_default();
            *n += 1;
            format!("{}_{}", base, n)
        } else {
            base.to_string()
        };
        ctx.instances[id].alias = alias;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_ast::schema::SchemaCatalog;

    fn tables(ctx: &CompilationContext<'_>) -> Vec<String> {
        ctx.from.iter().map(|&id| ctx.instances[id].alias.clone()).collect()
    }

    #[test]
    fn test_single_table_has_no_joins() {
        let mut ctx = CompilationContext::new(SchemaCatalog::global());
        ctx.selection_instance("R_DATA_MAIN");
        resolve_linkage(&mut ctx).expect("linkage");
        reconcile_aliases(&mut ctx).expect("aliases");
        assert_eq!(tables(&ctx), vec!["R_DATA_MAIN"]);
        assert!(ctx.joins.is_empty());
    }

    #[test]
    fn test_intermediate_table_added() {
        let mut ctx = CompilationContext::new(SchemaCatalog::global());
        ctx.selection_instance("R_DATA_MAIN");
        ctx.condition_instance("r_data_meta_main", &["meta_attr_name"]);
        resolve_linkage(&mut ctx).expect("linkage");
        reconcile_aliases(&mut ctx).expect("aliases");
        assert_eq!(tables(&ctx), vec!["R_DATA_MAIN", "r_data_metamap", "r_data_meta_main"]);
        assert_eq!(ctx.joins.len(), 2);
    }

    #[test]
    fn test_self_join_duplicates_link_pair() {
        let mut ctx = CompilationContext::new(SchemaCatalog::global());
        ctx.selection_instance("R_DATA_MAIN");
        ctx.condition_instance("r_data_meta_main", &["meta_attr_name"]);
        ctx.condition_instance("r_data_meta_main", &["meta_attr_name"]);
        resolve_linkage(&mut ctx).expect("linkage");
        reconcile_aliases(&mut ctx).expect("aliases");
        assert_eq!(
            tables(&ctx),
            vec!["R_DATA_MAIN", "r_data_metamap_1", "r_data_meta_main_1", "r_data_metamap_2", "r_data_meta_main_2"]
        );
        assert_eq!(ctx.joins.len(), 4);
    }

    #[test]
    fn test_self_join_keeps_shared_owner() {
        let mut ctx = CompilationContext::new(SchemaCatalog::global());
        ctx.selection_instance("R_COLL_MAIN");
        ctx.condition_instance("r_data_meta_main", &["meta_attr_name"]);
        ctx.condition_instance("r_data_meta_main", &["meta_attr_name"]);
        resolve_linkage(&mut ctx).expect("linkage");
        reconcile_aliases(&mut ctx).expect("aliases");
        assert_eq!(
            tables(&ctx),
            vec![
                "R_COLL_MAIN",
                "R_DATA_MAIN",
                "r_data_metamap_1",
                "r_data_meta_main_1",
                "r_data_metamap_2",
                "r_data_meta_main_2"
            ]
        );
        assert_eq!(ctx.joins.len(), 5);
    }

    #[test]
    fn test_cyclic_table_is_not_a_pivot() {
        // users and resources only meet through the shared zone table
        let mut ctx = CompilationContext::new(SchemaCatalog::global());
        ctx.selection_instance("R_USER_MAIN");
        ctx.condition_instance("R_RESC_MAIN", &["resc_name"]);
        let err = resolve_linkage(&mut ctx).unwrap_err();
        assert!(err.to_string().contains("no join path to table [R_RESC_MAIN]"));
    }

    #[test]
    fn test_cyclic_table_as_endpoint() {
        let mut ctx = CompilationContext::new(SchemaCatalog::global());
        ctx.selection_instance("R_ZONE_MAIN");
        ctx.condition_instance("R_USER_MAIN", &["user_name"]);
        resolve_linkage(&mut ctx).expect("linkage");
        reconcile_aliases(&mut ctx).expect("aliases");
        assert_eq!(tables(&ctx), vec!["R_ZONE_MAIN", "R_USER_MAIN"]);
    }
}
