//! Static description of the physical catalog schema.
//!
//! Three read-only maps drive compilation: logical column -> (table, physical column),
//! table -> (FROM fragment, cycle-avoidance flag) and the foreign-key edge list.
//! Tables are keyed by their alias, so one physical table can appear under several
//! logical names (`R_META_MAIN` as data, collection, resource and user metadata).

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::errors::QueryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnInfo {
    pub table: &'static str,
    pub column: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableInfo {
    pub physical: &'static str,
    pub alias: &'static str,
    /// Shared hub or self-referential table. May end a join path, never pivot one.
    pub cyclic: bool,
}

impl TableInfo {
    /// FROM fragment for this table under `alias`.
    pub fn from_fragment(&self, alias: &str) -> String {
        if alias == self.physical { alias.to_string() } else { format!("{} {}", self.physical, alias) }
    }
}

/// Undirected link between two tables; `left.left_column = right.right_column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKeyEdge {
    pub left: &'static str,
    pub left_column: &'static str,
    pub right: &'static str,
    pub right_column: &'static str,
}

impl ForeignKeyEdge {
    pub fn predicate(&self, left_alias: &str, right_alias: &str) -> String {
        format!("{}.{} = {}.{}", left_alias, self.left_column, right_alias, self.right_column)
    }

    /// Join predicate with both sides under their base aliases.
    pub fn join_predicate_sql(&self) -> String { self.predicate(self.left, self.right) }
}

pub struct SchemaCatalog {
    columns: HashMap<&'static str, ColumnInfo>,
    tables: HashMap<&'static str, TableInfo>,
    edges: Vec<ForeignKeyEdge>,
}

impl SchemaCatalog {
    pub fn new(
        columns: &[(&'static str, &'static str, &'static str)],
        tables: &[(&'static str, &'static str, bool)],
        edges: &[(&'static str, &'static str, &'static str, &'static str)],
    ) -> Self {
        Self {
            columns: columns.iter().map(|&(name, table, column)| (name, ColumnInfo { table, column })).collect(),
            tables: tables
                .iter()
                .map(|&(alias, physical, cyclic)| (alias, TableInfo { physical, alias, cyclic }))
                .collect(),
            edges: edges
                .iter()
                .map(|&(left, left_column, right, right_column)| ForeignKeyEdge { left, left_column, right, right_column })
                .collect(),
        }
    }

    /// The process-wide catalog. Immutable, shared by every compilation.
    pub fn global() -> &'static SchemaCatalog {
        static INSTANCE: Lazy<SchemaCatalog> = Lazy::new(|| SchemaCatalog::new(COLUMNS, TABLES, FOREIGN_KEYS));
        &INSTANCE
    }

    pub fn resolve_column(&self, name: &str) -> Result<ColumnInfo, QueryError> {
        self.columns
            .get(name)
            .copied()
            .ok_or_else(|| QueryError::invalid(format!("failed to find column named [{}]", name)))
    }

    pub fn table(&self, name: &str) -> Result<&TableInfo, QueryError> {
        self.tables.get(name).ok_or_else(|| QueryError::invalid(format!("Table does not exist [{}]", name)))
    }

    pub fn is_cyclic(&self, name: &str) -> Result<bool, QueryError> { Ok(self.table(name)?.cyclic) }

    /// Edges where `table` is the left side, in catalog order, paired with the edge index.
    pub fn forward_edges<'a>(&'a self, table: &'a str) -> impl Iterator<Item = (usize, &'a ForeignKeyEdge)> + 'a {
        self.edges.iter().enumerate().filter(move |(_, e)| e.left == table)
    }

    /// Edges where `table` is the right side, in catalog order, paired with the edge index.
    pub fn reverse_edges<'a>(&'a self, table: &'a str) -> impl Iterator<Item = (usize, &'a ForeignKeyEdge)> + 'a {
        self.edges.iter().enumerate().filter(move |(_, e)| e.right == table)
    }

    pub fn edge(&self, idx: usize) -> &ForeignKeyEdge { &self.edges[idx] }

    pub fn column_names(&self) -> impl Iterator<Item = &&'static str> { self.columns.keys() }
}

// (logical column, table alias, physical column)
const COLUMNS: &[(&str, &str, &str)] = &[
    ("ZONE_ID", "R_ZONE_MAIN", "zone_id"),
    ("ZONE_NAME", "R_ZONE_MAIN", "zone_name"),
    ("ZONE_TYPE", "R_ZONE_MAIN", "zone_type_name"),
    ("ZONE_CONNECTION", "R_ZONE_MAIN", "zone_conn_string"),
    ("USER_ID", "R_USER_MAIN", "user_id"),
    ("USER_NAME", "R_USER_MAIN", "user_name"),
    ("USER_TYPE", "R_USER_MAIN", "user_type_name"),
    ("USER_ZONE", "R_USER_MAIN", "zone_name"),
    ("USER_INFO", "R_USER_MAIN", "user_info"),
    ("USER_CREATE_TIME", "R_USER_MAIN", "create_ts"),
    ("USER_MODIFY_TIME", "R_USER_MAIN", "modify_ts"),
    ("USER_GROUP_ID", "R_USER_GROUP", "group_user_id"),
    ("USER_GROUP_NAME", "r_group_main", "user_name"),
    ("RESC_ID", "R_RESC_MAIN", "resc_id"),
    ("RESC_NAME", "R_RESC_MAIN", "resc_name"),
    ("RESC_ZONE_NAME", "R_RESC_MAIN", "zone_name"),
    ("RESC_TYPE_NAME", "R_RESC_MAIN", "resc_type_name"),
    ("RESC_LOC", "R_RESC_MAIN", "resc_net"),
    ("RESC_VAULT_PATH", "R_RESC_MAIN", "resc_def_path"),
    ("RESC_STATUS", "R_RESC_MAIN", "resc_status"),
    ("RESC_PARENT", "R_RESC_MAIN", "resc_parent"),
    ("RESC_CHILDREN", "R_RESC_MAIN", "resc_children"),
    ("RESC_CONTEXT", "R_RESC_MAIN", "resc_context"),
    ("COLL_ID", "R_COLL_MAIN", "coll_id"),
    ("COLL_NAME", "R_COLL_MAIN", "coll_name"),
    ("COLL_PARENT_NAME", "R_COLL_MAIN", "parent_coll_name"),
    ("COLL_OWNER_NAME", "R_COLL_MAIN", "coll_owner_name"),
    ("COLL_OWNER_ZONE", "R_COLL_MAIN", "coll_owner_zone"),
    ("COLL_INHERITANCE", "R_COLL_MAIN", "coll_inheritance"),
    ("COLL_CREATE_TIME", "R_COLL_MAIN", "create_ts"),
    ("COLL_MODIFY_TIME", "R_COLL_MAIN", "modify_ts"),
    ("DATA_ID", "R_DATA_MAIN", "data_id"),
    ("DATA_COLL_ID", "R_DATA_MAIN", "coll_id"),
    ("DATA_NAME", "R_DATA_MAIN", "data_name"),
    ("DATA_REPL_NUM", "R_DATA_MAIN", "data_repl_num"),
    ("DATA_VERSION", "R_DATA_MAIN", "data_version"),
    ("DATA_TYPE_NAME", "R_DATA_MAIN", "data_type_name"),
    ("DATA_SIZE", "R_DATA_MAIN", "data_size"),
    ("DATA_PATH", "R_DATA_MAIN", "data_path"),
    ("DATA_OWNER_NAME", "R_DATA_MAIN", "data_owner_name"),
    ("DATA_OWNER_ZONE", "R_DATA_MAIN", "data_owner_zone"),
    ("DATA_REPL_STATUS", "R_DATA_MAIN", "data_is_dirty"),
    ("DATA_STATUS", "R_DATA_MAIN", "data_status"),
    ("DATA_CHECKSUM", "R_DATA_MAIN", "data_checksum"),
    ("DATA_EXPIRY", "R_DATA_MAIN", "data_expiry_ts"),
    ("DATA_MODE", "R_DATA_MAIN", "data_mode"),
    ("DATA_CREATE_TIME", "R_DATA_MAIN", "create_ts"),
    ("DATA_MODIFY_TIME", "R_DATA_MAIN", "modify_ts"),
    ("DATA_RESC_ID", "R_DATA_MAIN", "resc_id"),
    ("DATA_ACCESS_TYPE", "r_data_access", "access_type_id"),
    ("DATA_ACCESS_USER_ID", "r_data_access", "user_id"),
    ("DATA_ACCESS_NAME", "r_data_tokn_accs", "token_name"),
    ("COLL_ACCESS_TYPE", "r_coll_access", "access_type_id"),
    ("COLL_ACCESS_USER_ID", "r_coll_access", "user_id"),
    ("COLL_ACCESS_NAME", "r_coll_tokn_accs", "token_name"),
    ("META_DATA_ATTR_NAME", "r_data_meta_main", "meta_attr_name"),
    ("META_DATA_ATTR_VALUE", "r_data_meta_main", "meta_attr_value"),
    ("META_DATA_ATTR_UNITS", "r_data_meta_main", "meta_attr_unit"),
    ("META_DATA_ATTR_ID", "r_data_meta_main", "meta_id"),
    ("META_DATA_CREATE_TIME", "r_data_metamap", "create_ts"),
    ("META_DATA_MODIFY_TIME", "r_data_metamap", "modify_ts"),
    ("META_COLL_ATTR_NAME", "r_coll_meta_main", "meta_attr_name"),
    ("META_COLL_ATTR_VALUE", "r_coll_meta_main", "meta_attr_value"),
    ("META_COLL_ATTR_UNITS", "r_coll_meta_main", "meta_attr_unit"),
    ("META_COLL_ATTR_ID", "r_coll_meta_main", "meta_id"),
    ("META_RESC_ATTR_NAME", "r_resc_meta_main", "meta_attr_name"),
    ("META_RESC_ATTR_VALUE", "r_resc_meta_main", "meta_attr_value"),
    ("META_RESC_ATTR_UNITS", "r_resc_meta_main", "meta_attr_unit"),
    ("META_RESC_ATTR_ID", "r_resc_meta_main", "meta_id"),
    ("META_USER_ATTR_NAME", "r_user_meta_main", "meta_attr_name"),
    ("META_USER_ATTR_VALUE", "r_user_meta_main", "meta_attr_value"),
    ("META_USER_ATTR_UNITS", "r_user_meta_main", "meta_attr_unit"),
    ("META_USER_ATTR_ID", "r_user_meta_main", "meta_id"),
];

// (table alias, physical table, cycle-avoidance flag)
const TABLES: &[(&str, &str, bool)] = &[
    ("R_ZONE_MAIN", "R_ZONE_MAIN", true),
    ("R_USER_MAIN", "R_USER_MAIN", false),
    ("R_USER_GROUP", "R_USER_GROUP", false),
    ("r_group_main", "R_USER_MAIN", false),
    ("R_RESC_MAIN", "R_RESC_MAIN", false),
    ("R_COLL_MAIN", "R_COLL_MAIN", false),
    ("R_DATA_MAIN", "R_DATA_MAIN", false),
    ("r_data_access", "R_OBJT_ACCESS", false),
    ("r_data_tokn_accs", "R_TOKN_MAIN", false),
    ("r_coll_access", "R_OBJT_ACCESS", false),
    ("r_coll_tokn_accs", "R_TOKN_MAIN", false),
    ("r_data_metamap", "R_OBJT_METAMAP", false),
    ("r_data_meta_main", "R_META_MAIN", false),
    ("r_coll_metamap", "R_OBJT_METAMAP", false),
    ("r_coll_meta_main", "R_META_MAIN", false),
    ("r_resc_metamap", "R_OBJT_METAMAP", false),
    ("r_resc_meta_main", "R_META_MAIN", false),
    ("r_user_metamap", "R_OBJT_METAMAP", false),
    ("r_user_meta_main", "R_META_MAIN", false),
];

// (left table, left column, right table, right column)
const FOREIGN_KEYS: &[(&str, &str, &str, &str)] = &[
    ("R_COLL_MAIN", "coll_id", "R_DATA_MAIN", "coll_id"),
    ("R_DATA_MAIN", "resc_id", "R_RESC_MAIN", "resc_id"),
    ("R_DATA_MAIN", "data_id", "r_data_metamap", "object_id"),
    ("r_data_metamap", "meta_id", "r_data_meta_main", "meta_id"),
    ("R_DATA_MAIN", "data_id", "r_data_access", "object_id"),
    ("r_data_access", "access_type_id", "r_data_tokn_accs", "token_id"),
    ("R_COLL_MAIN", "coll_id", "r_coll_metamap", "object_id"),
    ("r_coll_metamap", "meta_id", "r_coll_meta_main", "meta_id"),
    ("R_COLL_MAIN", "coll_id", "r_coll_access", "object_id"),
    ("r_coll_access", "access_type_id", "r_coll_tokn_accs", "token_id"),
    ("R_RESC_MAIN", "resc_id", "r_resc_metamap", "object_id"),
    ("r_resc_metamap", "meta_id", "r_resc_meta_main", "meta_id"),
    ("R_USER_MAIN", "user_id", "r_user_metamap", "object_id"),
    ("r_user_metamap", "meta_id", "r_user_meta_main", "meta_id"),
    ("R_USER_MAIN", "user_id", "R_USER_GROUP", "user_id"),
    ("R_USER_GROUP", "group_user_id", "r_group_main", "user_id"),
    ("R_RESC_MAIN", "zone_name", "R_ZONE_MAIN", "zone_name"),
    ("R_USER_MAIN", "zone_name", "R_ZONE_MAIN", "zone_name"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_column_table_exists() {
        let catalog = SchemaCatalog::global();
        for name in catalog.column_names() {
            let info = catalog.resolve_column(name).expect("column");
            assert!(catalog.table(info.table).is_ok(), "column {} points at unknown table {}", name, info.table);
        }
    }

    #[test]
    fn test_every_edge_table_exists() {
        let catalog = SchemaCatalog::global();
        for e in &catalog.edges {
            assert!(catalog.table(e.left).is_ok(), "{}", e.left);
            assert!(catalog.table(e.right).is_ok(), "{}", e.right);
        }
    }

    #[test]
    fn test_unknown_column() {
        let err = SchemaCatalog::global().resolve_column("NOPE").unwrap_err();
        assert!(err.to_string().contains("failed to find column named [NOPE]"));
    }

    #[test]
    fn test_from_fragment() {
        let catalog = SchemaCatalog::global();
        let data = catalog.table("R_DATA_MAIN").expect("table");
        assert_eq!(data.from_fragment("R_DATA_MAIN"), "R_DATA_MAIN");
        let meta = catalog.table("r_data_meta_main").expect("table");
        assert_eq!(meta.from_fragment("r_data_meta_main_2"), "R_META_MAIN r_data_meta_main_2");
    }

    #[test]
    fn test_edge_predicate() {
        let catalog = SchemaCatalog::global();
        let (_, edge) = catalog.forward_edges("r_data_metamap").next().expect("edge");
        assert_eq!(edge.join_predicate_sql(), "r_data_metamap.meta_id = r_data_meta_main.meta_id");
    }
}
