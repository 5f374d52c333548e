//! Paged query runtime.
//!
//! [`open`] picks a backend strategy from [`QueryOptions::query_type`], fetches the first
//! page and hands back a [`Query`] that iterates rows lazily across pages.

pub mod connection;
pub mod cursor;
pub mod executor;
pub mod executors;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::info;

pub use connection::{
    CatalogConnection, GenQueryInput, GenQueryOutput, MAX_SPECIFIC_QUERY_ARGS, MAX_SQL_ROWS, SpecificQueryInput,
};
pub use cursor::{Position, Query};
pub use executor::{Executor, PageOutcome, QueryExecutor};

use crate::config::DatabaseConfig;
use crate::errors::QueryError;
use crate::query_ast::{Select, SelectParser};
use executors::CatalogQuery;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryType {
    #[default]
    General,
    Specific,
    #[cfg(feature = "experimental")]
    Experimental,
}

impl FromStr for QueryType {
    type Err = QueryError;

    /// Case-insensitive; an empty string means `general`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "general" => Ok(QueryType::General),
            "specific" => Ok(QueryType::Specific),
            #[cfg(feature = "experimental")]
            "experimental" => Ok(QueryType::Experimental),
            _ => Err(QueryError::invalid(format!("{} - is not a query type", s))),
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::General => write!(f, "general"),
            QueryType::Specific => write!(f, "specific"),
            #[cfg(feature = "experimental")]
            QueryType::Experimental => write!(f, "experimental"),
        }
    }
}

/// What to run: query text, or an already parsed query.
#[derive(Debug, Clone, PartialEq)]
pub enum QuerySource {
    Text(String),
    Ast(Select),
}

impl From<&str> for QuerySource {
    fn from(s: &str) -> Self { QuerySource::Text(s.to_string()) }
}

impl From<String> for QuerySource {
    fn from(s: String) -> Self { QuerySource::Text(s) }
}

impl From<Select> for QuerySource {
    fn from(s: Select) -> Self { QuerySource::Ast(s) }
}

#[derive(Clone)]
pub struct QueryOptions {
    pub query_type: QueryType,
    /// Positional arguments for a stored query.
    pub specific_args: Vec<String>,
    pub zone_hint: Option<String>,
    /// Maximum rows to yield; zero is unbounded.
    pub limit: u64,
    pub offset: u64,
    pub page_size: u32,
    /// Needed when an ad-hoc SQL query is given as text.
    pub parser: Option<Arc<dyn SelectParser + Send + Sync>>,
    /// Connection settings for ad-hoc SQL; loaded from the environment when absent.
    pub database: Option<DatabaseConfig>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            query_type: QueryType::General,
            specific_args: Vec::new(),
            zone_hint: None,
            limit: 0,
            offset: 0,
            page_size: MAX_SQL_ROWS,
            parser: None,
            database: None,
        }
    }
}

impl fmt::Debug for QueryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("query_type", &self.query_type)
            .field("specific_args", &self.specific_args)
            .field("zone_hint", &self.zone_hint)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("page_size", &self.page_size)
            .field("parser", &self.parser.is_some())
            .finish()
    }
}

impl QueryOptions {
    pub fn with_type(mut self, query_type: QueryType) -> Self {
        self.query_type = query_type;
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.specific_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_zone_hint(mut self, zone: impl Into<String>) -> Self {
        self.zone_hint = Some(zone.into());
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn SelectParser + Send + Sync>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn with_database(mut self, database: DatabaseConfig) -> Self {
        self.database = Some(database);
        self
    }
}

/// Open a query and fetch its first page.
pub fn open<'c, C: CatalogConnection>(
    conn: &'c mut C,
    source: impl Into<QuerySource>,
    options: QueryOptions,
) -> Result<Query<'c, C>, QueryError> {
    if options.page_size == 0 {
        return Err(QueryError::invalid("page size must be greater than zero"));
    }
    let source = source.into();
    info!("opening {} query", options.query_type);

    match options.query_type {
        QueryType::General => {
            let text = match source {
                QuerySource::Text(text) => text,
                QuerySource::Ast(select) => select.to_string(),
            };
            let exec = CatalogQuery::general(conn, text.clone(), options.page_size, options.offset, options.zone_hint);
            Query::start(Executor::General(exec), text, options.limit)
        }
        QueryType::Specific => {
            let QuerySource::Text(sql) = source else {
                return Err(QueryError::invalid("specific queries take stored query text, not a parsed query"));
            };
            let exec = CatalogQuery::specific(
                conn,
                sql.clone(),
                options.specific_args,
                options.page_size,
                options.offset,
                options.zone_hint,
            )?;
            Query::start(Executor::Specific(exec), sql, options.limit)
        }
        #[cfg(feature = "experimental")]
        QueryType::Experimental => {
            use crate::db::SqlSession;
            use executors::ExperimentalQuery;

            let select = match source {
                QuerySource::Ast(select) => select,
                QuerySource::Text(text) => match &options.parser {
                    Some(parser) => parser.parse(&text)?,
                    None => return Err(QueryError::invalid("ad-hoc SQL queries given as text need a parser")),
                },
            };
            let sql = crate::query_ast::compile(&select)?;
            let config = match options.database {
                Some(config) => config,
                None => DatabaseConfig::load()?,
            };
            let session = SqlSession::connect(&config)?;
            let exec = ExperimentalQuery::open(session, &sql, options.limit, options.offset, options.page_size)?;
            Query::start(Executor::Experimental(exec), sql, options.limit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_type_parsing() {
        assert_eq!("".parse::<QueryType>().expect("type"), QueryType::General);
        assert_eq!("GENERAL".parse::<QueryType>().expect("type"), QueryType::General);
        assert_eq!("Specific".parse::<QueryType>().expect("type"), QueryType::Specific);
        let err = "bogus".parse::<QueryType>().unwrap_err();
        assert_eq!(err, QueryError::invalid("bogus - is not a query type"));
    }

    #[cfg(feature = "experimental")]
    #[test]
    fn test_experimental_type() {
        assert_eq!("experimental".parse::<QueryType>().expect("type"), QueryType::Experimental);
        assert_eq!(QueryType::Experimental.to_string(), "experimental");
    }

    #[test]
    fn test_default_options() {
        let opts = QueryOptions::default();
        assert_eq!(opts.page_size, MAX_SQL_ROWS);
        assert_eq!(opts.limit, 0);
        assert_eq!(opts.query_type, QueryType::General);
    }
}
