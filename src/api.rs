//! JSON query operation.
//!
//! A [`QueryService`] answers one JSON request at a time over a single SQL session.
//! Unwindowed queries are served page by page from a server-side cursor; a request
//! carrying `paging` fetches the next page of the cursor left open by the previous one.

use std::sync::Arc;

use log::{error, info, warn};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::DatabaseConfig;
use crate::db::{SqlRunner, SqlSession, declare_statement, fetch_statement, push_window};
use crate::errors::QueryError;
use crate::query::MAX_SQL_ROWS;
use crate::query_ast::{Select, SelectParser, compile};

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: Option<String>,
    pub select: Option<Select>,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Present (with any value) to fetch the next page of the open cursor.
    #[serde(default)]
    pub paging: Option<Value>,
}

fn default_page_size() -> u32 { MAX_SQL_ROWS }

/// Compile `select` and window it. Returns whether the statement pages through a cursor.
///
/// Without an offset or limit the query is declared as cursor `gq_cur`.
pub fn generate_sql(select: &Select, offset: u64, limit: u64) -> Result<(bool, String), QueryError> {
    let sql = compile(select)?;
    if offset == 0 && limit == 0 {
        return Ok((true, declare_statement(&sql, 0, 0)));
    }
    let mut sql = sql;
    push_window(&mut sql, limit, offset);
    sql.push(';');
    Ok((false, sql))
}

pub struct QueryService {
    config: Option<DatabaseConfig>,
    parser: Option<Arc<dyn SelectParser + Send + Sync>>,
    session: Option<Box<dyn SqlRunner + Send>>,
    cursor_open: bool,
}

impl QueryService {
    /// Settings are loaded on first use when `config` is `None`.
    pub fn new(config: Option<DatabaseConfig>) -> Self { Self { config, parser: None, session: None, cursor_open: false } }

    pub fn with_parser(mut self, parser: Arc<dyn SelectParser + Send + Sync>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Use `session` instead of connecting from the configured settings.
    pub fn with_session(mut self, session: Box<dyn SqlRunner + Send>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn handle_str(&mut self, body: &str) -> String {
        let response = match serde_json::from_str::<Value>(body) {
            Ok(request) => self.handle(&request),
            Err(e) => failure(&QueryError::invalid(format!("malformed request: {}", e))),
        };
        response.to_string()
    }

    pub fn handle(&mut self, request: &Value) -> Value {
        match self.try_handle(request) {
            Ok(response) => response,
            Err(e) => {
                error!("query request failed: {}", e);
                failure(&e)
            }
        }
    }

    fn try_handle(&mut self, request: &Value) -> Result<Value, QueryError> {
        let req: QueryRequest = serde_json::from_value(request.clone())
            .map_err(|e| QueryError::invalid(format!("malformed request: {}", e)))?;
        if req.page_size == 0 {
            return Err(QueryError::invalid("page size must be greater than zero"));
        }
        if req.paging.is_some() {
            return self.next_page(req.page_size);
        }

        let select = match (req.select, req.query) {
            (Some(select), _) => select,
            (None, Some(text)) => match &self.parser {
                Some(parser) => parser.parse(&text)?,
                None => return Err(QueryError::invalid("query text given but no parser is configured")),
            },
            (None, None) => return Err(QueryError::invalid("request carries neither query nor select")),
        };
        let (paging, sql) = generate_sql(&select, req.offset, req.limit)?;
        info!("running catalog SQL: {}", sql);

        if self.cursor_open {
            self.close_cursor()?;
        }
        let session = self.session()?;
        if paging {
            session.execute("BEGIN;")?;
            match open_cursor(session.as_mut(), &sql, req.page_size) {
                Ok(rows) => {
                    self.cursor_open = true;
                    Ok(json!({ "sql": sql, "results": rows, "paging": "true", "status": "running" }))
                }
                Err(e) => {
                    // leave no aborted transaction on the session
                    if let Err(rollback) = session.execute("ROLLBACK;") {
                        warn!("failed to roll back cursor transaction: {}", rollback);
                    }
                    Err(e.into())
                }
            }
        } else {
            let rows = session.fetch(&sql)?;
            Ok(json!({ "sql": sql, "results": rows, "status": "complete" }))
        }
    }

    fn next_page(&mut self, page_size: u32) -> Result<Value, QueryError> {
        if !self.cursor_open {
            return Err(QueryError::invalid("no paged query is in progress"));
        }
        let rows = self.session()?.fetch(&fetch_statement(u64::from(page_size)))?;
        if rows.is_empty() {
            self.close_cursor()?;
            return Ok(json!({ "results": [], "status": "complete" }));
        }
        Ok(json!({ "results": rows, "paging": "true", "status": "running" }))
    }

    fn close_cursor(&mut self) -> Result<(), QueryError> {
        self.cursor_open = false;
        self.session()?.execute("COMMIT;")?;
        Ok(())
    }

    fn session(&mut self) -> Result<&mut Box<dyn SqlRunner + Send>, QueryError> {
        if self.session.is_none() {
            let config = match &self.config {
                Some(config) => config.clone(),
                None => DatabaseConfig::load()?,
            };
            self.session = Some(Box::new(SqlSession::connect(&config)?));
        }
        self.session.as_mut().ok_or_else(|| QueryError::Connection("Failed to connect to catalog".to_string()))
    }
}

fn open_cursor(session: &mut dyn SqlRunner, declare: &str, page_size: u32) -> Result<Vec<Vec<String>>, sqlx::Error> {
    session.execute(declare)?;
    session.fetch(&fetch_statement(u64::from(page_size)))
}

impl Drop for QueryService {
    fn drop(&mut self) {
        if self.cursor_open
            && let Some(session) = self.session.as_mut()
            && let Err(e) = session.execute("COMMIT;")
        {
            warn!("failed to commit open cursor transaction: {}", e);
        }
    }
}

fn failure(e: &QueryError) -> Value {
    json!({ "status": "failed", "errors": { "code": e.code(), "message": e.to_string() } })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_ast::{ConditionExpr, Selection};

    fn select() -> Select {
        Select::new(vec![Selection::column("DATA_NAME")], vec![ConditionExpr::eq("DATA_ID", "1")])
    }

    #[test]
    fn test_generate_sql_paging() {
        let (paging, sql) = generate_sql(&select(), 0, 0).expect("sql");
        assert!(paging);
        assert_eq!(
            sql,
            "DECLARE gq_cur CURSOR FOR SELECT R_DATA_MAIN.data_name FROM R_DATA_MAIN WHERE R_DATA_MAIN.data_id = '1';"
        );
    }

    #[test]
    fn test_generate_sql_window() {
        let (paging, sql) = generate_sql(&select(), 20, 10).expect("sql");
        assert!(!paging);
        assert!(sql.ends_with(" LIMIT 10 OFFSET 20;"));
        assert!(sql.starts_with("SELECT "));
    }
}
