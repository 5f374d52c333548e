use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::errors::QueryError;

/// Environment variable holding a full `postgres://` URL. Wins over the server config file.
pub const DATABASE_URL_ENV: &str = "CATALOG_DATABASE_URL";
/// Environment variable pointing at the server configuration file.
pub const SERVER_CONFIG_ENV: &str = "CATALOG_SERVER_CONFIG";

const SERVER_CONFIG_FILE: &str = "server_config.json";
const SUPPORTED_INSTANCE: &str = "postgres";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: String,
    pub password: String,
    /// Database plugin instance the settings came from (`postgres`).
    pub instance: String,
    /// Full connection URL, when configured through the environment.
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerConfig {
    plugin_configuration: PluginConfiguration,
}

#[derive(Debug, Deserialize)]
struct PluginConfiguration {
    database: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct DatabaseEntry {
    db_host: String,
    db_port: u16,
    db_name: String,
    db_username: String,
    db_password: String,
}

fn connect_failure() -> QueryError { QueryError::Connection("Failed to connect to catalog".to_string()) }

impl DatabaseConfig {
    /// Resolve settings from the environment, then from the server config file.
    pub fn load() -> Result<Self, QueryError> {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV)
            && !url.trim().is_empty()
        {
            info!("Using database URL from {}", DATABASE_URL_ENV);
            return Ok(Self::from_url(url));
        }

        let path = server_config_path();
        debug!("Reading server configuration from {}", path.display());
        let content = fs::read_to_string(&path).map_err(|e| {
            error!("Failed to read server configuration {}: {}", path.display(), e);
            connect_failure()
        })?;
        Self::from_server_config(&content)
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self { instance: SUPPORTED_INSTANCE.to_string(), url: Some(url.into()), ..Default::default() }
    }

    /// Parse `plugin_configuration.database.<instance>` out of a server config document.
    /// The last instance listed wins.
    pub fn from_server_config(content: &str) -> Result<Self, QueryError> {
        let config: ServerConfig = serde_json::from_str(content).map_err(|e| {
            error!("Invalid server configuration: {}", e);
            connect_failure()
        })?;

        let Some((instance, value)) = config.plugin_configuration.database.into_iter().next_back() else {
            error!("Server configuration lists no database instance");
            return Err(connect_failure());
        };
        if instance.is_empty() {
            error!("Server configuration has an empty database instance name");
            return Err(connect_failure());
        }
        if instance != SUPPORTED_INSTANCE {
            error!("Unsupported database instance [{}]", instance);
            return Err(QueryError::Connection(format!("unsupported database instance [{}]", instance)));
        }

        let entry: DatabaseEntry = serde_json::from_value(value).map_err(|e| {
            error!("Incomplete settings for database instance [{}]: {}", instance, e);
            connect_failure()
        })?;

        Ok(Self {
            host: entry.db_host,
            port: entry.db_port,
            name: entry.db_name,
            username: entry.db_username,
            password: entry.db_password,
            instance,
            url: None,
        })
    }

    #[cfg(feature = "experimental")]
    pub fn connect_options(&self) -> Result<sqlx::postgres::PgConnectOptions, QueryError> {
        use std::str::FromStr;

        match &self.url {
            Some(url) => sqlx::postgres::PgConnectOptions::from_str(url).map_err(|e| {
                error!("Invalid database URL: {}", e);
                connect_failure()
            }),
            None => Ok(sqlx::postgres::PgConnectOptions::new()
                .host(&self.host)
                .port(self.port)
                .database(&self.name)
                .username(&self.username)
                .password(&self.password)),
        }
    }
}

/// `$CATALOG_SERVER_CONFIG`, else `<config dir>/catalog_query/server_config.json`.
pub fn server_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(SERVER_CONFIG_ENV) {
        return PathBuf::from(path);
    }
    match dirs::config_dir() {
        Some(mut dir) => {
            dir.push("catalog_query");
            dir.push(SERVER_CONFIG_FILE);
            dir
        }
        None => PathBuf::from(SERVER_CONFIG_FILE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "plugin_configuration": {
            "database": {
                "postgres": {
                    "db_host": "localhost",
                    "db_port": 5432,
                    "db_name": "ICAT",
                    "db_username": "irods",
                    "db_password": "secret"
                }
            }
        }
    }"#;

    #[test]
    fn test_from_server_config() {
        let cfg = DatabaseConfig::from_server_config(SAMPLE).expect("config");
        assert_eq!(cfg.host, "localhost");
        assert_eq!(cfg.port, 5432);
        assert_eq!(cfg.name, "ICAT");
        assert_eq!(cfg.instance, "postgres");
        assert!(cfg.url.is_none());
    }

    #[test]
    fn test_unsupported_instance() {
        let doc = SAMPLE.replace("\"postgres\"", "\"mysql\"");
        let err = DatabaseConfig::from_server_config(&doc).unwrap_err();
        assert!(matches!(err, QueryError::Connection(_)));
    }

    #[test]
    fn test_last_listed_instance_wins() {
        let doc = r#"{ "plugin_configuration": { "database": {
            "postgres": { "db_host": "a", "db_port": 1, "db_name": "n", "db_username": "u", "db_password": "p" },
            "mysql": { "db_host": "b", "db_port": 2, "db_name": "n", "db_username": "u", "db_password": "p" }
        } } }"#;
        let err = DatabaseConfig::from_server_config(doc).unwrap_err();
        assert_eq!(err, QueryError::Connection("unsupported database instance [mysql]".into()));
    }

    #[test]
    fn test_missing_keys() {
        let doc = SAMPLE.replace("\"db_name\": \"ICAT\",", "");
        let err = DatabaseConfig::from_server_config(&doc).unwrap_err();
        assert_eq!(err, QueryError::Connection("Failed to connect to catalog".into()));
    }

    #[test]
    fn test_bad_json() {
        assert!(DatabaseConfig::from_server_config("{").is_err());
    }
}
