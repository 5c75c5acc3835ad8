//! Configuration handling for the query gateway.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use crate::models::DatabaseDescriptor;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_BASE_PATH: &str = "/sql-gateway";
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = crate::models::DEFAULT_QUERY_TIMEOUT_SECS;

/// Transport mode for the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// JSON over HTTP
    #[default]
    Http,
    /// MCP tools over standard input/output
    Stdio,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Stdio => write!(f, "stdio"),
        }
    }
}

/// Configuration for the query gateway.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "db-query-gateway",
    about = "Query gateway - run SQL and inspect schemas across SQLite, PostgreSQL and MySQL databases",
    version
)]
pub struct Config {
    /// Databases to register.
    /// Format: "[alias=]kind[+driver]://[user[:password]@][host][:port]/database"
    /// Can be specified multiple times for multiple databases.
    #[arg(
        short = 'd',
        long = "database",
        value_name = "URL",
        env = "GATEWAY_DATABASE",
        value_delimiter = ','
    )]
    pub databases: Vec<String>,

    /// JSON file holding an array of database descriptors
    #[arg(long, value_name = "PATH", env = "GATEWAY_DATABASES_FILE")]
    pub databases_file: Option<PathBuf>,

    /// Transport mode (http or stdio)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "http",
        env = "GATEWAY_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(long, default_value = DEFAULT_HTTP_HOST, env = "GATEWAY_HTTP_HOST")]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT, env = "GATEWAY_HTTP_PORT")]
    pub http_port: u16,

    /// Path prefix for the HTTP endpoints
    #[arg(long, default_value = DEFAULT_BASE_PATH, env = "GATEWAY_BASE_PATH")]
    pub base_path: String,

    /// Query timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "GATEWAY_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Directory for the bundled sample database (default: system temp dir)
    #[arg(long, value_name = "DIR", env = "GATEWAY_SAMPLE_DIR")]
    pub sample_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "GATEWAY_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "GATEWAY_JSON_LOGS")]
    pub json_logs: bool,

    /// Enable logging with the stdio transport (always on for http)
    #[arg(long, env = "GATEWAY_ENABLE_LOGS")]
    pub enable_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            databases: Vec::new(),
            databases_file: None,
            transport: TransportMode::Http,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            base_path: DEFAULT_BASE_PATH.to_string(),
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            sample_dir: None,
            log_level: "info".to_string(),
            json_logs: false,
            enable_logs: false,
        }
    }

    /// Collect database descriptors: `--database` entries first, then the
    /// descriptors file.
    pub fn load_descriptors(&self) -> Result<Vec<DatabaseDescriptor>, String> {
        let mut descriptors = self
            .databases
            .iter()
            .map(|s| {
                DatabaseDescriptor::parse(s).map_err(|e| format!("Invalid --database value: {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(path) = &self.databases_file {
            descriptors.extend(read_descriptors_file(path)?);
        }
        Ok(descriptors)
    }

    /// Whether logging should be initialized for this run.
    pub fn logging_enabled(&self) -> bool {
        self.enable_logs || self.transport == TransportMode::Http
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Base path with a leading slash and no trailing slash ("" for root).
    pub fn normalized_base_path(&self) -> String {
        let trimmed = self.base_path.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }

    /// Get the query timeout as a Duration.
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    /// Directory for the sample database.
    pub fn sample_dir(&self) -> PathBuf {
        self.sample_dir
            .clone()
            .unwrap_or_else(crate::sample::default_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

fn read_descriptors_file(path: &Path) -> Result<Vec<DatabaseDescriptor>, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("Invalid descriptors file {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.transport, TransportMode::Http);
        assert_eq!(config.http_host, DEFAULT_HTTP_HOST);
        assert_eq!(config.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(config.base_path, DEFAULT_BASE_PATH);
    }

    #[test]
    fn test_cli_defaults_match_default_config() {
        let config = Config::try_parse_from(["db-query-gateway"]).unwrap();
        assert_eq!(config.transport, TransportMode::Http);
        assert_eq!(config.query_timeout, DEFAULT_QUERY_TIMEOUT_SECS);
        assert!(config.databases.is_empty());
    }

    #[test]
    fn test_cli_repeated_and_comma_separated_databases() {
        let config = Config::try_parse_from([
            "db-query-gateway",
            "-d",
            "a=sqlite:///a.db,b=sqlite:///b.db",
            "--database",
            "postgres://localhost/sales",
        ])
        .unwrap();
        assert_eq!(config.databases.len(), 3);

        let descriptors = config.load_descriptors().unwrap();
        assert_eq!(descriptors[0].alias.as_deref(), Some("a"));
        assert_eq!(descriptors[2].kind, "postgres");
    }

    #[test]
    fn test_invalid_database_argument() {
        let config = Config {
            databases: vec!["nonsense".to_string()],
            ..Config::default()
        };
        let err = config.load_descriptors().unwrap_err();
        assert!(err.contains("Invalid --database value"));
    }

    #[test]
    fn test_descriptors_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"alias": "world", "dbms": "sqlite", "database": "/tmp/world.sqlite", "driver": "rusqlite"}},
                {{"kind": "postgres", "host": "db", "port": 5433, "database": "sales", "username": "app"}}
            ]"#
        )
        .unwrap();

        let config = Config {
            databases: vec!["first=sqlite:///first.db".to_string()],
            databases_file: Some(file.path().to_path_buf()),
            ..Config::default()
        };
        let descriptors = config.load_descriptors().unwrap();
        assert_eq!(descriptors.len(), 3);
        assert_eq!(descriptors[0].alias.as_deref(), Some("first"));
        assert_eq!(descriptors[1].driver.as_deref(), Some("rusqlite"));
        assert_eq!(descriptors[2].port, Some(5433));
        assert_eq!(descriptors[2].alias, None);
    }

    #[test]
    fn test_malformed_descriptors_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"kind": "sqlite"}}"#).unwrap();

        let config = Config {
            databases_file: Some(file.path().to_path_buf()),
            ..Config::default()
        };
        assert!(config.load_descriptors().is_err());
    }

    #[test]
    fn test_normalized_base_path() {
        let with = |base_path: &str| Config {
            base_path: base_path.to_string(),
            ..Config::default()
        };
        assert_eq!(with("/sql-gateway").normalized_base_path(), "/sql-gateway");
        assert_eq!(with("api/v1/").normalized_base_path(), "/api/v1");
        assert_eq!(with("/").normalized_base_path(), "");
    }

    #[test]
    fn test_logging_enabled() {
        assert!(Config::default().logging_enabled());
        let stdio = Config {
            transport: TransportMode::Stdio,
            ..Config::default()
        };
        assert!(!stdio.logging_enabled());
        assert!(
            Config {
                enable_logs: true,
                ..stdio
            }
            .logging_enabled()
        );
    }

    #[test]
    fn test_http_bind_addr() {
        let config = Config {
            http_host: "0.0.0.0".to_string(),
            http_port: 3000,
            ..Config::default()
        };
        assert_eq!(config.http_bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.query_timeout_duration(), Duration::from_secs(30));
    }
}
