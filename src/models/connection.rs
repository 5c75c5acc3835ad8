//! Connection-related data models.
//!
//! This module defines the database descriptor supplied at startup and the
//! engine families the gateway knows how to talk to.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;

/// Supported database engine families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    PostgreSQL,
    /// Includes MariaDB
    MySQL,
    SQLite,
}

impl DatabaseType {
    /// Parse a database type from a descriptor `kind` ("postgres", "mariadb", ...).
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::PostgreSQL),
            "mysql" | "mariadb" => Some(Self::MySQL),
            "sqlite" => Some(Self::SQLite),
            _ => None,
        }
    }

    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Get the default port for this database type.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::PostgreSQL => Some(5432),
            Self::MySQL => Some(3306),
            Self::SQLite => None,
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Caller-supplied description of a database to register.
///
/// Deserialized from descriptor files; the legacy connection-string form is
/// handled by [`DatabaseDescriptor::parse`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseDescriptor {
    /// Display name. Defaults to `"{kind}_{id}"` at registration.
    #[serde(default)]
    pub alias: Option<String>,
    /// Engine family, e.g. "sqlite", "postgres", "mysql".
    #[serde(alias = "dbms")]
    pub kind: String,
    /// Explicit driver name. When absent the known async drivers are tried in order.
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    /// Database name, or file path for SQLite.
    pub database: String,
    #[serde(default)]
    pub username: Option<String>,
    /// Contains sensitive data - never log
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl DatabaseDescriptor {
    /// Create a descriptor with only the required fields set.
    pub fn new(kind: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: Option<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = password;
        self
    }

    /// The explicit driver, ignoring blank values.
    pub fn explicit_driver(&self) -> Option<&str> {
        self.driver
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    /// Parse the legacy connection-string form.
    ///
    /// # Format
    ///
    /// ```text
    /// [alias=]kind[+driver]://[user[:password]@][host][:port]/database
    /// ```
    ///
    /// SQLite follows the three/four slash convention: `sqlite:///data.db` is
    /// relative, `sqlite:////var/lib/data.db` is absolute. The opaque form
    /// `sqlite:data.db` is accepted as well.
    pub fn parse(s: &str) -> Result<Self, DescriptorError> {
        let s = s.trim();

        // Split alias=url format (only if '=' before the scheme separator)
        let scheme_end = s.find(':').unwrap_or(s.len());
        let (alias, url_str) = match s[..scheme_end].find('=') {
            Some(idx) => (Some(s[..idx].trim()), &s[idx + 1..]),
            None => (None, s),
        };

        let url = Url::parse(url_str).map_err(|e| DescriptorError::InvalidUrl(e.to_string()))?;

        let (kind, driver) = match url.scheme().split_once('+') {
            Some((kind, driver)) => (kind, Some(driver)),
            None => (url.scheme(), None),
        };
        if driver == Some("") {
            return Err(DescriptorError::InvalidUrl(format!(
                "empty driver name in scheme '{}'",
                url.scheme()
            )));
        }

        let raw_path = if url.cannot_be_a_base() {
            url.path()
        } else {
            url.path().strip_prefix('/').unwrap_or(url.path())
        };
        let database = decode(raw_path);
        if database.is_empty() {
            return Err(DescriptorError::MissingDatabase(url_str.to_string()));
        }

        Ok(Self {
            alias: alias.filter(|a| !a.is_empty()).map(String::from),
            kind: kind.to_string(),
            driver: driver.map(String::from),
            host: url.host_str().filter(|h| !h.is_empty()).map(String::from),
            port: url.port(),
            database,
            username: Some(decode(url.username())).filter(|u| !u.is_empty()),
            password: url.password().map(decode),
        })
    }

    /// Validate required fields.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.kind.trim().is_empty() {
            return Err(DescriptorError::MissingKind);
        }
        if self.database.trim().is_empty() {
            return Err(DescriptorError::MissingDatabase(self.kind.clone()));
        }
        Ok(())
    }
}

fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Errors that can occur when building a database descriptor.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    #[error("Database kind cannot be empty")]
    MissingKind,

    #[error("Database name or path is required: {0}")]
    MissingDatabase(String),
}
