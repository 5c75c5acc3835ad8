//! Schema introspection data models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What to list for a registered database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SchemaTarget {
    /// Table names, ordered by name
    #[default]
    Tables,
    /// Column names of one table, sorted
    Columns,
}

impl SchemaTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tables => "tables",
            Self::Columns => "columns",
        }
    }
}

impl std::fmt::Display for SchemaTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tables" => Ok(Self::Tables),
            "columns" => Ok(Self::Columns),
            other => Err(format!(
                "Invalid schema target '{other}'. Expected 'tables' or 'columns'"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SchemaRequest {
    /// Registered database id (see list_databases)
    pub id: usize,
    /// "tables" (default) or "columns"
    #[serde(default)]
    pub target: SchemaTarget,
    /// Table name, required when target is "columns"
    #[serde(default)]
    pub table: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SchemaResponse {
    pub id: usize,
    pub table: Option<String>,
    pub target: SchemaTarget,
    pub data: Vec<String>,
}
