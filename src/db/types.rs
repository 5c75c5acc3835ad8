//! Result-row normalization.
//!
//! Every engine hands back rows in its own representation. This module turns
//! them into `serde_json` maps keyed by column name, in the order the engine
//! reported the columns.
//!
//! Conversion is two-phase: `TypeCategory` classifies the column type name,
//! then a backend-specific decoder pulls the value out.

use crate::models::{DatabaseType, Row};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row as _, Type, TypeInfo, ValueRef};

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Temporal,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_ascii_lowercase();

    // Checked before floats: "numeric" would otherwise be ambiguous
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite stores NUMERIC affinity as integer or real
        if db == DatabaseType::SQLite {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    // "interval" and "point" contain "int"
    if lower == "interval" || lower == "point" {
        return TypeCategory::Text;
    }

    match lower.as_str() {
        "bool" | "boolean" => return TypeCategory::Boolean,
        "json" | "jsonb" => return TypeCategory::Json,
        "uuid" => return TypeCategory::Uuid,
        "real" | "float4" | "float8" | "double precision" => return TypeCategory::Float,
        "bytea" => return TypeCategory::Binary,
        _ => {}
    }

    if lower.contains("int") || lower.contains("serial") {
        TypeCategory::Integer
    } else if lower.contains("float") || lower.contains("double") {
        TypeCategory::Float
    } else if lower.contains("blob") || lower.contains("binary") {
        TypeCategory::Binary
    } else if lower.contains("timestamp")
        || lower.contains("date")
        || lower.starts_with("time")
        || lower == "year"
    {
        TypeCategory::Temporal
    } else {
        TypeCategory::Text
    }
}

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// Keeps the exact database representation instead of rounding through f64.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_ascii_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("NUMERIC")
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        ty.name().eq_ignore_ascii_case("numeric")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        // Unprepared queries use the text protocol; binary NUMERIC needs a
        // decimal crate, so fall back to the text form only.
        let s = <&str as Decode<sqlx::Postgres>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

/// Decode binary data to a JSON value.
///
/// Valid UTF-8 comes back as text; anything else is base64-encoded.
pub fn decode_binary_value(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s.to_string()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

/// Non-finite floats have no JSON number form.
pub fn float_to_json(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

/// Convert a SQLite value borrowed from a `rusqlite` row.
///
/// `decl_type` is the column's declared type, if any. It is read the same way
/// the sqlx decoder reads it, so both engines produce identical rows.
pub fn sqlite_value_to_json(
    value: rusqlite::types::ValueRef<'_>,
    decl_type: Option<&str>,
) -> JsonValue {
    use rusqlite::types::ValueRef as Sqlite;

    let category = decl_type.map(|t| categorize_type(t, DatabaseType::SQLite));
    match value {
        Sqlite::Integer(v) if category == Some(TypeCategory::Boolean) => JsonValue::Bool(v != 0),
        Sqlite::Null => JsonValue::Null,
        Sqlite::Integer(v) => JsonValue::Number(v.into()),
        Sqlite::Real(v) => float_to_json(v),
        Sqlite::Text(bytes) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
        Sqlite::Blob(bytes) => decode_binary_value(bytes),
    }
}

/// Trait for converting sqlx rows to JSON maps.
pub trait RowToJson {
    fn to_json_map(&self) -> Row;
}

macro_rules! impl_row_to_json {
    ($row:ty, $db:expr, $decoder:path) => {
        impl RowToJson for $row {
            fn to_json_map(&self) -> Row {
                self.columns()
                    .iter()
                    .enumerate()
                    .map(|(idx, col)| {
                        let value = if is_null(self, idx) {
                            JsonValue::Null
                        } else {
                            let category = categorize_type(col.type_info().name(), $db);
                            $decoder(self, idx, category)
                        };
                        (col.name().to_string(), value)
                    })
                    .collect()
            }
        }
    };
}

impl_row_to_json!(MySqlRow, DatabaseType::MySQL, mysql::decode_column);
impl_row_to_json!(PgRow, DatabaseType::PostgreSQL, postgres::decode_column);
impl_row_to_json!(SqliteRow, DatabaseType::SQLite, sqlite::decode_column);

fn is_null<R: sqlx::Row>(row: &R, idx: usize) -> bool
where
    usize: sqlx::ColumnIndex<R>,
{
    row.try_get_raw(idx).map(|v| v.is_null()).unwrap_or(true)
}

/// First successful decode among the listed Rust types, as JSON.
macro_rules! first_decoded {
    ($row:expr, $idx:expr; $($ty:ty => $conv:expr),+ $(,)?) => {{
        let mut out = None;
        $(
            if out.is_none() {
                if let Ok(v) = $row.try_get::<$ty, _>($idx) {
                    out = Some($conv(v));
                }
            }
        )+
        out
    }};
}

fn int<T: Into<serde_json::Number>>(v: T) -> JsonValue {
    JsonValue::Number(v.into())
}

fn text<T: ToString>(v: T) -> JsonValue {
    JsonValue::String(v.to_string())
}

mod mysql {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> JsonValue {
        let value = match category {
            TypeCategory::Decimal => first_decoded!(row, idx; RawDecimal => |v: RawDecimal| JsonValue::String(v.0)),
            TypeCategory::Integer => first_decoded!(row, idx;
                i64 => int, u64 => int, i32 => int, u32 => int,
                i16 => int, u16 => int, i8 => int, u8 => int,
            ),
            TypeCategory::Boolean => first_decoded!(row, idx; bool => JsonValue::Bool),
            TypeCategory::Float => first_decoded!(row, idx; f64 => float_to_json, f32 => |v: f32| float_to_json(v as f64)),
            TypeCategory::Binary => first_decoded!(row, idx; Vec<u8> => |v: Vec<u8>| decode_binary_value(&v)),
            TypeCategory::Json => first_decoded!(row, idx; JsonValue => |v| v),
            TypeCategory::Temporal => first_decoded!(row, idx;
                NaiveDateTime => text, DateTime<Utc> => text,
                NaiveDate => text, NaiveTime => text, String => text,
            ),
            TypeCategory::Text | TypeCategory::Uuid => None,
        };
        value.unwrap_or_else(|| fallback(row, idx))
    }

    fn fallback(row: &MySqlRow, idx: usize) -> JsonValue {
        first_decoded!(row, idx; String => JsonValue::String, Vec<u8> => |v: Vec<u8>| decode_binary_value(&v))
            .unwrap_or(JsonValue::Null)
    }
}

mod postgres {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

    pub fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> JsonValue {
        let value = match category {
            TypeCategory::Decimal => first_decoded!(row, idx; RawDecimal => |v: RawDecimal| JsonValue::String(v.0)),
            TypeCategory::Integer => first_decoded!(row, idx; i64 => int, i32 => int, i16 => int, i8 => int),
            TypeCategory::Boolean => first_decoded!(row, idx; bool => JsonValue::Bool),
            TypeCategory::Float => first_decoded!(row, idx; f64 => float_to_json, f32 => |v: f32| float_to_json(v as f64)),
            TypeCategory::Binary => first_decoded!(row, idx; Vec<u8> => |v: Vec<u8>| decode_binary_value(&v)),
            TypeCategory::Json => first_decoded!(row, idx; JsonValue => |v| v),
            TypeCategory::Uuid => first_decoded!(row, idx; uuid::Uuid => text),
            TypeCategory::Temporal => first_decoded!(row, idx;
                DateTime<Utc> => |v: DateTime<Utc>| JsonValue::String(v.to_rfc3339()),
                NaiveDateTime => text, NaiveDate => text, NaiveTime => text,
            ),
            TypeCategory::Text => None,
        };
        value.unwrap_or_else(|| fallback(row, idx))
    }

    /// Text the server rendered for types sqlx has no mapping for
    /// (INTERVAL, TIMETZ, INET, MONEY, arrays, enums, ...). Queries go
    /// through the simple protocol, so every value arrives in text format.
    fn fallback(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get_unchecked::<String, _>(idx)
            .map(JsonValue::String)
            .unwrap_or(JsonValue::Null)
    }
}

mod sqlite {
    use super::*;

    pub fn decode_column(row: &SqliteRow, idx: usize, category: TypeCategory) -> JsonValue {
        let value = match category {
            TypeCategory::Integer => first_decoded!(row, idx; i64 => int),
            TypeCategory::Boolean => first_decoded!(row, idx; bool => JsonValue::Bool),
            TypeCategory::Float | TypeCategory::Decimal => first_decoded!(row, idx; f64 => float_to_json),
            TypeCategory::Binary => first_decoded!(row, idx; Vec<u8> => |v: Vec<u8>| decode_binary_value(&v)),
            // sqlx has no JSON type for SQLite; JSON text stays text
            _ => None,
        };
        value.unwrap_or_else(|| fallback(row, idx))
    }

    /// Columns are dynamically typed; the declared type is only a hint.
    fn fallback(row: &SqliteRow, idx: usize) -> JsonValue {
        first_decoded!(row, idx;
            String => JsonValue::String,
            i64 => int,
            f64 => float_to_json,
            Vec<u8> => |v: Vec<u8>| decode_binary_value(&v),
        )
        .unwrap_or(JsonValue::Null)
    }
}
