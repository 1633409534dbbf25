//! Database transport
//!
//! The collection layer only needs to execute SQL with bound arguments, read
//! rows back as JSON records and introspect tables. [`Database`] is that
//! surface; [`PgDatabase`] and [`SqliteDatabase`] implement it over sqlx pools.

mod postgres;
mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::sql::dialect::Dialect;
use crate::types::whole_f64_to_i64;

pub use postgres::PgDatabase;
pub use sqlite::SqliteDatabase;

/// One result row, keyed by column name
pub type Record = Map<String, Value>;

/// Outcome of a statement that returns no rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Row id of the last insert, where the engine reports one
    pub last_insert_id: Option<i64>,
}

/// Column metadata as reported by the live database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Native type name, e.g. `integer`, `character varying`, `TEXT`
    pub native_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub is_primary_key: bool,
    pub is_unique: bool,
}

/// Physical table description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

/// Minimal transport consumed by the store and the consistency checker
#[async_trait]
pub trait Database: Send + Sync {
    /// SQL dialect spoken by this connection
    fn dialect(&self) -> Dialect;

    /// Execute a statement that returns no rows
    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult>;

    /// Execute a query and collect every row
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Record>>;

    /// Names of all user tables
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Column metadata for one table
    async fn get_table_info(&self, table: &str) -> Result<TableInfo>;
}

// ============================================================================
// Argument conversion shared by the implementations
// ============================================================================

/// Integer view of a JSON argument (whole floats and numeric strings included)
pub(crate) fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_f64_to_i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

pub(crate) fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Some(true),
            "false" | "f" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
