//! SQL dialect strategies
//!
//! Each supported engine gets one strategy object implementing [`SqlDialect`].
//! The strategy is picked once (usually when a [`QueryBuilder`](crate::sql::QueryBuilder)
//! is constructed) so identifier escaping, placeholder syntax and native type
//! names never branch on the dialect anywhere else.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CollectionError;
use crate::sql::sanitize::{is_reserved_word, is_valid_identifier};
use crate::types::ColumnType;

/// Identity of the database engine behind a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    #[serde(rename = "mysql")]
    MySql,
    Sqlite,
}

impl Dialect {
    /// All supported dialects
    pub const ALL: [Dialect; 3] = [Dialect::Postgres, Dialect::MySql, Dialect::Sqlite];

    /// The strategy object for this dialect
    pub fn strategy(self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Postgres => &PostgresDialect,
            Dialect::MySql => &MySqlDialect,
            Dialect::Sqlite => &SqliteDialect,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = CollectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::MySql),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            other => Err(CollectionError::database(format!(
                "unsupported database dialect: {}",
                other
            ))),
        }
    }
}

/// Dialect-specific pieces of SQL text generation
pub trait SqlDialect: Send + Sync {
    /// Which engine this strategy targets
    fn dialect(&self) -> Dialect;

    /// Escape a table or column name for use in SQL text
    fn quote_identifier(&self, identifier: &str) -> String;

    /// Placeholder for the bound argument at `position` (1-based)
    fn placeholder(&self, position: usize) -> String;

    /// Native type used for a column of the given semantic type
    fn column_type(&self, column_type: &ColumnType) -> &'static str;

    /// Generic text type, used when a type tag is not recognised
    fn text_type(&self) -> &'static str {
        "TEXT"
    }

    /// Column definition of the implicit auto-increment primary key
    fn primary_key_column(&self) -> &'static str;

    /// Trailing clause appended to LIKE predicates, if the engine needs one
    /// to honour backslash escapes
    fn like_escape_clause(&self) -> &'static str {
        ""
    }

    /// Expression that compares and aggregates a decimal column by value
    ///
    /// `column` is already quoted. Engines with a native fixed-point type
    /// use the column as is.
    fn decimal_expression(&self, column: &str) -> String {
        column.to_string()
    }
}

/// PostgreSQL: double-quoted identifiers, `$n` placeholders
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    fn placeholder(&self, position: usize) -> String {
        format!("${}", position)
    }

    fn column_type(&self, column_type: &ColumnType) -> &'static str {
        match column_type {
            ColumnType::String => "VARCHAR(255)",
            ColumnType::Integer => "INTEGER",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Datetime => "TIMESTAMP",
            ColumnType::Decimal => "NUMERIC(19,2)",
            ColumnType::Json => "JSONB",
        }
    }

    fn primary_key_column(&self) -> &'static str {
        "id SERIAL PRIMARY KEY"
    }
}

/// MySQL: backtick identifiers, `?` placeholders
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        format!("`{}`", identifier.replace('`', "``"))
    }

    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    fn column_type(&self, column_type: &ColumnType) -> &'static str {
        match column_type {
            ColumnType::String => "VARCHAR(255)",
            ColumnType::Integer => "INT",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Datetime => "DATETIME",
            ColumnType::Decimal => "DECIMAL(19,2)",
            ColumnType::Json => "JSON",
        }
    }

    fn primary_key_column(&self) -> &'static str {
        "id INT AUTO_INCREMENT PRIMARY KEY"
    }
}

/// SQLite: bare identifiers where the grammar allows, `?` placeholders
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        if is_valid_identifier(identifier) && !is_reserved_word(identifier) {
            identifier.to_string()
        } else {
            format!("\"{}\"", identifier.replace('"', "\"\""))
        }
    }

    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    fn column_type(&self, column_type: &ColumnType) -> &'static str {
        match column_type {
            ColumnType::String => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Boolean => "INTEGER",
            ColumnType::Datetime => "TEXT",
            ColumnType::Decimal => "TEXT",
            ColumnType::Json => "TEXT",
        }
    }

    fn primary_key_column(&self) -> &'static str {
        "id INTEGER PRIMARY KEY AUTOINCREMENT"
    }

    fn like_escape_clause(&self) -> &'static str {
        " ESCAPE '\\'"
    }

    // Decimals are stored as text to keep their exact digits
    fn decimal_expression(&self, column: &str) -> String {
        format!("CAST({} AS REAL)", column)
    }
}
