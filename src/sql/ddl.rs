//! DDL generation for collection tables
//!
//! Generates CREATE / ALTER / DROP statements in the dialect of the strategy
//! the generator was built with.

use crate::sql::dialect::{Dialect, SqlDialect};
use crate::types::Column;

/// DDL generator for collection tables
pub struct DdlGenerator {
    dialect: &'static dyn SqlDialect,
}

impl DdlGenerator {
    /// Create a new DDL generator for the given dialect
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect: dialect.strategy(),
        }
    }

    /// Generate a CREATE TABLE statement
    ///
    /// The implicit auto-increment `id` primary key comes first, followed by
    /// the declared columns in order.
    pub fn generate_create_table(&self, table_name: &str, columns: &[Column]) -> String {
        let mut column_defs = Vec::with_capacity(columns.len() + 1);
        column_defs.push(self.dialect.primary_key_column().to_string());

        for col in columns {
            column_defs.push(self.format_column_definition(col));
        }

        format!(
            "CREATE TABLE {} ({})",
            self.dialect.quote_identifier(table_name),
            column_defs.join(", ")
        )
    }

    /// Generate an ALTER TABLE ... ADD COLUMN statement
    pub fn generate_add_column(&self, table_name: &str, column: &Column) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.dialect.quote_identifier(table_name),
            self.format_column_definition(column)
        )
    }

    /// Generate a DROP TABLE statement
    pub fn generate_drop_table(&self, table_name: &str) -> String {
        format!("DROP TABLE {}", self.dialect.quote_identifier(table_name))
    }

    /// Format a single column definition for CREATE TABLE or ADD COLUMN
    ///
    /// Defaults are written as raw SQL literals: none of the dialects accept
    /// bound parameters in DDL.
    pub fn format_column_definition(&self, col: &Column) -> String {
        let mut parts = vec![
            self.dialect.quote_identifier(&col.name),
            self.dialect.column_type(&col.column_type).to_string(),
        ];

        if !col.nullable {
            parts.push("NOT NULL".to_string());
        }

        if col.unique {
            parts.push("UNIQUE".to_string());
        }

        if let Some(default) = &col.default_value {
            parts.push(format!("DEFAULT {}", default));
        }

        parts.join(" ")
    }
}
