//! Dialect-aware query builder
//!
//! Translates a table name, columns, conditions, ordering and paging into SQL
//! text plus an ordered argument list. Nothing here performs I/O and nothing
//! interpolates values: every literal goes through [`Bindings`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::sql::condition::{Bindings, Condition, OrderBy, Search, build_where_clause};
use crate::sql::ddl::DdlGenerator;
use crate::sql::dialect::{Dialect, SqlDialect};
use crate::types::{Collection, Column, ColumnType};

/// SQL text plus the arguments to bind, in placeholder order
pub type Statement = (String, Vec<Value>);

/// Aggregate functions supported over a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregate {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
        }
    }

    /// Whether the aggregate needs a numeric field
    pub fn requires_field(&self) -> bool {
        !matches!(self, Aggregate::Count)
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// SQL builder bound to one dialect
///
/// Identifiers and operators are expected to be validated before they get
/// here (see [`crate::sql::sanitize`] and [`Condition::new`]). Built with
/// [`QueryBuilder::with_collection`], decimal columns are compared, sorted
/// and aggregated by value on engines that store them as text.
#[derive(Clone)]
pub struct QueryBuilder {
    dialect: &'static dyn SqlDialect,
    decimal_columns: Vec<String>,
}

impl fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("dialect", &self.dialect.dialect())
            .field("decimal_columns", &self.decimal_columns)
            .finish()
    }
}

impl QueryBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect: dialect.strategy(),
            decimal_columns: Vec::new(),
        }
    }

    /// Use the column types of `collection` when rendering column references
    pub fn with_collection(mut self, collection: &Collection) -> Self {
        self.decimal_columns = collection
            .columns
            .iter()
            .filter(|c| c.column_type == ColumnType::Decimal)
            .map(|c| c.name.clone())
            .collect();
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect.dialect()
    }

    fn quote(&self, identifier: &str) -> String {
        self.dialect.quote_identifier(identifier)
    }

    fn bindings(&self) -> Bindings<'_> {
        Bindings::new(self.dialect).with_decimal_columns(&self.decimal_columns)
    }

    fn ddl(&self) -> DdlGenerator {
        DdlGenerator::new(self.dialect())
    }

    // =========================================================================
    // DDL
    // =========================================================================

    pub fn create_table(&self, table: &str, columns: &[Column]) -> String {
        self.ddl().generate_create_table(table, columns)
    }

    pub fn alter_table_add_column(&self, table: &str, column: &Column) -> String {
        self.ddl().generate_add_column(table, column)
    }

    pub fn drop_table(&self, table: &str) -> String {
        self.ddl().generate_drop_table(table)
    }

    // =========================================================================
    // DML
    // =========================================================================

    /// SELECT with optional WHERE, ORDER BY, LIMIT and OFFSET
    ///
    /// An empty `columns` slice selects `*`. LIMIT is emitted when `limit > 0`
    /// and OFFSET only alongside it when `offset > 0`; both are bound after the
    /// WHERE arguments.
    pub fn select(
        &self,
        table: &str,
        columns: &[&str],
        conditions: &[Condition],
        order_by: &[OrderBy],
        limit: u64,
        offset: u64,
    ) -> Statement {
        self.select_matching(table, columns, conditions, None, order_by, limit, offset)
    }

    /// [`select`](Self::select) with an optional free-text [`Search`] ANDed
    /// after the conditions
    #[allow(clippy::too_many_arguments)]
    pub fn select_matching(
        &self,
        table: &str,
        columns: &[&str],
        conditions: &[Condition],
        search: Option<&Search>,
        order_by: &[OrderBy],
        limit: u64,
        offset: u64,
    ) -> Statement {
        let mut bindings = self.bindings();

        let projection = if columns.is_empty() {
            "*".to_string()
        } else {
            columns
                .iter()
                .map(|c| self.quote(c))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", projection, self.quote(table));
        build_where_clause(&mut sql, conditions, search, &mut bindings);

        if !order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&bindings.order_by(order_by));
        }

        if limit > 0 {
            sql.push_str(" LIMIT ");
            sql.push_str(&bindings.bind(Value::from(limit)));

            if offset > 0 {
                sql.push_str(" OFFSET ");
                sql.push_str(&bindings.bind(Value::from(offset)));
            }
        }

        (sql, bindings.into_args())
    }

    /// INSERT of one row; `columns` and `values` pair up positionally
    ///
    /// With no columns every field takes its default.
    pub fn insert(&self, table: &str, columns: &[&str], values: Vec<Value>) -> Statement {
        debug_assert_eq!(columns.len(), values.len(), "insert column/value count mismatch");

        if columns.is_empty() {
            let sql = match self.dialect() {
                Dialect::MySql => format!("INSERT INTO {} () VALUES ()", self.quote(table)),
                _ => format!("INSERT INTO {} DEFAULT VALUES", self.quote(table)),
            };
            return (sql, Vec::new());
        }

        let mut bindings = Bindings::new(self.dialect);
        let column_list = columns
            .iter()
            .map(|c| self.quote(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = values
            .into_iter()
            .map(|v| bindings.bind(v))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.quote(table),
            column_list,
            placeholders
        );

        (sql, bindings.into_args())
    }

    /// UPDATE setting every field in `updates`, in key order
    pub fn update(
        &self,
        table: &str,
        updates: &Map<String, Value>,
        conditions: &[Condition],
    ) -> Statement {
        let mut bindings = self.bindings();

        let assignments = updates
            .iter()
            .map(|(column, value)| format!("{} = {}", self.quote(column), bindings.bind(value.clone())))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("UPDATE {} SET {}", self.quote(table), assignments);
        build_where_clause(&mut sql, conditions, None, &mut bindings);

        (sql, bindings.into_args())
    }

    pub fn delete(&self, table: &str, conditions: &[Condition]) -> Statement {
        let mut bindings = self.bindings();
        let mut sql = format!("DELETE FROM {}", self.quote(table));
        build_where_clause(&mut sql, conditions, None, &mut bindings);
        (sql, bindings.into_args())
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    /// `SELECT <FUNC>(field) FROM table WHERE ...`
    ///
    /// `COUNT` without a field counts rows (`COUNT(*)`).
    pub fn aggregate(
        &self,
        function: Aggregate,
        table: &str,
        field: Option<&str>,
        conditions: &[Condition],
    ) -> Statement {
        let mut bindings = self.bindings();

        let target = match field {
            Some(field) => bindings.column(field),
            None => "*".to_string(),
        };

        let mut sql = format!(
            "SELECT {}({}) FROM {}",
            function.as_sql(),
            target,
            self.quote(table)
        );
        build_where_clause(&mut sql, conditions, None, &mut bindings);

        (sql, bindings.into_args())
    }

    pub fn count(&self, table: &str, conditions: &[Condition]) -> Statement {
        self.aggregate(Aggregate::Count, table, None, conditions)
    }

    pub fn sum(&self, table: &str, field: &str, conditions: &[Condition]) -> Statement {
        self.aggregate(Aggregate::Sum, table, Some(field), conditions)
    }

    pub fn avg(&self, table: &str, field: &str, conditions: &[Condition]) -> Statement {
        self.aggregate(Aggregate::Avg, table, Some(field), conditions)
    }

    pub fn min(&self, table: &str, field: &str, conditions: &[Condition]) -> Statement {
        self.aggregate(Aggregate::Min, table, Some(field), conditions)
    }

    pub fn max(&self, table: &str, field: &str, conditions: &[Condition]) -> Statement {
        self.aggregate(Aggregate::Max, table, Some(field), conditions)
    }
}
