//! WHERE and ORDER BY clause building
//!
//! Conditions carry an [`Operator`] from a fixed allow-list, so operator text
//! can never be injected. Values are always bound through [`Bindings`], which
//! owns the argument list and the running placeholder counter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CollectionError, Result};
use crate::sql::dialect::SqlDialect;
use crate::sql::sanitize::validate_identifier;

// ============================================================================
// Operators
// ============================================================================

/// Comparison operators accepted in WHERE predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "IN")]
    In,
}

impl Operator {
    pub const ALL: [Operator; 8] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Lt,
        Operator::Gte,
        Operator::Lte,
        Operator::Like,
        Operator::In,
    ];

    /// SQL text of the operator
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::In => "IN",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Operator {
    type Err = CollectionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "=" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            ">=" => Ok(Operator::Gte),
            "<=" => Ok(Operator::Lte),
            _ if s.eq_ignore_ascii_case("LIKE") => Ok(Operator::Like),
            _ if s.eq_ignore_ascii_case("IN") => Ok(Operator::In),
            _ => Err(CollectionError::InvalidOperator(s.to_string())),
        }
    }
}

/// Check an operator string against the allow-list
pub fn validate_operator(op: &str) -> Result<Operator> {
    op.parse()
}

// ============================================================================
// Conditions and ordering
// ============================================================================

/// One WHERE predicate: `column operator value`
///
/// For [`Operator::In`] the value should be a JSON array; any other value is
/// treated as a one-element list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    /// Build a condition from untrusted parts
    ///
    /// Rejects operators outside the allow-list and malformed column names
    /// before any SQL can be produced.
    pub fn new(column: impl Into<String>, operator: &str, value: Value) -> Result<Self> {
        let operator = validate_operator(operator)?;
        let column = column.into();
        validate_identifier(&column)?;
        Ok(Self {
            column,
            operator,
            value,
        })
    }

    fn with(column: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with(column, Operator::Eq, value.into())
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with(column, Operator::Ne, value.into())
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with(column, Operator::Gt, value.into())
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with(column, Operator::Lt, value.into())
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with(column, Operator::Gte, value.into())
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with(column, Operator::Lte, value.into())
    }

    pub fn like(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with(column, Operator::Like, value.into())
    }

    pub fn is_in(column: impl Into<String>, values: Vec<Value>) -> Self {
        Self::with(column, Operator::In, Value::Array(values))
    }
}

/// Sort direction for ORDER BY
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One ORDER BY key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }
}

// ============================================================================
// Binding
// ============================================================================

/// Substring match of one term over several columns
///
/// Renders as `(a LIKE ? OR b LIKE ?)` with the term escaped and wrapped in
/// `%`. A search over no columns adds no predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Search {
    pub term: String,
    pub columns: Vec<String>,
}

impl Search {
    pub fn new(term: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            term: term.into(),
            columns,
        }
    }

    fn pattern(&self) -> Value {
        match escape_like_value(&Value::String(self.term.clone())) {
            Value::String(escaped) => Value::String(format!("%{}%", escaped)),
            other => other,
        }
    }
}

/// Accumulates bound arguments and hands out the matching placeholders
pub(crate) struct Bindings<'d> {
    dialect: &'d dyn SqlDialect,
    decimal_columns: &'d [String],
    args: Vec<Value>,
}

impl<'d> Bindings<'d> {
    pub(crate) fn new(dialect: &'d dyn SqlDialect) -> Self {
        Self {
            dialect,
            decimal_columns: &[],
            args: Vec::new(),
        }
    }

    /// Columns compared and sorted by numeric value rather than stored text
    pub(crate) fn with_decimal_columns(mut self, columns: &'d [String]) -> Self {
        self.decimal_columns = columns;
        self
    }

    /// Quoted column reference for comparisons, sorting and aggregates
    pub(crate) fn column(&self, name: &str) -> String {
        let quoted = self.dialect.quote_identifier(name);
        if self.decimal_columns.iter().any(|c| c == name) {
            self.dialect.decimal_expression(&quoted)
        } else {
            quoted
        }
    }

    /// ORDER BY list (without the keyword)
    pub(crate) fn order_by(&self, order_by: &[OrderBy]) -> String {
        order_by
            .iter()
            .map(|o| format!("{} {}", self.column(&o.column), o.direction.as_sql()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Record `value` as the next argument and return its placeholder
    pub(crate) fn bind(&mut self, value: Value) -> String {
        self.args.push(value);
        self.dialect.placeholder(self.args.len())
    }

    pub(crate) fn into_args(self) -> Vec<Value> {
        self.args
    }
}

/// Escape LIKE wildcards so the value matches literally
///
/// Backslash goes first so the escapes added for `%` and `_` are not doubled.
/// Non-string values pass through unchanged.
pub fn escape_like_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(
            s.replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_"),
        ),
        other => other.clone(),
    }
}

/// Append ` WHERE ...` for `conditions` and `search` (nothing when both are empty)
pub(crate) fn build_where_clause(
    sql: &mut String,
    conditions: &[Condition],
    search: Option<&Search>,
    bindings: &mut Bindings<'_>,
) {
    let dialect = bindings.dialect;
    let mut predicates: Vec<String> = conditions
        .iter()
        .map(|cond| {
            match cond.operator {
                Operator::In => {
                    let values = match &cond.value {
                        Value::Array(values) => values.clone(),
                        single => vec![single.clone()],
                    };
                    if values.is_empty() {
                        return "1 = 0".to_string();
                    }
                    let column = bindings.column(&cond.column);
                    let placeholders: Vec<String> =
                        values.into_iter().map(|v| bindings.bind(v)).collect();
                    format!("{} IN ({})", column, placeholders.join(", "))
                }
                Operator::Like => {
                    let placeholder = bindings.bind(escape_like_value(&cond.value));
                    format!(
                        "{} LIKE {}{}",
                        dialect.quote_identifier(&cond.column),
                        placeholder,
                        dialect.like_escape_clause()
                    )
                }
                op => {
                    let column = bindings.column(&cond.column);
                    let placeholder = bindings.bind(cond.value.clone());
                    format!("{} {} {}", column, op.as_sql(), placeholder)
                }
            }
        })
        .collect();

    if let Some(search) = search.filter(|s| !s.columns.is_empty()) {
        let alternatives: Vec<String> = search
            .columns
            .iter()
            .map(|column| {
                let placeholder = bindings.bind(search.pattern());
                format!(
                    "{} LIKE {}{}",
                    dialect.quote_identifier(column),
                    placeholder,
                    dialect.like_escape_clause()
                )
            })
            .collect();
        predicates.push(format!("({})", alternatives.join(" OR ")));
    }

    if predicates.is_empty() {
        return;
    }

    sql.push_str(" WHERE ");
    sql.push_str(&predicates.join(" AND "));
}

/// Build the ORDER BY list (without the keyword) with escaped identifiers
pub fn build_order_by_clause(dialect: &dyn SqlDialect, order_by: &[OrderBy]) -> String {
    Bindings::new(dialect).order_by(order_by)
}
