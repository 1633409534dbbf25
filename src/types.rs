//! Core type definitions for collections
//!
//! Includes the closed set of column types, column definitions and collections.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CollectionError, Result};
use crate::sql::dialect::Dialect;

/// Name of the implicit auto-increment primary key every collection table carries
pub const PRIMARY_KEY_COLUMN: &str = "id";

/// Integer value of a whole float inside the signed 64-bit range
///
/// The upper bound is exclusive: `i64::MAX as f64` rounds up to 2^63.
pub(crate) fn whole_f64_to_i64(f: f64) -> Option<i64> {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    (f.fract() == 0.0 && (-TWO_POW_63..TWO_POW_63).contains(&f)).then_some(f as i64)
}

// ============================================================================
// Column types
// ============================================================================

/// Semantic type of a collection column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Short text
    String,

    /// Whole number
    Integer,

    /// True/false
    Boolean,

    /// Date or timestamp, exchanged as a string
    Datetime,

    /// Exact fixed-point number, exchanged as a string (e.g. "19.99")
    Decimal,

    /// Arbitrary JSON document
    Json,
}

impl ColumnType {
    /// All column types, in declaration order
    pub const ALL: [ColumnType; 6] = [
        ColumnType::String,
        ColumnType::Integer,
        ColumnType::Boolean,
        ColumnType::Datetime,
        ColumnType::Decimal,
        ColumnType::Json,
    ];

    /// Parse a declared type tag
    ///
    /// Accepts the lowercase tags (`string`, `integer`, `boolean`, `datetime`,
    /// `decimal`, `json`). The retired `text` and `float` tags are rejected with
    /// a hint at their replacement.
    pub fn parse(tag: &str) -> Result<Self> {
        match tag {
            "string" => Ok(ColumnType::String),
            "integer" => Ok(ColumnType::Integer),
            "boolean" => Ok(ColumnType::Boolean),
            "datetime" => Ok(ColumnType::Datetime),
            "decimal" => Ok(ColumnType::Decimal),
            "json" => Ok(ColumnType::Json),
            _ => match tag.to_ascii_lowercase().as_str() {
                "text" => Err(CollectionError::InvalidColumnType(
                    "type 'text' is no longer supported, use 'string' instead".to_string(),
                )),
                "float" => Err(CollectionError::InvalidColumnType(
                    "type 'float' is no longer supported, use 'decimal' or 'integer' instead"
                        .to_string(),
                )),
                _ => Err(CollectionError::InvalidColumnType(format!(
                    "invalid column type '{}', supported types: string, integer, decimal, boolean, datetime, json",
                    tag
                ))),
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Integer => "integer",
            ColumnType::Boolean => "boolean",
            ColumnType::Datetime => "datetime",
            ColumnType::Decimal => "decimal",
            ColumnType::Json => "json",
        }
    }

    /// Whether SUM/AVG/MIN/MAX make sense for this type
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Decimal)
    }

    /// Native SQL type for this column type in the given dialect
    pub fn to_sql_type(&self, dialect: Dialect) -> &'static str {
        dialect.strategy().column_type(self)
    }

    /// Classify a native database type name
    ///
    /// Used to rebuild a collection from an existing table, so it never fails.
    /// Floating and fixed-point native types deliberately come back as
    /// `Integer`: there is no separate float tag, and this keeps inferred
    /// collections inside the declared type set.
    pub fn infer_from_native(native_type: &str) -> ColumnType {
        let lower = native_type.to_lowercase();
        let has = |tokens: &[&str]| tokens.iter().any(|t| lower.contains(t));

        if has(&["int", "serial"]) {
            ColumnType::Integer
        } else if has(&["float", "double", "real", "decimal", "numeric"]) {
            ColumnType::Integer
        } else if has(&["bool"]) {
            ColumnType::Boolean
        } else if has(&["date", "time"]) {
            ColumnType::Datetime
        } else if has(&["json"]) {
            ColumnType::Json
        } else {
            ColumnType::String
        }
    }

    /// Check that a declared default is a SQL literal of this type
    ///
    /// Defaults are emitted verbatim into DDL, so only plain literals pass:
    /// numbers for numeric types, `TRUE`/`FALSE`/`0`/`1` for booleans, and
    /// single-quoted strings (quotes doubled) for the rest.
    pub fn validate_default(&self, default: &str) -> std::result::Result<(), String> {
        static INTEGER: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"^-?\d+$").expect("integer literal pattern"));
        static DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^(-?\d+(\.\d+)?|'-?\d+(\.\d+)?')$").expect("decimal literal pattern")
        });
        static QUOTED: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"^'([^']|'')*'$").expect("quoted literal pattern"));

        let ok = match self {
            ColumnType::Integer => INTEGER.is_match(default),
            ColumnType::Decimal => DECIMAL.is_match(default),
            ColumnType::Boolean => matches!(
                default.to_ascii_uppercase().as_str(),
                "TRUE" | "FALSE" | "0" | "1"
            ),
            ColumnType::Datetime => {
                QUOTED.is_match(default) || default.eq_ignore_ascii_case("CURRENT_TIMESTAMP")
            }
            ColumnType::String | ColumnType::Json => QUOTED.is_match(default),
        };

        if ok {
            Ok(())
        } else {
            Err(format!(
                "default {} is not a valid {} literal",
                default,
                self.as_str()
            ))
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Native SQL type for a textual type tag, falling back to the dialect's text
/// type for tags outside the known set
pub fn sql_type_for_tag(tag: &str, dialect: Dialect) -> &'static str {
    let strategy = dialect.strategy();
    match ColumnType::parse(tag) {
        Ok(column_type) => strategy.column_type(&column_type),
        Err(_) => strategy.text_type(),
    }
}

// ============================================================================
// Columns and collections
// ============================================================================

fn default_nullable() -> bool {
    true
}

/// One declared field of a collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    /// Column name (valid identifier)
    pub name: String,

    /// Semantic type
    #[serde(rename = "type")]
    pub column_type: ColumnType,

    /// Whether the column allows NULL values (default: true)
    #[serde(default = "default_nullable")]
    pub nullable: bool,

    /// Whether the column has a UNIQUE constraint (default: false)
    #[serde(default)]
    pub unique: bool,

    /// Default value as a SQL literal (e.g. "0", "'active'")
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "default")]
    pub default_value: Option<String>,
}

impl Column {
    /// Create a nullable, non-unique column with no default
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            unique: false,
            default_value: None,
        }
    }

    /// Set the column as non-nullable
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Set the column as unique
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set a default value
    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// A non-nullable column without a default must be supplied on create
    pub fn is_required(&self) -> bool {
        !self.nullable && self.default_value.is_none()
    }
}

/// A declared table: name plus ordered columns
///
/// The implicit `id` primary key is never part of `columns`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Collection {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Collection {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Look up a declared column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Names of the declared columns, in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // =========================================================================
    // ColumnType SQL Mapping Tests
    // =========================================================================

    #[rstest]
    #[case(ColumnType::String, "VARCHAR(255)", "VARCHAR(255)", "TEXT")]
    #[case(ColumnType::Integer, "INTEGER", "INT", "INTEGER")]
    #[case(ColumnType::Boolean, "BOOLEAN", "BOOLEAN", "INTEGER")]
    #[case(ColumnType::Datetime, "TIMESTAMP", "DATETIME", "TEXT")]
    #[case(ColumnType::Decimal, "NUMERIC(19,2)", "DECIMAL(19,2)", "TEXT")]
    #[case(ColumnType::Json, "JSONB", "JSON", "TEXT")]
    fn test_to_sql_type(
        #[case] t: ColumnType,
        #[case] pg: &str,
        #[case] mysql: &str,
        #[case] sqlite: &str,
    ) {
        assert_eq!(t.to_sql_type(Dialect::Postgres), pg);
        assert_eq!(t.to_sql_type(Dialect::MySql), mysql);
        assert_eq!(t.to_sql_type(Dialect::Sqlite), sqlite);
    }

    #[test]
    fn test_to_sql_type_is_total() {
        for dialect in Dialect::ALL {
            for t in ColumnType::ALL {
                assert!(!t.to_sql_type(dialect).is_empty());
            }
        }
    }

    #[test]
    fn test_sql_type_for_unknown_tag_falls_back_to_text() {
        for dialect in Dialect::ALL {
            assert_eq!(sql_type_for_tag("geometry", dialect), "TEXT");
        }
        assert_eq!(sql_type_for_tag("json", Dialect::Postgres), "JSONB");
    }

    // =========================================================================
    // Native Type Inference Tests
    // =========================================================================

    #[rstest]
    #[case("integer", ColumnType::Integer)]
    #[case("BIGINT", ColumnType::Integer)]
    #[case("serial", ColumnType::Integer)]
    #[case("double precision", ColumnType::Integer)]
    #[case("REAL", ColumnType::Integer)]
    #[case("numeric", ColumnType::Integer)]
    #[case("DECIMAL(19,2)", ColumnType::Integer)]
    #[case("boolean", ColumnType::Boolean)]
    #[case("timestamp without time zone", ColumnType::Datetime)]
    #[case("DATETIME", ColumnType::Datetime)]
    #[case("date", ColumnType::Datetime)]
    #[case("jsonb", ColumnType::Json)]
    #[case("character varying", ColumnType::String)]
    #[case("TEXT", ColumnType::String)]
    #[case("", ColumnType::String)]
    fn test_infer_from_native(#[case] native: &str, #[case] expected: ColumnType) {
        assert_eq!(ColumnType::infer_from_native(native), expected);
    }

    #[test]
    fn test_infer_is_not_identity_for_lossy_types() {
        // SQLite stores booleans as INTEGER, decimals as NUMERIC on Postgres
        assert_eq!(
            ColumnType::infer_from_native(ColumnType::Boolean.to_sql_type(Dialect::Sqlite)),
            ColumnType::Integer
        );
        assert_eq!(
            ColumnType::infer_from_native(ColumnType::Decimal.to_sql_type(Dialect::Postgres)),
            ColumnType::Integer
        );
    }

    // =========================================================================
    // Type Tag Parsing Tests
    // =========================================================================

    #[test]
    fn test_parse_known_tags() {
        for t in ColumnType::ALL {
            assert_eq!(ColumnType::parse(t.as_str()).unwrap(), t);
        }
    }

    #[test]
    fn test_parse_rejects_retired_tags() {
        let err = ColumnType::parse("text").unwrap_err().to_string();
        assert!(err.contains("use 'string'"));
        let err = ColumnType::parse("FLOAT").unwrap_err().to_string();
        assert!(err.contains("'decimal' or 'integer'"));
    }

    #[test]
    fn test_parse_rejects_unknown_tag() {
        assert!(matches!(
            ColumnType::parse("uuid"),
            Err(CollectionError::InvalidColumnType(_))
        ));
    }

    #[test]
    fn test_column_type_serialization() {
        assert_eq!(serde_json::to_string(&ColumnType::Json).unwrap(), "\"json\"");
        let t: ColumnType = serde_json::from_str("\"datetime\"").unwrap();
        assert_eq!(t, ColumnType::Datetime);
    }

    // =========================================================================
    // Default Literal Tests
    // =========================================================================

    #[test]
    fn test_validate_default_accepts_literals() {
        assert!(ColumnType::Integer.validate_default("0").is_ok());
        assert!(ColumnType::Integer.validate_default("-12").is_ok());
        assert!(ColumnType::Decimal.validate_default("'0.00'").is_ok());
        assert!(ColumnType::Decimal.validate_default("10.5").is_ok());
        assert!(ColumnType::Boolean.validate_default("true").is_ok());
        assert!(ColumnType::Boolean.validate_default("0").is_ok());
        assert!(ColumnType::String.validate_default("'it''s'").is_ok());
        assert!(ColumnType::Json.validate_default("'{}'").is_ok());
        assert!(ColumnType::Datetime.validate_default("CURRENT_TIMESTAMP").is_ok());
    }

    #[test]
    fn test_validate_default_rejects_expressions() {
        assert!(ColumnType::Integer.validate_default("1; DROP TABLE x").is_err());
        assert!(ColumnType::String.validate_default("active").is_err());
        assert!(ColumnType::String.validate_default("'a' || 'b'").is_err());
        assert!(ColumnType::Boolean.validate_default("yes").is_err());
        assert!(ColumnType::Decimal.validate_default("1e5").is_err());
    }

    // =========================================================================
    // Column / Collection Tests
    // =========================================================================

    #[test]
    fn test_column_builder() {
        let col = Column::new("sku", ColumnType::String)
            .not_null()
            .unique()
            .default("'n/a'");
        assert_eq!(col.name, "sku");
        assert!(!col.nullable);
        assert!(col.unique);
        assert_eq!(col.default_value.as_deref(), Some("'n/a'"));
        assert!(!col.is_required());
        assert!(Column::new("title", ColumnType::String).not_null().is_required());
    }

    #[test]
    fn test_column_deserialization_defaults() {
        let col: Column = serde_json::from_str(r#"{"name":"title","type":"string"}"#).unwrap();
        assert!(col.nullable);
        assert!(!col.unique);
        assert!(col.default_value.is_none());
    }

    #[test]
    fn test_column_serialization_uses_type_key() {
        let json = serde_json::to_string(&Column::new("price", ColumnType::Integer)).unwrap();
        assert!(json.contains("\"type\":\"integer\""));
        assert!(!json.contains("default"));
    }

    #[test]
    fn test_collection_lookup() {
        let c = Collection::new(
            "products",
            vec![
                Column::new("title", ColumnType::String),
                Column::new("price", ColumnType::Integer),
            ],
        );
        assert!(c.has_column("price"));
        assert!(!c.has_column("id"));
        assert_eq!(c.column_names(), vec!["title", "price"]);
    }
}
