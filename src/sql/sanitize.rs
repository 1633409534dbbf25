//! SQL identifier validation
//!
//! Every table and column name that reaches SQL text goes through one of the
//! checks in this module first. Quoting itself is dialect-specific and lives in
//! [`crate::sql::dialect`].

use crate::error::{CollectionError, Result};
use crate::types::PRIMARY_KEY_COLUMN;

/// Maximum identifier length accepted for tables and columns
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Keywords reserved in at least one supported dialect
pub const RESERVED_WORDS: &[&str] = &[
    "ALL",
    "ALTER",
    "ANALYSE",
    "ANALYZE",
    "AND",
    "ANY",
    "ARRAY",
    "AS",
    "ASC",
    "ASYMMETRIC",
    "BETWEEN",
    "BOTH",
    "BY",
    "CASE",
    "CAST",
    "CHECK",
    "COLLATE",
    "COLUMN",
    "CONSTRAINT",
    "CREATE",
    "CROSS",
    "CURRENT_CATALOG",
    "CURRENT_DATE",
    "CURRENT_ROLE",
    "CURRENT_TIME",
    "CURRENT_TIMESTAMP",
    "CURRENT_USER",
    "DATABASE",
    "DEFAULT",
    "DEFERRABLE",
    "DELETE",
    "DESC",
    "DISTINCT",
    "DO",
    "DROP",
    "ELSE",
    "END",
    "EXCEPT",
    "EXISTS",
    "FALSE",
    "FETCH",
    "FOR",
    "FOREIGN",
    "FROM",
    "GRANT",
    "GROUP",
    "HAVING",
    "IN",
    "INDEX",
    "INITIALLY",
    "INNER",
    "INSERT",
    "INTERSECT",
    "INTO",
    "IS",
    "JOIN",
    "KEY",
    "LATERAL",
    "LEADING",
    "LEFT",
    "LIKE",
    "LIMIT",
    "LOCALTIME",
    "LOCALTIMESTAMP",
    "NOT",
    "NULL",
    "OFFSET",
    "ON",
    "ONLY",
    "OR",
    "ORDER",
    "OUTER",
    "PLACING",
    "PRIMARY",
    "REFERENCES",
    "REPLACE",
    "RETURNING",
    "RIGHT",
    "SELECT",
    "SESSION_USER",
    "SET",
    "SOME",
    "SYMMETRIC",
    "TABLE",
    "THEN",
    "TO",
    "TRAILING",
    "TRUE",
    "UNION",
    "UNIQUE",
    "UPDATE",
    "USER",
    "USING",
    "VALUES",
    "VARIADIC",
    "WHEN",
    "WHERE",
    "WINDOW",
    "WITH",
];

/// Whether `name` matches the identifier grammar
///
/// A letter or underscore first, then letters, digits or underscores, at
/// most [`MAX_IDENTIFIER_LENGTH`] characters.
pub fn is_valid_identifier(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_IDENTIFIER_LENGTH {
        return false;
    }

    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');

    first_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether `name` is a reserved SQL keyword (case-insensitive)
pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS.contains(&name.to_ascii_uppercase().as_str())
}

/// Validate a table or column name against the identifier grammar
///
/// # Example
/// ```
/// use runtara_collections::sql::validate_identifier;
///
/// assert!(validate_identifier("products").is_ok());
/// assert!(validate_identifier("products; DROP TABLE x").is_err());
/// ```
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CollectionError::invalid_identifier(
            "identifier cannot be empty",
        ));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(CollectionError::invalid_identifier(format!(
            "identifier '{}' exceeds {} characters",
            name, MAX_IDENTIFIER_LENGTH
        )));
    }

    if !is_valid_identifier(name) {
        return Err(CollectionError::invalid_identifier(format!(
            "identifier '{}' must start with a letter or underscore and contain only letters, numbers, and underscores",
            name
        )));
    }

    Ok(())
}

/// Validate a name for a new collection
///
/// Rules:
/// - Must start with a letter, then letters, numbers, underscores
/// - Cannot be a reserved keyword
/// - Cannot use the system table prefix
pub fn validate_collection_name(name: &str, system_prefix: &str) -> Result<()> {
    validate_identifier(name)?;

    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(CollectionError::invalid_identifier(format!(
            "collection name '{}' must start with a letter",
            name
        )));
    }

    if is_reserved_word(name) {
        return Err(CollectionError::reserved_name(format!(
            "'{}' is a reserved keyword and cannot be used as a collection name",
            name
        )));
    }

    if !system_prefix.is_empty() && name.starts_with(system_prefix) {
        return Err(CollectionError::reserved_name(format!(
            "collection name '{}' uses the reserved prefix '{}'",
            name, system_prefix
        )));
    }

    Ok(())
}

/// Validate a name for a new column
///
/// Rules:
/// - Must start with a lowercase letter, then lowercase letters, numbers, underscores
/// - Cannot be a reserved keyword
/// - Cannot be the implicit primary key column
pub fn validate_column_name(name: &str) -> Result<()> {
    validate_identifier(name)?;

    if !name.starts_with(|c: char| c.is_ascii_lowercase())
        || name.chars().any(|c| c.is_ascii_uppercase())
    {
        return Err(CollectionError::invalid_identifier(format!(
            "column name '{}' must start with a lowercase letter and contain only lowercase letters, numbers, and underscores",
            name
        )));
    }

    if is_reserved_word(name) {
        return Err(CollectionError::reserved_name(format!(
            "'{}' is a reserved keyword and cannot be used as a column name",
            name
        )));
    }

    if name == PRIMARY_KEY_COLUMN {
        return Err(CollectionError::reserved_name(format!(
            "column name '{}' is reserved for the primary key",
            name
        )));
    }

    Ok(())
}
