//! Error types for collection operations

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Errors that can occur while declaring, validating or querying collections
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Reserved name: {0}")]
    ReservedName(String),

    #[error("Invalid column type: {0}")]
    InvalidColumnType(String),

    #[error("Invalid default value: {0}")]
    InvalidDefault(String),

    #[error("Collection already exists: {0}")]
    CollectionExists(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Invalid operator: {0}")]
    InvalidOperator(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CollectionError {
    pub fn invalid_identifier(msg: impl Into<String>) -> Self {
        Self::InvalidIdentifier(msg.into())
    }

    pub fn reserved_name(msg: impl Into<String>) -> Self {
        Self::ReservedName(msg.into())
    }

    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Self::CollectionNotFound(name.into())
    }

    pub fn invalid_filter(msg: impl Into<String>) -> Self {
        Self::InvalidFilter(msg.into())
    }

    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }
}

impl From<ValidationErrors> for CollectionError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

pub type Result<T> = std::result::Result<T, CollectionError>;
