//! # runtara-collections
//!
//! Schema-on-demand collections over PostgreSQL, MySQL and SQLite.
//!
//! A collection is a named table whose columns are declared at runtime with a
//! small set of portable types. The crate keeps those declarations in an
//! in-memory registry, turns declarations and record operations into
//! dialect-correct SQL with bound arguments, validates records against the
//! declared schema, and reconciles the registry with what the database
//! actually contains.
//!
//! ## Features
//!
//! - **Portable Column Types**: String, Integer, Decimal, Boolean, Datetime and JSON
//! - **Three Dialects**: identifier quoting, placeholders and DDL per engine
//! - **Safe Query Building**: values are always bound, identifiers always validated
//! - **Schema Validation**: aggregated, machine-readable errors per field
//! - **Consistency Checking**: orphaned tables and registry entries found and repaired
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use runtara_collections::{
//!     CollectionStore, Column, ColumnType, Condition, Page, SchemaRegistry, SqliteDatabase,
//!     StoreConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Arc::new(SqliteDatabase::connect("sqlite::memory:").await?);
//!     let store = CollectionStore::new(db, Arc::new(SchemaRegistry::new()), StoreConfig::default());
//!
//!     store
//!         .create_collection(
//!             "products",
//!             vec![
//!                 Column::new("title", ColumnType::String).not_null(),
//!                 Column::new("price", ColumnType::Integer),
//!                 Column::new("in_stock", ColumnType::Boolean).default("TRUE"),
//!             ],
//!         )
//!         .await?;
//!
//!     let id = store
//!         .insert("products", serde_json::json!({ "title": "Lamp", "price": 30 }))
//!         .await?;
//!
//!     let cheap = store
//!         .find("products", &[Condition::lt("price", 50)], &[], Page::new(10, 0))
//!         .await?;
//!     assert_eq!(cheap[0]["id"], id);
//!
//!     let report = store.checker().check().await?;
//!     assert!(report.consistent);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use std::time::Duration;
//! use runtara_collections::{StoreConfig, ValidationMode};
//!
//! let config = StoreConfig::builder()
//!     .validation_mode(ValidationMode::Permissive) // ignore unknown fields
//!     .system_table_prefix("__")                   // never treated as collections
//!     .drop_orphans(false)                         // register unknown tables instead
//!     .check_timeout(Duration::from_secs(5))
//!     .build();
//! ```

pub mod config;
pub mod consistency;
pub mod database;
pub mod error;
pub mod filter;
pub mod registry;
pub mod sql;
pub mod store;
pub mod types;
pub mod validation;

// Re-export main types for convenience
pub use config::{Limits, RecoveryConfig, StoreConfig, StoreConfigBuilder};
pub use consistency::{CheckResult, ConsistencyChecker, ConsistencyStatus, Issue, IssueKind};
pub use database::{
    ColumnInfo, Database, ExecResult, PgDatabase, Record, SqliteDatabase, TableInfo,
};
pub use error::{CollectionError, Result};
pub use filter::{Page, parse_fields, parse_filters, parse_search, parse_sort};
pub use registry::SchemaRegistry;
pub use store::CollectionStore;
pub use types::{Collection, Column, ColumnType};
pub use validation::{
    ValidationCode, ValidationError, ValidationErrors, ValidationMode, Validator,
};

// Re-export SQL utilities for advanced users
pub use sql::{
    Aggregate, Condition, Dialect, Operator, OrderBy, QueryBuilder, Search, SortDirection,
    SqlDialect,
    validate_identifier,
};
