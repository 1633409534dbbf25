//! SQL generation for collections
//!
//! Dialect strategies, identifier validation, WHERE/ORDER BY building, DDL and
//! the query builder that ties them together.

pub mod builder;
pub mod condition;
pub mod ddl;
pub mod dialect;
pub mod sanitize;

pub use builder::{Aggregate, QueryBuilder, Statement};
pub use condition::{
    Condition, Operator, OrderBy, Search, SortDirection, build_order_by_clause, escape_like_value,
    validate_operator,
};
pub use ddl::DdlGenerator;
pub use dialect::{Dialect, SqlDialect};
pub use sanitize::{
    RESERVED_WORDS, is_reserved_word, is_valid_identifier, validate_collection_name,
    validate_column_name, validate_identifier,
};
