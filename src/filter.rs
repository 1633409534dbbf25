//! Request filter, sort and paging parsing
//!
//! Turns query-string style parameters into the structured inputs of the
//! query builder:
//!
//! - `price[gt]=100`, `status[in]=new,used` become [`Condition`]s
//! - `sort=title,-price` becomes [`OrderBy`] keys
//! - `limit` / `offset` become a [`Page`]
//! - `fields=title,price` becomes a projection
//! - `q=lamp` becomes a [`Search`] over the string columns
//!
//! Every column is checked against the collection, so nothing unknown reaches
//! SQL text.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Limits;
use crate::error::{CollectionError, Result};
use crate::sql::condition::{Condition, Operator, OrderBy, Search};
use crate::types::{Collection, ColumnType, PRIMARY_KEY_COLUMN};

static FILTER_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+)\[(eq|ne|gt|lt|gte|lte|like|in)\]$").expect("filter key pattern")
});

fn operator_for(short: &str) -> Option<Operator> {
    match short {
        "eq" => Some(Operator::Eq),
        "ne" => Some(Operator::Ne),
        "gt" => Some(Operator::Gt),
        "lt" => Some(Operator::Lt),
        "gte" => Some(Operator::Gte),
        "lte" => Some(Operator::Lte),
        "like" => Some(Operator::Like),
        "in" => Some(Operator::In),
        _ => None,
    }
}

/// Type of a filterable column, including the implicit primary key
fn column_type(collection: &Collection, name: &str) -> Option<ColumnType> {
    if name == PRIMARY_KEY_COLUMN {
        return Some(ColumnType::Integer);
    }
    collection.column(name).map(|c| c.column_type)
}

fn coerce(column: &str, raw: &str, column_type: ColumnType) -> Result<Value> {
    match column_type {
        ColumnType::Integer => raw.parse::<i64>().map(Value::from).map_err(|_| {
            CollectionError::invalid_filter(format!(
                "invalid value for column {}: '{}' is not an integer",
                column, raw
            ))
        }),
        ColumnType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "t" => Ok(Value::Bool(true)),
            "false" | "0" | "f" => Ok(Value::Bool(false)),
            _ => Err(CollectionError::invalid_filter(format!(
                "invalid value for column {}: '{}' is not a boolean",
                column, raw
            ))),
        },
        _ => Ok(Value::String(raw.to_string())),
    }
}

/// Parse `field[op]=value` pairs into conditions
///
/// Keys that are not filters (`limit`, `sort`, ...) are skipped. Unknown
/// columns, unparsable values and more than `limits.max_filters` filters are
/// errors. `in` values are split on commas. `like` values are kept as given;
/// the builder escapes them, so they match literally.
pub fn parse_filters<I, K, V>(params: I, collection: &Collection, limits: &Limits) -> Result<Vec<Condition>>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut conditions = Vec::new();

    for (key, value) in params {
        let Some(captures) = FILTER_KEY.captures(key.as_ref()) else {
            continue;
        };

        if conditions.len() >= limits.max_filters {
            return Err(CollectionError::invalid_filter(format!(
                "maximum number of filters ({}) exceeded",
                limits.max_filters
            )));
        }

        let column = &captures[1];
        let Some(operator) = operator_for(&captures[2]) else {
            continue;
        };
        let Some(column_type) = column_type(collection, column) else {
            return Err(CollectionError::invalid_filter(format!(
                "invalid filter column: {}",
                column
            )));
        };

        let raw = value.as_ref();
        let value = match operator {
            Operator::In => Value::Array(
                raw.split(',')
                    .map(|part| coerce(column, part.trim(), column_type))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Operator::Like => Value::String(raw.to_string()),
            _ => coerce(column, raw, column_type)?,
        };

        conditions.push(Condition {
            column: column.to_string(),
            operator,
            value,
        });
    }

    Ok(conditions)
}

/// Parse `a,-b,+c` into sort keys (`-` descending, `+` or nothing ascending)
pub fn parse_sort(sort: &str, collection: &Collection, limits: &Limits) -> Result<Vec<OrderBy>> {
    let mut order = Vec::new();

    for part in sort.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if order.len() >= limits.max_sort_fields {
            return Err(CollectionError::invalid_filter(format!(
                "maximum number of sort fields ({}) exceeded",
                limits.max_sort_fields
            )));
        }

        let key = if let Some(column) = part.strip_prefix('-') {
            OrderBy::desc(column)
        } else {
            OrderBy::asc(part.strip_prefix('+').unwrap_or(part))
        };

        if column_type(collection, &key.column).is_none() {
            return Err(CollectionError::invalid_filter(format!(
                "invalid sort column: {}",
                key.column
            )));
        }

        order.push(key);
    }

    Ok(order)
}

/// Parse a comma-separated projection such as `title,price`
///
/// `id` is always selected and comes first; duplicates and empty parts are
/// dropped. An empty list means every column.
pub fn parse_fields(fields: &str, collection: &Collection) -> Result<Vec<String>> {
    let mut selected = Vec::new();

    for field in fields.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        if column_type(collection, field).is_none() {
            return Err(CollectionError::invalid_filter(format!("invalid field: {}", field)));
        }
        if !selected.iter().any(|s| s == field) {
            selected.push(field.to_string());
        }
    }

    if !selected.is_empty() && selected[0] != PRIMARY_KEY_COLUMN {
        selected.retain(|s| s != PRIMARY_KEY_COLUMN);
        selected.insert(0, PRIMARY_KEY_COLUMN.to_string());
    }

    Ok(selected)
}

/// Free-text search over every string column of the collection
///
/// A blank term, or a collection without string columns, searches nothing.
pub fn parse_search(term: &str, collection: &Collection) -> Option<Search> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }

    let columns: Vec<String> = collection
        .columns
        .iter()
        .filter(|c| c.column_type == ColumnType::String)
        .map(|c| c.name.clone())
        .collect();

    (!columns.is_empty()).then(|| Search::new(term, columns))
}

/// One page of results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

impl Page {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self { limit, offset }
    }

    /// First page with the default size
    pub fn first(limits: &Limits) -> Self {
        Self::new(limits.default_page_size, 0)
    }

    /// Read `limit` and `offset` from request parameters
    ///
    /// A missing limit means the default page size; a limit below 1 or above
    /// the maximum page size is rejected.
    pub fn from_params<I, K, V>(params: I, limits: &Limits) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut page = Self::first(limits);

        for (key, value) in params {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            match key {
                "limit" => {
                    let limit: u64 = value.parse().map_err(|_| {
                        CollectionError::invalid_filter(format!("invalid limit '{}'", value))
                    })?;
                    if limit < 1 {
                        return Err(CollectionError::invalid_filter("limit must be at least 1"));
                    }
                    if limit > limits.max_page_size {
                        return Err(CollectionError::invalid_filter(format!(
                            "limit cannot exceed {}",
                            limits.max_page_size
                        )));
                    }
                    page.limit = limit;
                }
                "offset" => {
                    page.offset = value.parse().map_err(|_| {
                        CollectionError::invalid_filter(format!("invalid offset '{}'", value))
                    })?;
                }
                _ => {}
            }
        }

        Ok(page)
    }
}
