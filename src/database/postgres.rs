//! PostgreSQL transport
//!
//! Postgres types its parameters strictly (a TEXT argument is not accepted for
//! a TIMESTAMP column), so every statement is prepared first and each JSON
//! argument is converted to the parameter type the server reports.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column as _, Executor, Postgres, Row, Statement, TypeInfo as _};
use tracing::debug;

use super::{ColumnInfo, Database, ExecResult, Record, TableInfo, to_bool, to_f64, to_i64};
use crate::error::{CollectionError, Result};
use crate::sql::dialect::Dialect;

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// [`Database`] over a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Prepare `sql` and bind `args` as the parameter types the server expects
    async fn bind<'q>(&self, sql: &'q str, args: &[Value]) -> Result<PgQuery<'q>> {
        let param_types: Vec<String> = if args.is_empty() {
            Vec::new()
        } else {
            let statement = (&self.pool).prepare(sql).await?;
            statement
                .parameters()
                .and_then(|params| params.left())
                .map(|types| types.iter().map(|t| t.name().to_string()).collect())
                .unwrap_or_default()
        };

        let mut query = sqlx::query(sql);
        for (i, value) in args.iter().enumerate() {
            let type_name = param_types.get(i).map(String::as_str).unwrap_or("");
            query = bind_value(query, type_name, value)?;
        }
        Ok(query)
    }
}

#[async_trait]
impl Database for PgDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        debug!(sql, args = args.len(), "Executing statement");
        let result = self.bind(sql, args).await?.execute(&self.pool).await?;
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: None,
        })
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Record>> {
        debug!(sql, args = args.len(), "Executing query");
        let rows = self.bind(sql, args).await?.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT tablename::text AS name FROM pg_catalog.pg_tables \
             WHERE schemaname = current_schema() ORDER BY tablename",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(Into::into))
            .collect()
    }

    async fn get_table_info(&self, table: &str) -> Result<TableInfo> {
        // information_schema columns are domain types; cast to text to decode
        let rows = sqlx::query(
            "SELECT column_name::text AS name, data_type::text AS native_type, \
                    is_nullable::text AS is_nullable, column_default::text AS default_value \
             FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 \
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Err(CollectionError::database(format!(
                "table '{}' does not exist",
                table
            )));
        }

        let constraints = sqlx::query(
            "SELECT kcu.column_name::text AS name, tc.constraint_type::text AS kind, \
                    COUNT(*) OVER (PARTITION BY tc.constraint_name) AS width \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON tc.constraint_name = kcu.constraint_name \
              AND tc.table_schema = kcu.table_schema \
              AND tc.table_name = kcu.table_name \
             WHERE tc.table_schema = current_schema() AND tc.table_name = $1 \
               AND tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE')",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let mut primary = Vec::new();
        let mut unique = Vec::new();
        for row in &constraints {
            let name: String = row.try_get("name")?;
            let kind: String = row.try_get("kind")?;
            let width: i64 = row.try_get("width")?;
            match kind.as_str() {
                "PRIMARY KEY" => primary.push(name),
                "UNIQUE" if width == 1 => unique.push(name),
                _ => {}
            }
        }

        let columns = rows
            .iter()
            .map(|row| -> Result<ColumnInfo> {
                let name: String = row.try_get("name")?;
                let is_nullable: String = row.try_get("is_nullable")?;
                Ok(ColumnInfo {
                    native_type: row.try_get("native_type")?,
                    nullable: is_nullable.eq_ignore_ascii_case("YES"),
                    default_value: row.try_get("default_value")?,
                    is_primary_key: primary.contains(&name),
                    is_unique: unique.contains(&name),
                    name,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(table, columns = columns.len(), "Described table");
        Ok(TableInfo {
            name: table.to_string(),
            columns,
        })
    }
}

// ============================================================================
// Binding
// ============================================================================

fn convert<T>(
    value: &Value,
    type_name: &str,
    f: impl FnOnce(&Value) -> Option<T>,
) -> Result<Option<T>> {
    if value.is_null() {
        return Ok(None);
    }
    f(value).map(Some).ok_or_else(|| {
        CollectionError::database(format!("cannot bind {} as {}", value, type_name))
    })
}

fn parse_naive_datetime(value: &Value) -> Option<NaiveDateTime> {
    let s = value.as_str()?;
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok())
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

fn bind_value<'q>(query: PgQuery<'q>, type_name: &str, value: &Value) -> Result<PgQuery<'q>> {
    Ok(match type_name {
        "INT2" => query.bind(convert(value, type_name, |v| {
            to_i64(v).and_then(|n| i16::try_from(n).ok())
        })?),
        "INT4" => query.bind(convert(value, type_name, |v| {
            to_i64(v).and_then(|n| i32::try_from(n).ok())
        })?),
        "INT8" => query.bind(convert(value, type_name, to_i64)?),
        "FLOAT4" => query.bind(convert(value, type_name, |v| to_f64(v).map(|f| f as f32))?),
        "FLOAT8" => query.bind(convert(value, type_name, to_f64)?),
        "NUMERIC" => query.bind(convert(value, type_name, to_decimal)?),
        "BOOL" => query.bind(convert(value, type_name, to_bool)?),
        "TIMESTAMP" => query.bind(convert(value, type_name, parse_naive_datetime)?),
        "TIMESTAMPTZ" => query.bind(convert(value, type_name, |v| {
            parse_naive_datetime(v).map(|dt| dt.and_utc())
        })?),
        "DATE" => query.bind(convert(value, type_name, |v| {
            parse_naive_datetime(v).map(|dt| dt.date())
        })?),
        "JSON" | "JSONB" => query.bind((!value.is_null()).then(|| value.clone())),
        _ => match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => query.bind(i),
                None => query.bind(n.as_f64()),
            },
            Value::String(s) => query.bind(s.clone()),
            other => query.bind(other.to_string()),
        },
    })
}

// ============================================================================
// Decoding
// ============================================================================

fn row_to_record(row: &PgRow) -> Result<Record> {
    let mut record = Record::new();

    for column in row.columns() {
        let idx = column.ordinal();
        let value = match column.type_info().name() {
            "INT2" => row.try_get::<Option<i16>, _>(idx)?.map(Value::from),
            "INT4" => row.try_get::<Option<i32>, _>(idx)?.map(Value::from),
            "INT8" => row.try_get::<Option<i64>, _>(idx)?.map(Value::from),
            "FLOAT4" => row
                .try_get::<Option<f32>, _>(idx)?
                .map(|f| Value::from(f64::from(f))),
            "FLOAT8" => row.try_get::<Option<f64>, _>(idx)?.map(Value::from),
            "NUMERIC" => row
                .try_get::<Option<Decimal>, _>(idx)?
                .map(|d| Value::String(d.to_string())),
            "BOOL" => row.try_get::<Option<bool>, _>(idx)?.map(Value::Bool),
            "TIMESTAMP" => row
                .try_get::<Option<NaiveDateTime>, _>(idx)?
                .map(|dt| Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string())),
            "TIMESTAMPTZ" => row
                .try_get::<Option<DateTime<Utc>>, _>(idx)?
                .map(|dt| Value::String(dt.to_rfc3339())),
            "DATE" => row
                .try_get::<Option<NaiveDate>, _>(idx)?
                .map(|d| Value::String(d.to_string())),
            "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(idx)?,
            _ => row
                .try_get::<Option<String>, _>(idx)
                .ok()
                .flatten()
                .map(Value::String),
        };
        record.insert(column.name().to_string(), value.unwrap_or(Value::Null));
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_naive_datetime_layouts() {
        for input in [
            "2024-01-15T10:30:00Z",
            "2024-01-15T10:30:00",
            "2024-01-15 10:30:00",
            "2024-01-15T10:30:00.250",
        ] {
            let dt = parse_naive_datetime(&json!(input)).unwrap();
            assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2024-01-15 10:30");
        }

        let midnight = parse_naive_datetime(&json!("2024-01-15")).unwrap();
        assert_eq!(midnight.format("%H:%M:%S").to_string(), "00:00:00");
        assert!(parse_naive_datetime(&json!("soon")).is_none());
        assert!(parse_naive_datetime(&json!(5)).is_none());
    }

    #[test]
    fn test_to_decimal() {
        assert_eq!(to_decimal(&json!("19.99")), Decimal::from_str("19.99").ok());
        assert_eq!(to_decimal(&json!(3)), Some(Decimal::from(3)));
        assert!(to_decimal(&json!("abc")).is_none());
    }

    #[test]
    fn test_convert_null_and_mismatch() {
        assert_eq!(convert(&json!(null), "INT4", to_i64).unwrap(), None);
        assert_eq!(convert(&json!("7"), "INT4", to_i64).unwrap(), Some(7));
        let err = convert(&json!("seven"), "INT4", to_i64).unwrap_err();
        assert!(err.to_string().contains("cannot bind \"seven\" as INT4"));
    }
}
