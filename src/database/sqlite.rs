//! SQLite transport
//!
//! SQLite is dynamically typed, so arguments bind by their JSON kind and
//! values decode by their storage class.

use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as _, Row, Sqlite};
use tracing::debug;

use super::{ColumnInfo, Database, ExecResult, Record, TableInfo};
use crate::error::{CollectionError, Result};
use crate::sql::dialect::Dialect;
use crate::sql::sanitize::validate_identifier;

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// [`Database`] over a SQLite pool
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a database, creating the file if needed
    ///
    /// An in-memory URL gets a single connection that is never recycled:
    /// every SQLite connection has its own private memory database.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new();
        if url.contains(":memory:") {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

fn bind_all<'q>(sql: &'q str, args: &[Value]) -> SqliteQuery<'q> {
    args.iter()
        .fold(sqlx::query(sql), |query, value| bind_value(query, value))
}

/// Decode one column by trying the storage classes in turn
fn column_value(row: &SqliteRow, idx: usize) -> Result<Value> {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return Ok(v.map_or(Value::Null, Value::from));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return Ok(v.map_or(Value::Null, Value::from));
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return Ok(v.map_or(Value::Null, Value::String));
    }
    let bytes = row.try_get::<Option<Vec<u8>>, _>(idx)?;
    Ok(bytes.map_or(Value::Null, |b| {
        Value::String(String::from_utf8_lossy(&b).into_owned())
    }))
}

fn row_to_record(row: &SqliteRow) -> Result<Record> {
    let mut record = Record::new();
    for column in row.columns() {
        record.insert(column.name().to_string(), column_value(row, column.ordinal())?);
    }
    Ok(record)
}

#[async_trait]
impl Database for SqliteDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        debug!(sql, args = args.len(), "Executing statement");
        let result = bind_all(sql, args).execute(&self.pool).await?;
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: Some(result.last_insert_rowid()),
        })
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Record>> {
        debug!(sql, args = args.len(), "Executing query");
        let rows = bind_all(sql, args).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(Into::into))
            .collect()
    }

    async fn get_table_info(&self, table: &str) -> Result<TableInfo> {
        // PRAGMA arguments cannot be bound
        validate_identifier(table)?;

        let rows = sqlx::query(&format!("PRAGMA table_info(\"{}\")", table))
            .fetch_all(&self.pool)
            .await?;

        if rows.is_empty() {
            return Err(CollectionError::database(format!(
                "table '{}' does not exist",
                table
            )));
        }

        let unique = self.unique_columns(table).await?;

        let columns = rows
            .iter()
            .map(|row| -> Result<ColumnInfo> {
                let name: String = row.try_get("name")?;
                let not_null: i64 = row.try_get("notnull")?;
                let pk: i64 = row.try_get("pk")?;
                Ok(ColumnInfo {
                    native_type: row.try_get("type")?,
                    nullable: not_null == 0 && pk == 0,
                    default_value: row.try_get("dflt_value")?,
                    is_primary_key: pk > 0,
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

impl SqliteDatabase {
    /// Columns covered on their own by a UNIQUE constraint
    async fn unique_columns(&self, table: &str) -> Result<Vec<String>> {
        let indexes = sqlx::query(&format!("PRAGMA index_list(\"{}\")", table))
            .fetch_all(&self.pool)
            .await?;

        let mut unique = Vec::new();
        for index in &indexes {
            let is_unique: i64 = index.try_get("unique")?;
            let origin: String = index.try_get("origin")?;
            if is_unique == 0 || origin != "u" {
                continue;
            }

            let name: String = index.try_get("name")?;
            let columns = sqlx::query(&format!("PRAGMA index_info(\"{}\")", name.replace('"', "\"\"")))
                .fetch_all(&self.pool)
                .await?;
            if let [column] = columns.as_slice() {
                unique.push(column.try_get::<String, _>("name")?);
            }
        }

        Ok(unique)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn memory_db() -> SqliteDatabase {
        SqliteDatabase::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_exec_and_query_round_trip() {
        let db = memory_db().await;
        db.exec(
            "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, score REAL, flag INTEGER)",
            &[],
        )
        .await
        .unwrap();

        let result = db
            .exec(
                "INSERT INTO t (name, score, flag) VALUES (?, ?, ?)",
                &[json!("a"), json!(1.5), json!(true)],
            )
            .await
            .unwrap();
        assert_eq!(result.rows_affected, 1);
        assert_eq!(result.last_insert_id, Some(1));

        let rows = db
            .query("SELECT * FROM t WHERE name = ?", &[json!("a")])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!(1));
        assert_eq!(rows[0]["name"], json!("a"));
        assert_eq!(rows[0]["score"], json!(1.5));
        assert_eq!(rows[0]["flag"], json!(1));
    }

    #[tokio::test]
    async fn test_null_round_trip() {
        let db = memory_db().await;
        db.exec("CREATE TABLE t (v TEXT)", &[]).await.unwrap();
        db.exec("INSERT INTO t (v) VALUES (?)", &[Value::Null])
            .await
            .unwrap();
        let rows = db.query("SELECT v FROM t", &[]).await.unwrap();
        assert_eq!(rows[0]["v"], Value::Null);
    }

    #[tokio::test]
    async fn test_list_tables_and_table_info() {
        let db = memory_db().await;
        db.exec(
            "CREATE TABLE orders (id INTEGER PRIMARY KEY AUTOINCREMENT, sku TEXT NOT NULL UNIQUE, qty INTEGER DEFAULT 1)",
            &[],
        )
        .await
        .unwrap();

        let tables = db.list_tables().await.unwrap();
        assert!(tables.contains(&"orders".to_string()));

        let info = db.get_table_info("orders").await.unwrap();
        assert_eq!(info.name, "orders");
        let names: Vec<_> = info.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "sku", "qty"]);

        assert!(info.columns[0].is_primary_key);
        assert!(!info.columns[1].nullable);
        assert!(info.columns[1].is_unique);
        assert_eq!(info.columns[2].default_value.as_deref(), Some("1"));
        assert_eq!(info.columns[2].native_type, "INTEGER");
    }

    #[tokio::test]
    async fn test_table_info_missing_or_invalid() {
        let db = memory_db().await;
        assert!(db.get_table_info("nope").await.is_err());
        assert!(matches!(
            db.get_table_info("x\"; DROP TABLE y; --").await,
            Err(CollectionError::InvalidIdentifier(_))
        ));
    }
}
