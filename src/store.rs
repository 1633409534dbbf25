//! CollectionStore - Main entry point for schema-on-demand collections
//!
//! Ties the pieces together: declarations are checked and turned into DDL,
//! records are validated against the registry before any SQL is built, and
//! every statement is produced by the [`QueryBuilder`] for the database's
//! dialect.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::consistency::ConsistencyChecker;
use crate::database::{Database, Record, to_f64, to_i64};
use crate::error::{CollectionError, Result};
use crate::filter::Page;
use crate::registry::SchemaRegistry;
use crate::sql::builder::{Aggregate, QueryBuilder};
use crate::sql::condition::{Condition, OrderBy, Search};
use crate::sql::dialect::{Dialect, SqlDialect};
use crate::sql::sanitize::{validate_collection_name, validate_column_name};
use crate::types::{Collection, Column, ColumnType, PRIMARY_KEY_COLUMN};
use crate::validation::{ValidationCode, ValidationError, ValidationErrors, Validator};

/// Schema-on-demand collection store
///
/// Collection metadata lives in the shared [`SchemaRegistry`]; data lives in
/// one physical table per collection with an implicit integer `id` key.
pub struct CollectionStore {
    db: Arc<dyn Database>,
    registry: Arc<SchemaRegistry>,
    validator: Validator,
    config: StoreConfig,
}

impl CollectionStore {
    pub fn new(db: Arc<dyn Database>, registry: Arc<SchemaRegistry>, config: StoreConfig) -> Self {
        let validator = Validator::new(Arc::clone(&registry))
            .with_mode(config.validation_mode)
            .with_max_decimal_scale(config.max_decimal_scale);

        Self {
            db,
            registry,
            validator,
            config,
        }
    }

    /// Replace the validator, e.g. to attach custom rules
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    fn builder(&self) -> QueryBuilder {
        QueryBuilder::new(self.db.dialect())
    }

    fn require_collection(&self, name: &str) -> Result<Collection> {
        self.registry
            .get(name)
            .ok_or_else(|| CollectionError::collection_not_found(name))
    }

    /// A checker sharing this store's database, registry and recovery policy
    pub fn checker(&self) -> ConsistencyChecker {
        ConsistencyChecker::from_config(Arc::clone(&self.db), Arc::clone(&self.registry), &self.config)
    }

    // =========================================================================
    // Collection Operations
    // =========================================================================

    /// Declare a new collection and create its table
    ///
    /// The registry is only updated once the table exists.
    pub async fn create_collection(&self, name: &str, columns: Vec<Column>) -> Result<Collection> {
        validate_collection_name(name, &self.config.system_table_prefix)?;
        if self.config.is_system_table(name) {
            return Err(CollectionError::reserved_name(format!(
                "'{}' is reserved for system tables",
                name
            )));
        }

        for (i, column) in columns.iter().enumerate() {
            check_column(column)?;
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(CollectionError::invalid_identifier(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
        }

        if self.registry.exists(name) {
            return Err(CollectionError::CollectionExists(name.to_string()));
        }

        let collection = Collection::new(name, columns);
        let sql = self.builder().create_table(name, &collection.columns);
        self.db.exec(&sql, &[]).await?;
        self.registry.set(collection.clone())?;

        info!(collection = name, columns = collection.columns.len(), "Created collection");
        Ok(collection)
    }

    /// Add a column to an existing collection
    ///
    /// Existing rows have no value for the new column, so a NOT NULL column
    /// needs a default.
    pub async fn add_column(&self, collection: &str, column: Column) -> Result<Collection> {
        let mut existing = self.require_collection(collection)?;
        check_column(&column)?;

        if existing.has_column(&column.name) {
            return Err(CollectionError::invalid_identifier(format!(
                "column '{}' already exists in '{}'",
                column.name, collection
            )));
        }
        if column.is_required() {
            return Err(CollectionError::InvalidDefault(format!(
                "non-nullable column '{}' needs a default value",
                column.name
            )));
        }

        let sql = self.builder().alter_table_add_column(collection, &column);
        self.db.exec(&sql, &[]).await?;

        info!(collection, column = %column.name, "Added column");
        existing.columns.push(column);
        self.registry.set(existing.clone())?;
        Ok(existing)
    }

    /// Drop a collection's table and forget its declaration
    pub async fn drop_collection(&self, name: &str) -> Result<()> {
        self.require_collection(name)?;

        let sql = self.builder().drop_table(name);
        self.db.exec(&sql, &[]).await?;
        self.registry.delete(name)?;

        info!(collection = name, "Dropped collection");
        Ok(())
    }

    pub fn get_collection(&self, name: &str) -> Option<Collection> {
        self.registry.get(name)
    }

    /// All declared collections, sorted by name
    pub fn list_collections(&self) -> Vec<Collection> {
        self.registry.get_all()
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Validate and insert one record, returning its new `id`
    pub async fn insert(&self, collection: &str, data: Value) -> Result<i64> {
        let schema = self.require_collection(collection)?;
        let data = into_object(data)?;
        self.validator.validate(collection, &data)?;

        let (columns, values): (Vec<&str>, Vec<Value>) = schema
            .columns
            .iter()
            .filter_map(|c| data.get(&c.name).map(|v| (c.name.as_str(), v.clone())))
            .unzip();

        let (mut sql, args) = self.builder().insert(collection, &columns, values);

        let id = if self.db.dialect() == Dialect::Postgres {
            sql.push_str(" RETURNING ");
            sql.push_str(&Dialect::Postgres.strategy().quote_identifier(PRIMARY_KEY_COLUMN));
            let rows = self.db.query(&sql, &args).await?;
            rows.first()
                .and_then(|row| row.get(PRIMARY_KEY_COLUMN))
                .and_then(to_i64)
        } else {
            self.db.exec(&sql, &args).await?.last_insert_id
        };

        let id = id.ok_or_else(|| CollectionError::database("insert did not report a row id"))?;
        debug!(collection, id, "Inserted record");
        Ok(id)
    }

    /// Records matching every condition, in order, one page at a time
    pub async fn find(
        &self,
        collection: &str,
        conditions: &[Condition],
        order_by: &[OrderBy],
        page: Page,
    ) -> Result<Vec<Record>> {
        self.find_matching(collection, conditions, None, &[], order_by, page)
            .await
    }

    /// [`find`](Self::find) narrowed by a free-text [`Search`] and projected
    /// onto `fields` (every column when empty)
    pub async fn find_matching(
        &self,
        collection: &str,
        conditions: &[Condition],
        search: Option<&Search>,
        fields: &[String],
        order_by: &[OrderBy],
        page: Page,
    ) -> Result<Vec<Record>> {
        let schema = self.require_collection(collection)?;
        check_conditions(&schema, conditions)?;
        for key in order_by {
            check_known_column(&schema, &key.column, "sort")?;
        }
        for field in fields {
            check_known_column(&schema, field, "field")?;
        }
        if let Some(search) = search {
            for column in &search.columns {
                check_known_column(&schema, column, "search")?;
            }
        }

        let columns: Vec<&str> = fields.iter().map(String::as_str).collect();
        let (sql, args) = self.builder().with_collection(&schema).select_matching(
            collection,
            &columns,
            conditions,
            search,
            order_by,
            page.limit,
            page.offset,
        );
        let mut records = self.db.query(&sql, &args).await?;

        let dialect = self.db.dialect();
        for record in &mut records {
            normalize_record(&schema, dialect, record);
        }

        debug!(collection, rows = records.len(), "Found records");
        Ok(records)
    }

    /// Apply a partial record to every row matching the conditions
    ///
    /// Returns the number of rows changed. An update with no known fields
    /// touches nothing and returns 0.
    pub async fn update(&self, collection: &str, conditions: &[Condition], data: Value) -> Result<u64> {
        let schema = self.require_collection(collection)?;
        check_conditions(&schema, conditions)?;
        let data = into_object(data)?;
        self.validator.validate_partial(collection, &data)?;

        let updates: Map<String, Value> = data
            .into_iter()
            .filter(|(key, _)| schema.has_column(key))
            .collect();
        if updates.is_empty() {
            return Ok(0);
        }

        let (sql, args) = self
            .builder()
            .with_collection(&schema)
            .update(collection, &updates, conditions);
        let result = self.db.exec(&sql, &args).await?;

        debug!(collection, rows = result.rows_affected, "Updated records");
        Ok(result.rows_affected)
    }

    /// Delete every row matching the conditions, returning how many went
    pub async fn delete(&self, collection: &str, conditions: &[Condition]) -> Result<u64> {
        let schema = self.require_collection(collection)?;
        check_conditions(&schema, conditions)?;

        let (sql, args) = self
            .builder()
            .with_collection(&schema)
            .delete(collection, conditions);
        let result = self.db.exec(&sql, &args).await?;

        debug!(collection, rows = result.rows_affected, "Deleted records");
        Ok(result.rows_affected)
    }

    pub async fn count(&self, collection: &str, conditions: &[Condition]) -> Result<i64> {
        let value = self
            .aggregate(Aggregate::Count, collection, None, conditions)
            .await?;
        to_i64(&value).ok_or_else(|| {
            CollectionError::database(format!("COUNT returned a non-integer value: {}", value))
        })
    }

    /// Run an aggregate over the matching rows
    ///
    /// `SUM`, `AVG`, `MIN` and `MAX` need a numeric field. The result is a JSON
    /// number, or null when no rows matched.
    pub async fn aggregate(
        &self,
        function: Aggregate,
        collection: &str,
        field: Option<&str>,
        conditions: &[Condition],
    ) -> Result<Value> {
        let schema = self.require_collection(collection)?;
        check_conditions(&schema, conditions)?;

        if let Some(field) = field {
            check_known_column(&schema, field, "aggregate")?;
        }
        if function.requires_field() {
            let Some(field) = field else {
                return Err(CollectionError::invalid_filter(format!(
                    "{} requires a field",
                    function
                )));
            };
            let numeric = field == PRIMARY_KEY_COLUMN
                || schema.column(field).is_some_and(|c| c.column_type.is_numeric());
            if !numeric {
                return Err(CollectionError::invalid_filter(format!(
                    "{} requires a numeric field, '{}' is not numeric",
                    function, field
                )));
            }
        }

        let (sql, args) = self
            .builder()
            .with_collection(&schema)
            .aggregate(function, collection, field, conditions);
        let rows = self.db.query(&sql, &args).await?;

        let value = rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next().map(|(_, v)| v))
            .unwrap_or(Value::Null);

        Ok(numeric_value(value))
    }
}

/// Declaration checks for one column
fn check_column(column: &Column) -> Result<()> {
    validate_column_name(&column.name)?;
    if let Some(default) = &column.default_value {
        column
            .column_type
            .validate_default(default)
            .map_err(CollectionError::InvalidDefault)?;
    }
    Ok(())
}

fn check_known_column(collection: &Collection, column: &str, usage: &str) -> Result<()> {
    if column == PRIMARY_KEY_COLUMN || collection.has_column(column) {
        Ok(())
    } else {
        Err(CollectionError::invalid_filter(format!(
            "invalid {} column: {}",
            usage, column
        )))
    }
}

fn check_conditions(collection: &Collection, conditions: &[Condition]) -> Result<()> {
    conditions
        .iter()
        .try_for_each(|c| check_known_column(collection, &c.column, "filter"))
}

fn into_object(data: Value) -> Result<Map<String, Value>> {
    match data {
        Value::Object(map) => Ok(map),
        other => {
            let mut errors = ValidationErrors::default();
            errors.push(
                ValidationError::new("data", ValidationCode::InvalidType, "record must be a JSON object")
                    .actual(other),
            );
            Err(CollectionError::Validation(errors))
        }
    }
}

/// Bring engine-specific encodings back to the declared column types
///
/// SQLite and MySQL hand booleans back as 0/1, and SQLite stores JSON as text.
fn normalize_record(collection: &Collection, dialect: Dialect, record: &mut Record) {
    for column in &collection.columns {
        let Some(value) = record.get_mut(&column.name) else {
            continue;
        };

        match (column.column_type, &*value) {
            (ColumnType::Boolean, Value::Number(n)) if dialect != Dialect::Postgres => {
                if let Some(i) = n.as_i64() {
                    *value = Value::Bool(i != 0);
                }
            }
            (ColumnType::Json, Value::String(text)) if dialect == Dialect::Sqlite => {
                if let Ok(parsed) = serde_json::from_str(text) {
                    *value = parsed;
                }
            }
            _ => {}
        }
    }
}

/// Aggregates over NUMERIC come back as text; turn them into JSON numbers
fn numeric_value(value: Value) -> Value {
    match &value {
        Value::String(text) => {
            if let Ok(i) = text.parse::<i64>() {
                Value::from(i)
            } else {
                to_f64(&value).map_or(value, Value::from)
            }
        }
        _ => value,
    }
}
