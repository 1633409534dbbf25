//! Registry ↔ database consistency checking
//!
//! A check lists the physical tables, diffs them against the registry in both
//! directions and, when auto-repair is enabled, resolves each drift on its own:
//!
//! - a registry entry without a table is removed from the registry
//! - a table without a registry entry is either dropped (`drop_orphans`) or
//!   registered with a collection inferred from its live columns
//!
//! One failed repair never aborts the others; it only leaves its own issue
//! unrepaired.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};
use tokio::time::{Instant, timeout_at};
use tracing::{info, warn};

use crate::config::{RecoveryConfig, StoreConfig};
use crate::database::Database;
use crate::error::{CollectionError, Result};
use crate::registry::SchemaRegistry;
use crate::sql::builder::QueryBuilder;
use crate::sql::sanitize::is_valid_identifier;
use crate::types::{Collection, Column, ColumnType, PRIMARY_KEY_COLUMN};

/// Kind of drift between registry and database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Table exists in the database but not in the registry
    OrphanedTable,
    /// Collection is registered but its table does not exist
    OrphanedRegistry,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::OrphanedTable => "orphaned_table",
            IssueKind::OrphanedRegistry => "orphaned_registry",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            IssueKind::OrphanedTable => "table exists in database but not in registry",
            IssueKind::OrphanedRegistry => "collection registered but table does not exist",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected drift
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub name: String,
    pub description: String,
    pub repaired: bool,
}

impl Issue {
    fn new(kind: IssueKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            description: kind.description().to_string(),
            repaired: false,
        }
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Outcome of one check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    /// False whenever any issue was found, repaired or not
    pub consistent: bool,
    pub issues: Vec<Issue>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    /// Listing the physical tables did not finish before the deadline
    pub timed_out: bool,
}

impl CheckResult {
    /// Collapse the result into a health status
    pub fn status(&self) -> ConsistencyStatus {
        if self.timed_out {
            ConsistencyStatus::Timeout
        } else if self.issues.iter().all(|issue| issue.repaired) {
            ConsistencyStatus::Ok
        } else {
            ConsistencyStatus::Inconsistent
        }
    }
}

/// Health summary of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyStatus {
    /// No issues, or every issue was repaired
    Ok,
    /// Unrepaired issues remain
    Inconsistent,
    Timeout,
    /// The check itself failed
    Error,
}

impl ConsistencyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyStatus::Ok => "ok",
            ConsistencyStatus::Inconsistent => "inconsistent",
            ConsistencyStatus::Timeout => "timeout",
            ConsistencyStatus::Error => "error",
        }
    }
}

impl fmt::Display for ConsistencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compares the registry against the live database
///
/// Borrows shared handles to both; concurrent checks are not coordinated.
pub struct ConsistencyChecker {
    db: Arc<dyn Database>,
    registry: Arc<SchemaRegistry>,
    config: StoreConfig,
}

impl ConsistencyChecker {
    /// Checker with the given recovery policy and the default system tables
    pub fn new(db: Arc<dyn Database>, registry: Arc<SchemaRegistry>, recovery: RecoveryConfig) -> Self {
        let config = StoreConfig::builder().recovery(recovery).build();
        Self::from_config(db, registry, &config)
    }

    /// Checker using the recovery policy and system tables of a store config
    pub fn from_config(db: Arc<dyn Database>, registry: Arc<SchemaRegistry>, config: &StoreConfig) -> Self {
        Self {
            db,
            registry,
            config: config.clone(),
        }
    }

    fn recovery(&self) -> &RecoveryConfig {
        &self.config.recovery
    }

    /// Run one check, repairing drift if auto-repair is enabled
    ///
    /// A listing that misses the deadline yields `Ok` with `timed_out` set.
    /// Any other listing failure is an error.
    pub async fn check(&self) -> Result<CheckResult> {
        let start = Instant::now();
        let deadline = start + self.recovery().check_timeout;

        let all_tables = match timeout_at(deadline, self.db.list_tables()).await {
            Ok(tables) => tables?,
            Err(_) => {
                warn!(
                    timeout = ?self.recovery().check_timeout,
                    "Consistency check timed out while listing tables"
                );
                return Ok(CheckResult {
                    consistent: false,
                    issues: Vec::new(),
                    duration: start.elapsed(),
                    timed_out: true,
                });
            }
        };

        let tables: BTreeSet<String> = all_tables
            .into_iter()
            .filter(|t| !self.config.is_system_table(t))
            .collect();
        let collections: BTreeSet<String> = self
            .registry
            .list()
            .into_iter()
            .filter(|c| !self.config.is_system_table(c))
            .collect();

        let mut issues = Vec::new();

        for name in collections.difference(&tables) {
            let mut issue = Issue::new(IssueKind::OrphanedRegistry, name);
            if self.recovery().auto_repair {
                match self.registry.delete(name) {
                    Ok(()) => {
                        issue.repaired = true;
                        info!(collection = %name, "Removed orphaned registry entry");
                    }
                    Err(e) => {
                        warn!(collection = %name, error = %e, "Failed to remove orphaned registry entry");
                    }
                }
            }
            issues.push(issue);
        }

        for table in tables.difference(&collections) {
            let mut issue = Issue::new(IssueKind::OrphanedTable, table);
            if self.recovery().auto_repair {
                issue.repaired = self.repair_orphaned_table(table, deadline).await;
            }
            issues.push(issue);
        }

        let result = CheckResult {
            consistent: issues.is_empty(),
            issues,
            duration: start.elapsed(),
            timed_out: false,
        };

        if result.consistent {
            info!("Consistency check passed: registry and database are synchronized");
        } else {
            warn!(issues = result.issues.len(), "Consistency check found issues");
            for issue in &result.issues {
                warn!(
                    kind = %issue.kind,
                    name = %issue.name,
                    repaired = issue.repaired,
                    "Consistency issue"
                );
            }
        }

        Ok(result)
    }

    /// Run a check and collapse it into a status
    pub async fn status(&self) -> ConsistencyStatus {
        match self.check().await {
            Ok(result) => result.status(),
            Err(e) => {
                warn!(error = %e, "Consistency check failed");
                ConsistencyStatus::Error
            }
        }
    }

    async fn repair_orphaned_table(&self, table: &str, deadline: Instant) -> bool {
        if self.recovery().drop_orphans {
            if !is_valid_identifier(table) {
                warn!(table, "Skipping drop of table with invalid name");
                return false;
            }

            let sql = QueryBuilder::new(self.db.dialect()).drop_table(table);
            match timeout_at(deadline, self.db.exec(&sql, &[])).await {
                Ok(Ok(_)) => {
                    info!(table, "Dropped orphaned table");
                    true
                }
                Ok(Err(e)) => {
                    warn!(table, error = %e, "Failed to drop orphaned table");
                    false
                }
                Err(_) => {
                    warn!(table, "Consistency check deadline passed before dropping table");
                    false
                }
            }
        } else {
            match timeout_at(deadline, self.register_orphaned_table(table)).await {
                Ok(Ok(())) => {
                    info!(table, "Registered orphaned table");
                    true
                }
                Ok(Err(e)) => {
                    warn!(table, error = %e, "Failed to register orphaned table");
                    false
                }
                Err(_) => {
                    warn!(table, "Consistency check deadline passed before registering table");
                    false
                }
            }
        }
    }

    /// Infer a collection from the table's live columns and register it
    async fn register_orphaned_table(&self, table: &str) -> Result<()> {
        let info = self.db.get_table_info(table).await?;

        if info.columns.is_empty() {
            return Err(CollectionError::database("table has no columns"));
        }

        let columns: Vec<Column> = info
            .columns
            .into_iter()
            .filter(|c| !(c.is_primary_key && c.name.eq_ignore_ascii_case(PRIMARY_KEY_COLUMN)))
            .map(|c| Column {
                column_type: ColumnType::infer_from_native(&c.native_type),
                name: c.name,
                nullable: c.nullable,
                unique: c.is_unique,
                default_value: c.default_value,
            })
            .collect();

        if columns.is_empty() {
            return Err(CollectionError::database(
                "table only has primary key column",
            ));
        }
        if let Some(column) = columns.iter().find(|c| !is_valid_identifier(&c.name)) {
            return Err(CollectionError::invalid_identifier(format!(
                "column '{}' cannot be used as a collection column",
                column.name
            )));
        }

        self.registry.set(Collection::new(table, columns))
    }
}
