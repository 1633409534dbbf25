//! Configuration for CollectionStore
//!
//! Provides a builder pattern for configuring the store. Every type here also
//! deserializes with defaults, so a partial config file is enough.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::validation::{DEFAULT_DECIMAL_SCALE, MAX_DECIMAL_SCALE, ValidationMode};

/// Request-size limits applied when parsing filters, sorting and paging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum number of `field[op]=value` filters per request (default: 20)
    pub max_filters: usize,
    /// Maximum number of sort keys per request (default: 5)
    pub max_sort_fields: usize,
    /// Page size when no limit is given (default: 15)
    pub default_page_size: u64,
    /// Largest accepted page size (default: 200)
    pub max_page_size: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_filters: 20,
            max_sort_fields: 5,
            default_page_size: 15,
            max_page_size: 200,
        }
    }
}

/// Consistency check and repair policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Repair drift found by a check (default: true)
    pub auto_repair: bool,
    /// Drop tables with no registry entry instead of registering them (default: false)
    pub drop_orphans: bool,
    /// Deadline for one check, in seconds when deserialized (default: 5s)
    #[serde(rename = "check_timeout_secs", with = "duration_secs")]
    pub check_timeout: Duration,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            auto_repair: true,
            drop_orphans: false,
            check_timeout: Duration::from_secs(5),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Configuration for the collection store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Strict rejects unknown payload fields (default: strict)
    pub validation_mode: ValidationMode,
    /// Fractional digits accepted for decimal values (default: 2, at most 10)
    pub max_decimal_scale: u32,
    /// Tables starting with this prefix are never treated as collections (default: "__")
    pub system_table_prefix: String,
    /// Additional table names that are never treated as collections
    pub system_tables: Vec<String>,
    pub limits: Limits,
    pub recovery: RecoveryConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfigBuilder::new().build()
    }
}

impl StoreConfig {
    /// Create a new configuration builder
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::new()
    }

    /// Whether `table` is reserved for the system rather than a collection
    ///
    /// SQLite's own bookkeeping tables (`sqlite_*`) always count.
    pub fn is_system_table(&self, table: &str) -> bool {
        (!self.system_table_prefix.is_empty() && table.starts_with(&self.system_table_prefix))
            || table.starts_with("sqlite_")
            || self.system_tables.iter().any(|t| t == table)
    }
}

/// Builder for StoreConfig
#[derive(Debug)]
pub struct StoreConfigBuilder {
    validation_mode: ValidationMode,
    max_decimal_scale: u32,
    system_table_prefix: String,
    system_tables: Vec<String>,
    limits: Limits,
    recovery: RecoveryConfig,
}

impl Default for StoreConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreConfigBuilder {
    pub fn new() -> Self {
        Self {
            validation_mode: ValidationMode::Strict,
            max_decimal_scale: DEFAULT_DECIMAL_SCALE,
            system_table_prefix: "__".to_string(),
            system_tables: Vec::new(),
            limits: Limits::default(),
            recovery: RecoveryConfig::default(),
        }
    }

    /// Set the validation mode (default: strict)
    pub fn validation_mode(mut self, mode: ValidationMode) -> Self {
        self.validation_mode = mode;
        self
    }

    /// Set the accepted decimal scale (default: 2)
    pub fn max_decimal_scale(mut self, scale: u32) -> Self {
        self.max_decimal_scale = scale;
        self
    }

    /// Set the system table prefix (default: "__")
    pub fn system_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.system_table_prefix = prefix.into();
        self
    }

    /// Exclude one more table from collection handling
    pub fn system_table(mut self, name: impl Into<String>) -> Self {
        self.system_tables.push(name.into());
        self
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn recovery(mut self, recovery: RecoveryConfig) -> Self {
        self.recovery = recovery;
        self
    }

    /// Enable or disable auto-repair (default: true)
    pub fn auto_repair(mut self, enabled: bool) -> Self {
        self.recovery.auto_repair = enabled;
        self
    }

    /// Enable or disable dropping orphaned tables (default: false)
    pub fn drop_orphans(mut self, enabled: bool) -> Self {
        self.recovery.drop_orphans = enabled;
        self
    }

    /// Set the consistency check deadline (default: 5s)
    pub fn check_timeout(mut self, timeout: Duration) -> Self {
        self.recovery.check_timeout = timeout;
        self
    }

    /// Build the configuration
    ///
    /// The decimal scale is capped and the default page size never exceeds
    /// the maximum page size.
    pub fn build(self) -> StoreConfig {
        let mut limits = self.limits;
        if limits.max_page_size == 0 {
            limits.max_page_size = Limits::default().max_page_size;
        }
        if limits.default_page_size == 0 || limits.default_page_size > limits.max_page_size {
            limits.default_page_size = limits.max_page_size.min(Limits::default().default_page_size);
        }

        StoreConfig {
            validation_mode: self.validation_mode,
            max_decimal_scale: self.max_decimal_scale.min(MAX_DECIMAL_SCALE),
            system_table_prefix: self.system_table_prefix,
            system_tables: self.system_tables,
            limits,
            recovery: self.recovery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Default Tests
    // =========================================================================

    #[test]
    fn test_default_config() {
        let config = StoreConfig::builder().build();

        assert_eq!(config.validation_mode, ValidationMode::Strict);
        assert_eq!(config.max_decimal_scale, 2);
        assert_eq!(config.system_table_prefix, "__");
        assert!(config.system_tables.is_empty());
        assert_eq!(config.limits, Limits::default());
        assert_eq!(config, StoreConfig::default());
    }

    #[test]
    fn test_limits_default() {
        let limits = Limits::default();
        assert_eq!(limits.max_filters, 20);
        assert_eq!(limits.max_sort_fields, 5);
        assert_eq!(limits.default_page_size, 15);
        assert_eq!(limits.max_page_size, 200);
    }

    #[test]
    fn test_recovery_default() {
        let recovery = RecoveryConfig::default();
        assert!(recovery.auto_repair);
        assert!(!recovery.drop_orphans);
        assert_eq!(recovery.check_timeout, Duration::from_secs(5));
    }

    // =========================================================================
    // Builder Tests
    // =========================================================================

    #[test]
    fn test_full_custom_config() {
        let config = StoreConfig::builder()
            .validation_mode(ValidationMode::Permissive)
            .max_decimal_scale(4)
            .system_table_prefix("sys_")
            .system_table("schema_migrations")
            .auto_repair(false)
            .drop_orphans(true)
            .check_timeout(Duration::from_millis(250))
            .build();

        assert_eq!(config.validation_mode, ValidationMode::Permissive);
        assert_eq!(config.max_decimal_scale, 4);
        assert_eq!(config.system_table_prefix, "sys_");
        assert_eq!(config.system_tables, vec!["schema_migrations"]);
        assert!(!config.recovery.auto_repair);
        assert!(config.recovery.drop_orphans);
        assert_eq!(config.recovery.check_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_decimal_scale_is_capped() {
        let config = StoreConfig::builder().max_decimal_scale(30).build();
        assert_eq!(config.max_decimal_scale, MAX_DECIMAL_SCALE);
    }

    #[test]
    fn test_default_page_size_never_exceeds_max() {
        let config = StoreConfig::builder()
            .limits(Limits {
                default_page_size: 50,
                max_page_size: 10,
                ..Limits::default()
            })
            .build();
        assert_eq!(config.limits.default_page_size, 10);
        assert_eq!(config.limits.max_page_size, 10);
    }

    #[test]
    fn test_zero_page_sizes_fall_back_to_defaults() {
        let config = StoreConfig::builder()
            .limits(Limits {
                default_page_size: 0,
                max_page_size: 0,
                ..Limits::default()
            })
            .build();
        assert_eq!(config.limits.default_page_size, 15);
        assert_eq!(config.limits.max_page_size, 200);
    }

    // =========================================================================
    // System Table Tests
    // =========================================================================

    #[test]
    fn test_is_system_table() {
        let config = StoreConfig::builder().system_table("migrations").build();

        assert!(config.is_system_table("__registry"));
        assert!(config.is_system_table("sqlite_sequence"));
        assert!(config.is_system_table("migrations"));
        assert!(!config.is_system_table("products"));
    }

    #[test]
    fn test_empty_prefix_matches_nothing() {
        let config = StoreConfig::builder().system_table_prefix("").build();
        assert!(!config.is_system_table("products"));
        assert!(!config.is_system_table("__x"));
    }

    // =========================================================================
    // Deserialization Tests
    // =========================================================================

    #[test]
    fn test_deserialize_partial_config() {
        let config: StoreConfig = serde_json::from_str(
            r#"{
                "validation_mode": "permissive",
                "limits": {"max_filters": 3},
                "recovery": {"drop_orphans": true, "check_timeout_secs": 30}
            }"#,
        )
        .unwrap();

        assert_eq!(config.validation_mode, ValidationMode::Permissive);
        assert_eq!(config.limits.max_filters, 3);
        assert_eq!(config.limits.max_page_size, 200);
        assert!(config.recovery.auto_repair);
        assert!(config.recovery.drop_orphans);
        assert_eq!(config.recovery.check_timeout, Duration::from_secs(30));
        assert_eq!(config.system_table_prefix, "__");
    }

    #[test]
    fn test_deserialize_empty_object() {
        let config: StoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, StoreConfig::default());
    }

    // =========================================================================
    // Debug / Clone Tests
    // =========================================================================

    #[test]
    fn test_builder_debug() {
        let debug_str = format!("{:?}", StoreConfig::builder());
        assert!(debug_str.contains("StoreConfigBuilder"));
    }

    #[test]
    fn test_config_clone() {
        let config1 = StoreConfig::builder().system_table("x").build();
        let config2 = config1.clone();
        assert_eq!(config1, config2);
    }
}
