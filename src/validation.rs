//! Schema-driven validation of record payloads
//!
//! Every write is checked against the registered collection before any SQL is
//! built. Errors are accumulated rather than short-circuited so one response
//! can report every problem in the payload.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::registry::SchemaRegistry;
use crate::types::{Column, ColumnType, whole_f64_to_i64};

/// Default number of fractional digits accepted for decimal values
pub const DEFAULT_DECIMAL_SCALE: u32 = 2;

/// Upper bound for a configured decimal scale
pub const MAX_DECIMAL_SCALE: u32 = 10;

/// Accepted `strftime` layouts for naive datetimes, after RFC 3339
const DATETIME_LAYOUTS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// How unknown payload keys are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Unknown fields are errors
    #[default]
    Strict,
    /// Unknown fields are ignored
    Permissive,
}

/// Machine-readable reason for a [`ValidationError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    CollectionNotFound,
    UnknownField,
    RequiredField,
    InvalidType,
    InvalidDatetime,
    InvalidDecimal,
    StringTooShort,
    StringTooLong,
    OutOfRange,
    PatternMismatch,
    InvalidEnum,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::CollectionNotFound => "COLLECTION_NOT_FOUND",
            ValidationCode::UnknownField => "UNKNOWN_FIELD",
            ValidationCode::RequiredField => "REQUIRED_FIELD",
            ValidationCode::InvalidType => "INVALID_TYPE",
            ValidationCode::InvalidDatetime => "INVALID_DATETIME",
            ValidationCode::InvalidDecimal => "INVALID_DECIMAL",
            ValidationCode::StringTooShort => "STRING_TOO_SHORT",
            ValidationCode::StringTooLong => "STRING_TOO_LONG",
            ValidationCode::OutOfRange => "OUT_OF_RANGE",
            ValidationCode::PatternMismatch => "PATTERN_MISMATCH",
            ValidationCode::InvalidEnum => "INVALID_ENUM",
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed field check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub code: ValidationCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_type: Option<ColumnType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_value: Option<Value>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code,
            expected_type: None,
            actual_value: None,
        }
    }

    pub fn expected(mut self, column_type: ColumnType) -> Self {
        self.expected_type = Some(column_type);
        self
    }

    pub fn actual(mut self, value: impl Into<Value>) -> Self {
        self.actual_value = Some(value.into());
        self
    }
}

/// Every error found in one payload
///
/// Only ever handed out non-empty: a clean payload validates to `Ok(())`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    /// Whether any error carries `code`
    pub fn has_code(&self, code: ValidationCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    /// Errors reported for one field
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a ValidationError> {
        self.errors.iter().filter(move |e| e.field == field)
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return f.write_str("no validation errors");
        }
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Extra per-column check run after the type check
///
/// Receives the field name and the (non-null) value.
pub type Rule = Arc<dyn Fn(&str, &Value) -> Result<(), ValidationError> + Send + Sync>;

/// Validates payloads against collections in a [`SchemaRegistry`]
#[derive(Clone)]
pub struct Validator {
    registry: Arc<SchemaRegistry>,
    mode: ValidationMode,
    max_decimal_scale: u32,
    rules: HashMap<(String, String), Vec<Rule>>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("mode", &self.mode)
            .field("max_decimal_scale", &self.max_decimal_scale)
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl Validator {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            mode: ValidationMode::default(),
            max_decimal_scale: DEFAULT_DECIMAL_SCALE,
            rules: HashMap::new(),
        }
    }

    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the accepted decimal scale, capped at [`MAX_DECIMAL_SCALE`]
    pub fn with_max_decimal_scale(mut self, scale: u32) -> Self {
        self.max_decimal_scale = scale.min(MAX_DECIMAL_SCALE);
        self
    }

    /// Attach a rule to one column of one collection
    pub fn with_rule(
        mut self,
        collection: impl Into<String>,
        column: impl Into<String>,
        rule: Rule,
    ) -> Self {
        self.rules
            .entry((collection.into(), column.into()))
            .or_default()
            .push(rule);
        self
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Validate a full record, as for an insert
    pub fn validate(
        &self,
        collection: &str,
        data: &Map<String, Value>,
    ) -> Result<(), ValidationErrors> {
        self.validate_record(collection, data, false)
    }

    /// Validate a partial record, as for an update
    ///
    /// Absent keys are not required. A key present with `null` on a column
    /// that cannot be null is still reported.
    pub fn validate_partial(
        &self,
        collection: &str,
        data: &Map<String, Value>,
    ) -> Result<(), ValidationErrors> {
        self.validate_record(collection, data, true)
    }

    fn validate_record(
        &self,
        collection_name: &str,
        data: &Map<String, Value>,
        partial: bool,
    ) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let Some(collection) = self.registry.get(collection_name) else {
            errors.push(ValidationError::new(
                "collection",
                ValidationCode::CollectionNotFound,
                format!("collection '{}' does not exist", collection_name),
            ));
            return Err(errors);
        };

        if self.mode == ValidationMode::Strict {
            for key in data.keys() {
                if !collection.has_column(key) {
                    errors.push(ValidationError::new(
                        key.as_str(),
                        ValidationCode::UnknownField,
                        format!("unknown field '{}'", key),
                    ));
                }
            }
        }

        for column in &collection.columns {
            let value = match data.get(&column.name) {
                None if partial => continue,
                None | Some(Value::Null) => {
                    if column.is_required() {
                        errors.push(required_field(&column.name));
                    }
                    continue;
                }
                Some(value) => value,
            };

            if let Err(e) = self.validate_field(&column.name, value, column) {
                errors.push(e);
            }

            if let Some(rules) = self
                .rules
                .get(&(collection_name.to_string(), column.name.clone()))
            {
                for rule in rules {
                    if let Err(e) = rule(&column.name, value) {
                        errors.push(e);
                    }
                }
            }
        }

        errors.into_result()
    }

    /// Check one value against its column: type first, then format
    pub fn validate_field(
        &self,
        name: &str,
        value: &Value,
        column: &Column,
    ) -> Result<(), ValidationError> {
        if value.is_null() {
            return if column.is_required() {
                Err(required_field(name))
            } else {
                Ok(())
            };
        }

        check_type(name, value, column.column_type)?;

        match (column.column_type, value) {
            (ColumnType::Datetime, Value::String(s)) => check_datetime(name, s),
            (ColumnType::Decimal, Value::String(s)) => {
                check_decimal(name, s, self.max_decimal_scale)
            }
            _ => Ok(()),
        }
    }
}

fn required_field(name: &str) -> ValidationError {
    ValidationError::new(
        name,
        ValidationCode::RequiredField,
        format!("required field '{}' is missing", name),
    )
}

fn invalid_type(name: &str, value: &Value, expected: ColumnType, what: &str) -> ValidationError {
    ValidationError::new(
        name,
        ValidationCode::InvalidType,
        format!("field '{}' must be {}", name, what),
    )
    .expected(expected)
    .actual(value.clone())
}

fn check_type(name: &str, value: &Value, expected: ColumnType) -> Result<(), ValidationError> {
    match expected {
        ColumnType::String if !value.is_string() => {
            Err(invalid_type(name, value, expected, "a string"))
        }
        ColumnType::Integer => match value {
            Value::Number(n) if n.is_i64() => Ok(()),
            Value::Number(n) => match n.as_f64() {
                Some(f) if whole_f64_to_i64(f).is_some() => Ok(()),
                Some(f) if f.fract() == 0.0 => Err(invalid_type(
                    name,
                    value,
                    expected,
                    "an integer within the 64-bit range",
                )),
                _ => Err(invalid_type(name, value, expected, "an integer, got float")),
            },
            _ => Err(invalid_type(name, value, expected, "an integer")),
        },
        ColumnType::Boolean if !value.is_boolean() => {
            Err(invalid_type(name, value, expected, "a boolean"))
        }
        ColumnType::Datetime if !value.is_string() => {
            Err(invalid_type(name, value, expected, "a datetime string"))
        }
        ColumnType::Decimal if !value.is_string() => {
            Err(invalid_type(name, value, expected, "a decimal string"))
        }
        // Any JSON document is acceptable
        _ => Ok(()),
    }
}

fn check_datetime(name: &str, s: &str) -> Result<(), ValidationError> {
    let ok = DateTime::parse_from_rfc3339(s).is_ok()
        || DATETIME_LAYOUTS
            .iter()
            .any(|layout| NaiveDateTime::parse_from_str(s, layout).is_ok())
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok();

    if ok {
        Ok(())
    } else {
        Err(ValidationError::new(
            name,
            ValidationCode::InvalidDatetime,
            format!("field '{}' has invalid datetime format", name),
        )
        .actual(s))
    }
}

fn check_decimal(name: &str, s: &str, max_scale: u32) -> Result<(), ValidationError> {
    static DECIMAL: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("decimal string pattern"));

    let invalid = |reason: String| {
        Err(
            ValidationError::new(name, ValidationCode::InvalidDecimal, reason)
                .actual(s.to_string()),
        )
    };

    let trimmed = s.trim();
    if trimmed.is_empty() {
        return invalid(format!("invalid decimal value for field '{}': empty string", name));
    }
    if trimmed.contains(['e', 'E']) {
        return invalid(format!(
            "invalid decimal value for field '{}': scientific notation not supported",
            name
        ));
    }
    if !DECIMAL.is_match(trimmed) {
        return invalid(format!(
            "invalid decimal value for field '{}': '{}' is not a valid number",
            name, trimmed
        ));
    }

    let scale = trimmed.find('.').map_or(0, |idx| trimmed.len() - idx - 1);
    if scale > max_scale as usize {
        return invalid(format!(
            "decimal precision exceeded for field '{}': maximum scale is {}, got {}",
            name, max_scale, scale
        ));
    }

    if Decimal::from_str(trimmed).is_err() {
        return invalid(format!(
            "invalid decimal value for field '{}': out of range",
            name
        ));
    }

    Ok(())
}

/// Stock [`Rule`]s
pub mod rules {
    use super::*;

    /// String must have at least `min` characters
    pub fn min_length(min: usize) -> Rule {
        Arc::new(move |field, value| match value.as_str() {
            Some(s) if s.chars().count() < min => Err(ValidationError::new(
                field,
                ValidationCode::StringTooShort,
                format!("field '{}' must be at least {} characters", field, min),
            )
            .actual(s.chars().count())),
            _ => Ok(()),
        })
    }

    /// String must have at most `max` characters
    pub fn max_length(max: usize) -> Rule {
        Arc::new(move |field, value| match value.as_str() {
            Some(s) if s.chars().count() > max => Err(ValidationError::new(
                field,
                ValidationCode::StringTooLong,
                format!("field '{}' must be at most {} characters", field, max),
            )
            .actual(s.chars().count())),
            _ => Ok(()),
        })
    }

    /// Number (or numeric string) must lie within `min..=max`
    pub fn range(min: f64, max: f64) -> Rule {
        Arc::new(move |field, value| {
            let n = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            match n {
                Some(n) if n < min || n > max => Err(ValidationError::new(
                    field,
                    ValidationCode::OutOfRange,
                    format!("field '{}' must be between {} and {}", field, min, max),
                )
                .actual(value.clone())),
                _ => Ok(()),
            }
        })
    }

    /// String must match `pattern`
    pub fn pattern(pattern: Regex) -> Rule {
        Arc::new(move |field, value| match value.as_str() {
            Some(s) if !pattern.is_match(s) => Err(ValidationError::new(
                field,
                ValidationCode::PatternMismatch,
                format!("field '{}' does not match the required pattern", field),
            )
            .actual(s)),
            _ => Ok(()),
        })
    }

    /// Value must equal one of `allowed`
    pub fn one_of(allowed: Vec<Value>) -> Rule {
        Arc::new(move |field, value| {
            if allowed.contains(value) {
                Ok(())
            } else {
                Err(ValidationError::new(
                    field,
                    ValidationCode::InvalidEnum,
                    format!("field '{}' must be one of the allowed values", field),
                )
                .actual(value.clone()))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Collection;
    use rstest::rstest;
    use serde_json::json;

    fn registry() -> Arc<SchemaRegistry> {
        let registry = SchemaRegistry::new();
        registry
            .set(Collection::new(
                "users",
                vec![
                    Column::new("name", ColumnType::String).not_null(),
                    Column::new("age", ColumnType::Integer),
                    Column::new("active", ColumnType::Boolean)
                        .not_null()
                        .default("TRUE"),
                    Column::new("born", ColumnType::Datetime),
                    Column::new("balance", ColumnType::Decimal),
                    Column::new("meta", ColumnType::Json),
                ],
            ))
            .unwrap();
        Arc::new(registry)
    }

    fn data(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    // =========================================================================
    // Record validation
    // =========================================================================

    #[test]
    fn test_valid_record() {
        let validator = Validator::new(registry());
        let result = validator.validate(
            "users",
            &data(json!({
                "name": "Ada",
                "age": 36,
                "born": "1815-12-10",
                "balance": "10.50",
                "meta": {"tags": ["x"]}
            })),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_missing_collection_stops_early() {
        let validator = Validator::new(registry());
        let errors = validator
            .validate("missing", &data(json!({"anything": 1})))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors[0].code, ValidationCode::CollectionNotFound);
    }

    #[test]
    fn test_errors_accumulate() {
        let validator = Validator::new(registry());
        let errors = validator
            .validate(
                "users",
                &data(json!({"age": "old", "born": "yesterday", "extra": true})),
            )
            .unwrap_err();

        assert!(errors.has_code(ValidationCode::RequiredField));
        assert!(errors.has_code(ValidationCode::InvalidType));
        assert!(errors.has_code(ValidationCode::InvalidDatetime));
        assert!(errors.has_code(ValidationCode::UnknownField));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_null_on_required_column() {
        let validator = Validator::new(registry());
        let errors = validator
            .validate("users", &data(json!({"name": null})))
            .unwrap_err();
        assert_eq!(errors.for_field("name").count(), 1);
        assert_eq!(errors.errors[0].code, ValidationCode::RequiredField);
    }

    #[test]
    fn test_default_satisfies_required() {
        let validator = Validator::new(registry());
        assert!(validator
            .validate("users", &data(json!({"name": "Ada", "active": null})))
            .is_ok());
    }

    #[test]
    fn test_permissive_ignores_unknown_fields() {
        let validator = Validator::new(registry()).with_mode(ValidationMode::Permissive);
        assert!(validator
            .validate("users", &data(json!({"name": "Ada", "nickname": "A"})))
            .is_ok());

        let strict = Validator::new(registry());
        let errors = strict
            .validate("users", &data(json!({"name": "Ada", "nickname": "A"})))
            .unwrap_err();
        assert_eq!(errors.errors[0].code, ValidationCode::UnknownField);
        assert_eq!(errors.errors[0].field, "nickname");
    }

    #[test]
    fn test_partial_skips_absent_required_fields() {
        let validator = Validator::new(registry());
        assert!(validator
            .validate_partial("users", &data(json!({"age": 40})))
            .is_ok());

        let errors = validator
            .validate_partial("users", &data(json!({"name": null})))
            .unwrap_err();
        assert!(errors.has_code(ValidationCode::RequiredField));
    }

    #[test]
    fn test_error_display_joins_messages() {
        let validator = Validator::new(registry());
        let errors = validator
            .validate("users", &data(json!({"age": 1.5})))
            .unwrap_err();
        let text = errors.to_string();
        assert!(text.contains("name: required field 'name' is missing"));
        assert!(text.contains("; age: field 'age' must be an integer, got float"));
    }

    #[test]
    fn test_error_serialization() {
        let error = invalid_type("age", &json!("x"), ColumnType::Integer, "an integer");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["code"], "INVALID_TYPE");
        assert_eq!(json["expected_type"], "integer");
        assert_eq!(json["actual_value"], "x");
    }

    // =========================================================================
    // Field validation
    // =========================================================================

    #[rstest]
    #[case(json!(25))]
    #[case(json!(25.0))]
    #[case(json!(-3))]
    #[case(json!(i64::MIN))]
    #[case(json!(i64::MAX))]
    fn test_integer_accepts_whole_numbers(#[case] value: Value) {
        let validator = Validator::new(registry());
        let column = Column::new("age", ColumnType::Integer);
        assert!(validator.validate_field("age", &value, &column).is_ok());
    }

    #[rstest]
    #[case(json!(25.5))]
    #[case(json!("25"))]
    #[case(json!(true))]
    #[case(json!(u64::MAX))]
    #[case(json!(1e300))]
    #[case(json!(9.223372036854775808e18))]
    fn test_integer_rejects_others(#[case] value: Value) {
        let validator = Validator::new(registry());
        let column = Column::new("age", ColumnType::Integer);
        let err = validator.validate_field("age", &value, &column).unwrap_err();
        assert_eq!(err.code, ValidationCode::InvalidType);
        assert_eq!(err.expected_type, Some(ColumnType::Integer));
    }

    #[rstest]
    #[case("2024-01-15T10:30:00Z", true)]
    #[case("2024-01-15T10:30:00+02:00", true)]
    #[case("2024-01-15T10:30:00", true)]
    #[case("2024-01-15 10:30:00", true)]
    #[case("2024-01-15", true)]
    #[case("15/01/2024", false)]
    #[case("2024-13-01", false)]
    #[case("", false)]
    fn test_datetime_layouts(#[case] input: &str, #[case] ok: bool) {
        let validator = Validator::new(registry());
        let column = Column::new("born", ColumnType::Datetime);
        let result = validator.validate_field("born", &json!(input), &column);
        assert_eq!(result.is_ok(), ok, "{input}");
        if let Err(e) = result {
            assert_eq!(e.code, ValidationCode::InvalidDatetime);
        }
    }

    #[rstest]
    #[case("10", true)]
    #[case("10.5", true)]
    #[case("-10.55", true)]
    #[case("10.555", false)]
    #[case("1e5", false)]
    #[case("10.", false)]
    #[case(".5", false)]
    #[case("abc", false)]
    #[case("", false)]
    fn test_decimal_strings(#[case] input: &str, #[case] ok: bool) {
        let validator = Validator::new(registry());
        let column = Column::new("balance", ColumnType::Decimal);
        let result = validator.validate_field("balance", &json!(input), &column);
        assert_eq!(result.is_ok(), ok, "{input}");
        if let Err(e) = result {
            assert_eq!(e.code, ValidationCode::InvalidDecimal);
        }
    }

    #[test]
    fn test_decimal_must_be_string() {
        let validator = Validator::new(registry());
        let column = Column::new("balance", ColumnType::Decimal);
        let err = validator
            .validate_field("balance", &json!(10.5), &column)
            .unwrap_err();
        assert_eq!(err.code, ValidationCode::InvalidType);
    }

    #[test]
    fn test_decimal_scale_configurable_and_capped() {
        let column = Column::new("balance", ColumnType::Decimal);
        let wide = Validator::new(registry()).with_max_decimal_scale(4);
        assert!(wide.validate_field("balance", &json!("1.2345"), &column).is_ok());

        let capped = Validator::new(registry()).with_max_decimal_scale(99);
        assert!(capped
            .validate_field("balance", &json!("1.0123456789"), &column)
            .is_ok());
        assert!(capped
            .validate_field("balance", &json!("1.01234567891"), &column)
            .is_err());
    }

    #[test]
    fn test_json_accepts_anything() {
        let validator = Validator::new(registry());
        let column = Column::new("meta", ColumnType::Json);
        for value in [json!({"a": 1}), json!([1, 2]), json!("s"), json!(1.5), json!(false)] {
            assert!(validator.validate_field("meta", &value, &column).is_ok());
        }
    }

    #[test]
    fn test_boolean_and_string_types() {
        let validator = Validator::new(registry());
        let flag = Column::new("active", ColumnType::Boolean);
        let text = Column::new("name", ColumnType::String);
        assert!(validator.validate_field("active", &json!("true"), &flag).is_err());
        assert!(validator.validate_field("name", &json!(5), &text).is_err());
        assert!(validator.validate_field("active", &json!(false), &flag).is_ok());
    }

    // =========================================================================
    // Custom rules
    // =========================================================================

    #[test]
    fn test_custom_rules_run_per_column() {
        let validator = Validator::new(registry())
            .with_rule("users", "name", rules::min_length(3))
            .with_rule("users", "name", rules::max_length(5))
            .with_rule("users", "age", rules::range(0.0, 150.0));

        let errors = validator
            .validate("users", &data(json!({"name": "Al", "age": 200})))
            .unwrap_err();
        assert!(errors.has_code(ValidationCode::StringTooShort));
        assert!(errors.has_code(ValidationCode::OutOfRange));

        let errors = validator
            .validate("users", &data(json!({"name": "Alexander"})))
            .unwrap_err();
        assert!(errors.has_code(ValidationCode::StringTooLong));

        assert!(validator
            .validate("users", &data(json!({"name": "Alex", "age": 30})))
            .is_ok());
    }

    #[test]
    fn test_pattern_and_one_of_rules() {
        let pattern = rules::pattern(Regex::new(r"^[A-Z]{3}-\d+$").unwrap());
        assert!(pattern("sku", &json!("ABC-12")).is_ok());
        assert_eq!(
            pattern("sku", &json!("abc")).unwrap_err().code,
            ValidationCode::PatternMismatch
        );

        let one_of = rules::one_of(vec![json!("draft"), json!("published")]);
        assert!(one_of("status", &json!("draft")).is_ok());
        assert_eq!(
            one_of("status", &json!("deleted")).unwrap_err().code,
            ValidationCode::InvalidEnum
        );
    }

    #[test]
    fn test_rules_ignore_other_types() {
        let rule = rules::min_length(10);
        assert!(rule("name", &json!(5)).is_ok());
    }
}
