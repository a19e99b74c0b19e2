//! Configuration schema: the fixed table of known fields and their validators.
//!
//! Field names are `/`-delimited paths, as used by the host's settings API.
//! A `*` segment in a field name matches exactly one non-empty segment of a
//! key, so per-repository settings are declared once:
//!
//! ```text
//! app/plugin_repositories/*/url   matches   app/plugin_repositories/QGIS Official/url
//! ```
//!
//! Values are `serde_json::Value`, which already restricts them to JSON
//! scalars, strings, arrays and objects. Each field adds a [`ValueRule`] on
//! top of that.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use crate::error::{ConfigError, Result};

/// In-memory configuration document: field name → value, sorted by key.
pub type ConfigDocument = BTreeMap<String, Value>;

/// Delimiter between segments of a field name.
pub const DELIMITER: char = '/';

/// Segment that matches any single non-empty key segment.
pub const WILDCARD: &str = "*";

// ─────────────────────────────────────────────
// Plugin manager keys
// ─────────────────────────────────────────────

pub const KEY_ALLOW_DEPRECATED: &str = "app/plugin_installer/allowDeprecated";
pub const KEY_ALLOW_EXPERIMENTAL: &str = "app/plugin_installer/allowExperimental";

/// Root of the plugin manager's own repositories: `<root>/<backend>/<repo id>/<key>`.
pub const GROUP_MANAGER_REPOS: &str = "app/pluginmanager/repositories";
/// Root of the host's legacy repository list: `<root>/<repo id>/<key>`.
pub const GROUP_LEGACY_REPOS: &str = "app/plugin_repositories";

pub const KEY_CACHE: &str = "cache";

/// Repository backends known to the plugin manager.
pub const REPO_BACKENDS: &[&str] = &["qgis", "cpp", "pip"];

pub const REPO_DEFAULT_URL: &str = "https://plugins.qgis.org/plugins/plugins.xml";

// ─────────────────────────────────────────────
// Value rules
// ─────────────────────────────────────────────

/// Validator attached to a schema field.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueRule {
    /// Any JSON value.
    Any,
    Bool,
    /// JSON integer within optional inclusive bounds.
    Integer { min: Option<i64>, max: Option<i64> },
    /// Any JSON number within optional inclusive bounds.
    Float { min: Option<f64>, max: Option<f64> },
    /// String, optionally restricted to a fixed set and/or required non-empty.
    Text {
        one_of: Option<Vec<String>>,
        non_empty: bool,
    },
    /// Array whose every item satisfies the inner rule.
    List(Box<ValueRule>),
    /// Object whose every value satisfies the inner rule.
    Map(Box<ValueRule>),
    /// `null` or a value satisfying the inner rule.
    Nullable(Box<ValueRule>),
}

impl ValueRule {
    pub fn text() -> Self {
        ValueRule::Text {
            one_of: None,
            non_empty: false,
        }
    }

    pub fn non_empty_text() -> Self {
        ValueRule::Text {
            one_of: None,
            non_empty: true,
        }
    }

    pub fn one_of(choices: &[&str]) -> Self {
        ValueRule::Text {
            one_of: Some(choices.iter().map(|c| c.to_string()).collect()),
            non_empty: false,
        }
    }

    pub fn integer() -> Self {
        ValueRule::Integer {
            min: None,
            max: None,
        }
    }

    pub fn integer_range(min: i64, max: i64) -> Self {
        ValueRule::Integer {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn float_range(min: f64, max: f64) -> Self {
        ValueRule::Float {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn list(item: ValueRule) -> Self {
        ValueRule::List(Box::new(item))
    }

    pub fn map(value: ValueRule) -> Self {
        ValueRule::Map(Box::new(value))
    }

    pub fn nullable(inner: ValueRule) -> Self {
        ValueRule::Nullable(Box::new(inner))
    }

    /// Check `value` against this rule.
    ///
    /// On failure returns a reason naming the offending element, e.g.
    /// `expected a boolean, found string at [2]`.
    pub fn check(&self, value: &Value) -> std::result::Result<(), String> {
        self.check_at(value, &mut String::new())
    }

    fn check_at(&self, value: &Value, at: &mut String) -> std::result::Result<(), String> {
        match self {
            ValueRule::Any => Ok(()),
            ValueRule::Bool => expect(value.is_boolean(), "a boolean", value, at),
            ValueRule::Integer { min, max } => {
                if let Some(n) = value.as_i64() {
                    check_bounds(n, *min, *max, at)
                } else if value.is_u64() {
                    // Beyond i64::MAX: only acceptable when unbounded above.
                    match max {
                        Some(max) => Err(located(format!("{value} is greater than {max}"), at)),
                        None => Ok(()),
                    }
                } else {
                    Err(mismatch("an integer", value, at))
                }
            }
            ValueRule::Float { min, max } => match value.as_f64() {
                Some(n) => check_bounds(n, *min, *max, at),
                None => Err(mismatch("a number", value, at)),
            },
            ValueRule::Text { one_of, non_empty } => {
                let Some(text) = value.as_str() else {
                    return Err(mismatch("a string", value, at));
                };
                if *non_empty && text.is_empty() {
                    return Err(located("must not be empty".to_string(), at));
                }
                if let Some(choices) = one_of {
                    if !choices.iter().any(|c| c == text) {
                        return Err(located(
                            format!("\"{text}\" is not one of: {}", choices.join(", ")),
                            at,
                        ));
                    }
                }
                Ok(())
            }
            ValueRule::List(item) => {
                let Some(items) = value.as_array() else {
                    return Err(mismatch("a list", value, at));
                };
                let base = at.len();
                for (index, entry) in items.iter().enumerate() {
                    at.push_str(&format!("[{index}]"));
                    item.check_at(entry, at)?;
                    at.truncate(base);
                }
                Ok(())
            }
            ValueRule::Map(inner) => {
                let Some(entries) = value.as_object() else {
                    return Err(mismatch("an object", value, at));
                };
                let base = at.len();
                for (key, entry) in entries {
                    at.push('.');
                    at.push_str(key);
                    inner.check_at(entry, at)?;
                    at.truncate(base);
                }
                Ok(())
            }
            ValueRule::Nullable(inner) => {
                if value.is_null() {
                    Ok(())
                } else {
                    inner.check_at(value, at)
                }
            }
        }
    }

    /// Short human-readable description, shown by `qgist-config fields`.
    pub fn describe(&self) -> String {
        match self {
            ValueRule::Any => "any".to_string(),
            ValueRule::Bool => "bool".to_string(),
            ValueRule::Integer { min, max } => format!("integer{}", describe_bounds(min, max)),
            ValueRule::Float { min, max } => format!("number{}", describe_bounds(min, max)),
            ValueRule::Text {
                one_of: Some(choices),
                ..
            } => format!("one of [{}]", choices.join(", ")),
            ValueRule::Text { non_empty: true, .. } => "non-empty string".to_string(),
            ValueRule::Text { .. } => "string".to_string(),
            ValueRule::List(item) => format!("list of {}", item.describe()),
            ValueRule::Map(value) => format!("map of {}", value.describe()),
            ValueRule::Nullable(inner) => format!("{} or null", inner.describe()),
        }
    }
}

fn expect(ok: bool, expected: &str, value: &Value, at: &str) -> std::result::Result<(), String> {
    if ok {
        Ok(())
    } else {
        Err(mismatch(expected, value, at))
    }
}

fn check_bounds<T>(n: T, min: Option<T>, max: Option<T>, at: &str) -> std::result::Result<(), String>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if let Some(min) = min {
        if n < min {
            return Err(located(format!("{n} is less than {min}"), at));
        }
    }
    if let Some(max) = max {
        if n > max {
            return Err(located(format!("{n} is greater than {max}"), at));
        }
    }
    Ok(())
}

fn describe_bounds<T: std::fmt::Display>(min: &Option<T>, max: &Option<T>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!(" in {min}..={max}"),
        (Some(min), None) => format!(" >= {min}"),
        (None, Some(max)) => format!(" <= {max}"),
        (None, None) => String::new(),
    }
}

fn mismatch(expected: &str, value: &Value, at: &str) -> String {
    located(format!("expected {expected}, found {}", json_type_name(value)), at)
}

fn located(reason: String, at: &str) -> String {
    if at.is_empty() {
        reason
    } else {
        format!("{reason} at {at}")
    }
}

/// Name of a JSON value's type, for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

// ─────────────────────────────────────────────
// Fields
// ─────────────────────────────────────────────

/// A single schema entry.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigField {
    name: String,
    default: Option<Value>,
    rule: ValueRule,
    description: String,
}

impl ConfigField {
    pub fn new(name: impl Into<String>, rule: ValueRule) -> Self {
        Self {
            name: name.into(),
            default: None,
            rule,
            description: String::new(),
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn rule(&self) -> &ValueRule {
        &self.rule
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether the name contains `*` segments.
    pub fn is_pattern(&self) -> bool {
        self.name.split(DELIMITER).any(|segment| segment == WILDCARD)
    }

    /// Whether `key` is covered by this field.
    pub fn matches(&self, key: &str) -> bool {
        let mut pattern = self.name.split(DELIMITER);
        let mut segments = key.split(DELIMITER);
        loop {
            match (pattern.next(), segments.next()) {
                (None, None) => return true,
                (Some(WILDCARD), Some(segment)) if !segment.is_empty() => {}
                (Some(expected), Some(segment)) if expected == segment => {}
                _ => return false,
            }
        }
    }
}

// ─────────────────────────────────────────────
// Schema
// ─────────────────────────────────────────────

/// Fixed set of known fields. Immutable once built.
#[derive(Clone, Debug)]
pub struct Schema {
    fields: Vec<ConfigField>,
}

impl Schema {
    /// Build a schema, rejecting duplicate or malformed names and defaults
    /// that fail their own validator.
    pub fn new(fields: Vec<ConfigField>) -> Result<Self> {
        let mut seen = HashSet::new();
        for field in &fields {
            let name = field.name();
            if name.is_empty() || name.split(DELIMITER).any(str::is_empty) {
                return Err(schema_error(name, "field name must not contain empty segments"));
            }
            if !seen.insert(name.to_string()) {
                return Err(schema_error(name, "field is declared twice"));
            }
            match (&field.default, field.is_pattern()) {
                (Some(_), true) => {
                    return Err(schema_error(name, "pattern fields cannot carry a default"));
                }
                (Some(default), false) => {
                    if let Err(reason) = field.rule.check(default) {
                        return Err(schema_error(name, format!("default is invalid: {reason}")));
                    }
                }
                (None, _) => {}
            }
        }
        Ok(Self { fields })
    }

    /// Schema used by the plugin manager.
    pub fn plugin_manager() -> Self {
        let bool_text = || ValueRule::one_of(&["true", "false"]);
        let manager = |key: &str| format!("{GROUP_MANAGER_REPOS}/*/*/{key}");
        let legacy = |key: &str| format!("{GROUP_LEGACY_REPOS}/*/{key}");

        let fields = vec![
            ConfigField::new(KEY_ALLOW_DEPRECATED, ValueRule::Bool)
                .with_default(Value::Bool(false))
                .describe("Show deprecated plugins"),
            ConfigField::new(KEY_ALLOW_EXPERIMENTAL, ValueRule::Bool)
                .with_default(Value::Bool(false))
                .describe("Show experimental plugins"),
            ConfigField::new(manager("name"), ValueRule::non_empty_text())
                .describe("Repository display name"),
            ConfigField::new(manager("enabled"), bool_text())
                .describe("Whether the repository is active"),
            ConfigField::new(manager("protected"), bool_text())
                .describe("Whether the repository may be removed"),
            ConfigField::new(manager("repo_type"), ValueRule::one_of(REPO_BACKENDS))
                .describe("Repository backend"),
            ConfigField::new(manager(KEY_CACHE), ValueRule::text())
                .describe("Packed plugin release cache"),
            ConfigField::new(legacy("url"), ValueRule::non_empty_text())
                .describe("Repository URL"),
            ConfigField::new(legacy("authcfg"), ValueRule::text())
                .describe("Authentication configuration id"),
            ConfigField::new(legacy("valid"), bool_text())
                .describe("Whether the repository responded with a valid index"),
            ConfigField::new(legacy("enabled"), bool_text())
                .describe("Whether the repository is active"),
        ];

        // Every name and default above is fixed and valid.
        Self { fields }
    }

    pub fn fields(&self) -> impl Iterator<Item = &ConfigField> {
        self.fields.iter()
    }

    /// Field covering `key`; exact names win over patterns.
    pub fn field(&self, key: &str) -> Option<&ConfigField> {
        self.fields
            .iter()
            .find(|f| !f.is_pattern() && f.name() == key)
            .or_else(|| self.fields.iter().find(|f| f.is_pattern() && f.matches(key)))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.field(key).is_some()
    }

    /// Document holding the default of every exact field.
    pub fn defaults(&self) -> ConfigDocument {
        self.fields
            .iter()
            .filter_map(|f| f.default.as_ref().map(|v| (f.name.clone(), v.clone())))
            .collect()
    }

    /// Check a single key/value pair.
    pub fn validate_entry(&self, key: &str, value: &Value) -> Result<()> {
        let field = self
            .field(key)
            .ok_or_else(|| ConfigError::unknown_field(key))?;
        field
            .rule
            .check(value)
            .map_err(|reason| ConfigError::validation(key, reason))
    }

    /// Check every entry.
    ///
    /// Unknown keys are reported before invalid values, each in key order.
    pub fn validate_document(&self, document: &ConfigDocument) -> Result<()> {
        if let Some(key) = document.keys().find(|key| !self.contains(key)) {
            return Err(ConfigError::unknown_field(key));
        }
        for (key, value) in document {
            self.validate_entry(key, value)?;
        }
        Ok(())
    }
}

fn schema_error(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Schema {
        key: Some(key.to_string()),
        reason: reason.into(),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bool_rule() {
        assert!(ValueRule::Bool.check(&json!(true)).is_ok());
        let err = ValueRule::Bool.check(&json!("true")).unwrap_err();
        assert_eq!(err, "expected a boolean, found string");
    }

    #[test]
    fn test_integer_bounds() {
        let rule = ValueRule::integer_range(1, 10);
        assert!(rule.check(&json!(1)).is_ok());
        assert!(rule.check(&json!(10)).is_ok());
        assert_eq!(rule.check(&json!(11)).unwrap_err(), "11 is greater than 10");
        assert_eq!(rule.check(&json!(0)).unwrap_err(), "0 is less than 1");
        assert!(rule.check(&json!(2.5)).is_err());
        assert!(ValueRule::integer().check(&json!(u64::MAX)).is_ok());
        assert!(rule.check(&json!(u64::MAX)).is_err());
    }

    #[test]
    fn test_float_accepts_integers() {
        let rule = ValueRule::float_range(0.0, 2.0);
        assert!(rule.check(&json!(1)).is_ok());
        assert!(rule.check(&json!(0.7)).is_ok());
        assert!(rule.check(&json!(2.5)).is_err());
        assert!(rule.check(&json!(null)).is_err());
    }

    #[test]
    fn test_text_rules() {
        assert!(ValueRule::text().check(&json!("")).is_ok());
        assert_eq!(
            ValueRule::non_empty_text().check(&json!("")).unwrap_err(),
            "must not be empty"
        );
        let rule = ValueRule::one_of(&["qgis", "cpp"]);
        assert!(rule.check(&json!("cpp")).is_ok());
        assert_eq!(
            rule.check(&json!("pip")).unwrap_err(),
            "\"pip\" is not one of: qgis, cpp"
        );
    }

    #[test]
    fn test_nested_error_location() {
        let rule = ValueRule::list(ValueRule::map(ValueRule::Bool));
        let value = json!([{"a": true}, {"b": false, "c": 3}]);
        assert_eq!(
            rule.check(&value).unwrap_err(),
            "expected a boolean, found number at [1].c"
        );
    }

    #[test]
    fn test_nullable() {
        let rule = ValueRule::nullable(ValueRule::integer());
        assert!(rule.check(&json!(null)).is_ok());
        assert!(rule.check(&json!(3)).is_ok());
        assert!(rule.check(&json!("3")).is_err());
    }

    #[test]
    fn test_describe() {
        assert_eq!(ValueRule::integer_range(0, 5).describe(), "integer in 0..=5");
        assert_eq!(
            ValueRule::list(ValueRule::nullable(ValueRule::Bool)).describe(),
            "list of bool or null"
        );
    }

    #[test]
    fn test_pattern_matching() {
        let field = ConfigField::new("app/repos/*/url", ValueRule::text());
        assert!(field.is_pattern());
        assert!(field.matches("app/repos/official/url"));
        assert!(!field.matches("app/repos//url"));
        assert!(!field.matches("app/repos/official/url/extra"));
        assert!(!field.matches("app/repos/url"));
    }

    #[test]
    fn test_exact_field_wins_over_pattern() {
        let schema = Schema::new(vec![
            ConfigField::new("a/*", ValueRule::text()),
            ConfigField::new("a/b", ValueRule::Bool).with_default(json!(true)),
        ])
        .unwrap();
        assert_eq!(schema.field("a/b").unwrap().rule(), &ValueRule::Bool);
        assert_eq!(schema.field("a/c").unwrap().name(), "a/*");
        assert!(schema.field("b").is_none());
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        let err = Schema::new(vec![
            ConfigField::new("x", ValueRule::Bool),
            ConfigField::new("x", ValueRule::text()),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Schema { .. }));
    }

    #[test]
    fn test_schema_rejects_invalid_default() {
        let err = Schema::new(vec![
            ConfigField::new("x", ValueRule::Bool).with_default(json!("yes")),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("default is invalid"));
    }

    #[test]
    fn test_schema_rejects_pattern_default() {
        let result = Schema::new(vec![
            ConfigField::new("x/*", ValueRule::Bool).with_default(json!(true)),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_schema_rejects_empty_segments() {
        assert!(Schema::new(vec![ConfigField::new("a//b", ValueRule::Any)]).is_err());
        assert!(Schema::new(vec![ConfigField::new("", ValueRule::Any)]).is_err());
    }

    #[test]
    fn test_validate_entry() {
        let schema = Schema::plugin_manager();
        assert!(schema.validate_entry(KEY_ALLOW_DEPRECATED, &json!(true)).is_ok());
        assert!(matches!(
            schema.validate_entry(KEY_ALLOW_DEPRECATED, &json!(1)),
            Err(ConfigError::Validation { .. })
        ));
        assert!(matches!(
            schema.validate_entry("app/unknown", &json!(1)),
            Err(ConfigError::Schema { .. })
        ));
    }

    #[test]
    fn test_unknown_key_reported_before_invalid_value() {
        let schema = Schema::new(vec![ConfigField::new("a/n", ValueRule::integer())]).unwrap();
        let document: ConfigDocument = [
            ("a/n".to_string(), json!("bad")),
            ("zz/unknown".to_string(), json!(1)),
        ]
        .into_iter()
        .collect();
        match schema.validate_document(&document) {
            Err(ConfigError::Schema { key, .. }) => assert_eq!(key.as_deref(), Some("zz/unknown")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_plugin_manager_schema_is_consistent() {
        let schema = Schema::plugin_manager();
        let rebuilt = Schema::new(schema.fields().cloned().collect());
        assert!(rebuilt.is_ok());

        let defaults = schema.defaults();
        assert_eq!(defaults.len(), 2);
        assert_eq!(defaults[KEY_ALLOW_EXPERIMENTAL], json!(false));
        assert!(schema.validate_document(&defaults).is_ok());

        let repo_key = format!("{GROUP_MANAGER_REPOS}/qgis/official/repo_type");
        assert!(schema.validate_entry(&repo_key, &json!("qgis")).is_ok());
        assert!(schema.validate_entry(&repo_key, &json!("svn")).is_err());
        let url_key = format!("{GROUP_LEGACY_REPOS}/official/url");
        assert!(schema.validate_entry(&url_key, &json!(REPO_DEFAULT_URL)).is_ok());
    }
}
