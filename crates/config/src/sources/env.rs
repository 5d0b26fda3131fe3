//! Environment variable configuration source

use std::collections::BTreeMap;
use std::ffi::OsString;

use serde_json::{Map, Value};

use crate::core::{Partial, Source};

/// How environment variables are selected and typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvOptions {
    /// Only variables starting with this prefix. A trailing separator is
    /// optional: `APP` and `APP_` select the same variables.
    pub prefix: Option<String>,

    /// Separator for nested keys
    pub separator: String,

    /// Turn comma-separated values into lists
    pub split_lists: bool,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self {
            prefix: None,
            separator: "_".to_string(),
            split_lists: true,
        }
    }
}

impl EnvOptions {
    /// Select variables starting with `prefix`
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set separator for nested keys
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Enable or disable comma list splitting
    pub fn with_split_lists(mut self, split_lists: bool) -> Self {
        self.split_lists = split_lists;
        self
    }
}

/// Snapshot of environment variables taken at construction.
///
/// Variable names are stripped of the prefix, split on the separator and
/// lowercased into nested keys: with prefix `APP` and separator `_`,
/// `APP_SERVER_PORT=8080` becomes `server.port = 8080`.
///
/// Values are typed: `true`/`false`, integers, floats, JSON objects and
/// arrays, comma-separated lists (unless disabled) and strings. A value in
/// double quotes is always a string, so `"8080"` stays text.
#[derive(Debug, Clone)]
pub struct EnvSource {
    options: EnvOptions,
    tree: Partial,
}

impl EnvSource {
    /// Snapshot every environment variable
    pub fn new() -> Self {
        Self::with_options(EnvOptions::default())
    }

    /// Snapshot the environment variables starting with `prefix`
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::with_options(EnvOptions::default().with_prefix(prefix))
    }

    /// Snapshot the process environment with `options`.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn with_options(options: EnvOptions) -> Self {
        Self::from_vars_with_options(options, utf8_vars(std::env::vars_os()))
    }

    /// Build a source from an explicit set of variables
    pub fn from_vars<I>(prefix: Option<String>, separator: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let options = EnvOptions {
            prefix,
            separator: separator.into(),
            ..EnvOptions::default()
        };
        Self::from_vars_with_options(options, vars)
    }

    /// Build a source from an explicit set of variables with `options`
    pub fn from_vars_with_options<I>(mut options: EnvOptions, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        if options.separator.is_empty() {
            options.separator = "_".to_string();
        }
        let separator = options.separator.as_str();

        // Sorted so conflicting names resolve the same way on every run
        let filtered: BTreeMap<String, String> = vars
            .into_iter()
            .filter_map(|(key, value)| {
                strip_prefix(&key, options.prefix.as_deref(), separator).map(|k| (k, value))
            })
            .collect();

        let mut root = Map::new();
        for (key, value) in filtered {
            if is_sensitive_key(&key) {
                tracing::trace!(key = %key, "Loading env config: [REDACTED]");
            } else {
                tracing::trace!(key = %key, value = %value, "Loading env config");
            }

            let parts: Vec<String> = key
                .split(separator)
                .filter(|part| !part.is_empty())
                .map(str::to_lowercase)
                .collect();
            insert_nested(&mut root, &parts, parse_env_value(&value, options.split_lists));
        }

        tracing::debug!(
            prefix = options.prefix.as_deref().unwrap_or(""),
            keys = root.len(),
            "Loaded environment configuration"
        );

        Self {
            options,
            tree: Partial::from(root),
        }
    }

    /// Prefix variables were filtered by
    pub fn prefix(&self) -> Option<&str> {
        self.options.prefix.as_deref()
    }

    /// Separator for nested keys
    pub fn separator(&self) -> &str {
        &self.options.separator
    }

    /// Whether comma-separated values were split into lists
    pub fn split_lists(&self) -> bool {
        self.options.split_lists
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Source for EnvSource {
    fn has(&self, path: &str) -> bool {
        self.tree.has(path)
    }

    fn get(&self, path: &str) -> Option<Value> {
        self.tree.get(path).cloned()
    }
}

/// Keep the variables that are valid UTF-8, warning about the rest
fn utf8_vars<I>(vars: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (key, _) => {
                let key = key.unwrap_or_else(|raw| raw.to_string_lossy().into_owned());
                tracing::warn!(key = %key, "Skipping environment variable that is not valid UTF-8");
                None
            }
        })
        .collect()
}

fn strip_prefix(key: &str, prefix: Option<&str>, separator: &str) -> Option<String> {
    let stripped = match prefix {
        Some(prefix) => {
            let prefix = prefix.trim_end_matches(separator).to_ascii_uppercase();
            let upper = key.to_ascii_uppercase();
            let rest = upper.strip_prefix(&prefix)?;
            // The prefix must end on a separator boundary
            if !prefix.is_empty() && !rest.is_empty() && !rest.starts_with(separator) {
                return None;
            }
            key[key.len() - rest.len()..]
                .trim_start_matches(separator)
                .to_string()
        }
        None => key.to_string(),
    };
    (!stripped.is_empty()).then_some(stripped)
}

fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_lowercase();
    ["password", "secret", "token", "api_key", "private", "credential"]
        .iter()
        .any(|marker| key.contains(marker))
}

fn insert_nested(map: &mut Map<String, Value>, parts: &[String], value: Value) {
    let Some((first, rest)) = parts.split_first() else {
        return;
    };
    if rest.is_empty() {
        map.insert(first.clone(), value);
        return;
    }

    let nested = map
        .entry(first.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    if !nested.is_object() {
        *nested = Value::Object(Map::new());
    }
    if let Value::Object(nested) = nested {
        insert_nested(nested, rest, value);
    }
}

fn parse_env_value(raw: &str, split_lists: bool) -> Value {
    let value = raw.trim();

    if let Some(quoted) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        return Value::String(quoted.to_string());
    }

    let container = (value.starts_with('{') && value.ends_with('}'))
        || (value.starts_with('[') && value.ends_with(']'));
    if container {
        return serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    }

    if split_lists && value.contains(',') {
        return Value::Array(value.split(',').map(|item| parse_scalar(item.trim())).collect());
    }

    parse_scalar(value)
}

fn parse_scalar(value: &str) -> Value {
    if value.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if value.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(int_val) = value.parse::<i64>() {
        return Value::from(int_val);
    }
    // Rejects `inf` and `NaN`, which have no JSON form
    value
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map_or_else(|| Value::String(value.to_string()), Value::Number)
}
