//! Partial configuration tree and dotted-path algebra

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ConfigError, ConfigResult};

/// A recursive key/value configuration tree.
///
/// Leaves are scalars, lists or the explicit `null` marker; inner nodes are
/// nested trees (`Value::Object`). Paths are dotted strings whose empty
/// segments are skipped, so `"a..b."` addresses the same node as `"a.b"`
/// and `""` addresses the root.
///
/// A `Partial` does no locking of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Partial(Value);

impl Partial {
    /// Create an empty tree
    pub fn new() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// Check whether a non-null value is stored at `path`
    pub fn has(&self, path: &str) -> bool {
        self.get(path).is_some_and(|value| !value.is_null())
    }

    /// Get the value stored at `path`.
    ///
    /// An explicit `null` is returned as such; `None` means the key is
    /// missing or an intermediate segment is not a tree.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.0;
        for segment in segments(path) {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Get the value stored at `path`, or `default` when the key is missing
    pub fn get_or<'a>(&'a self, path: &str, default: &'a Value) -> &'a Value {
        self.get(path).unwrap_or(default)
    }

    /// Get a boolean
    pub fn get_bool(&self, path: &str) -> ConfigResult<bool> {
        self.typed(path, None, "boolean", Value::as_bool)
    }

    /// Get a boolean, falling back to `default` when absent
    pub fn get_bool_or(&self, path: &str, default: bool) -> ConfigResult<bool> {
        self.typed(path, Some(default), "boolean", Value::as_bool)
    }

    /// Get a signed integer
    pub fn get_int(&self, path: &str) -> ConfigResult<i64> {
        self.typed(path, None, "integer", Value::as_i64)
    }

    /// Get a signed integer, falling back to `default` when absent
    pub fn get_int_or(&self, path: &str, default: i64) -> ConfigResult<i64> {
        self.typed(path, Some(default), "integer", Value::as_i64)
    }

    /// Get a floating point number. Integers are not widened.
    pub fn get_float(&self, path: &str) -> ConfigResult<f64> {
        self.typed(path, None, "float", as_float)
    }

    /// Get a floating point number, falling back to `default` when absent
    pub fn get_float_or(&self, path: &str, default: f64) -> ConfigResult<f64> {
        self.typed(path, Some(default), "float", as_float)
    }

    /// Get a string
    pub fn get_string(&self, path: &str) -> ConfigResult<String> {
        self.typed(path, None, "string", |v| v.as_str().map(str::to_owned))
    }

    /// Get a string, falling back to `default` when absent
    pub fn get_string_or(&self, path: &str, default: impl Into<String>) -> ConfigResult<String> {
        self.typed(path, Some(default.into()), "string", |v| {
            v.as_str().map(str::to_owned)
        })
    }

    /// Get a list
    pub fn get_list(&self, path: &str) -> ConfigResult<Vec<Value>> {
        self.typed(path, None, "list", |v| v.as_array().cloned())
    }

    /// Get a nested tree
    pub fn get_partial(&self, path: &str) -> ConfigResult<Partial> {
        self.typed(path, None, "tree", |v| {
            v.as_object().cloned().map(Partial::from)
        })
    }

    /// Deserialize the value stored at `path`
    pub fn get_as<T>(&self, path: &str) -> ConfigResult<T>
    where
        T: DeserializeOwned,
    {
        let value = self
            .get(path)
            .ok_or_else(|| ConfigError::path_not_found(path))?;
        T::deserialize(value).map_err(|e| {
            ConfigError::type_mismatch(
                path,
                std::any::type_name::<T>(),
                format!("{} ({e})", value_kind(value)),
            )
        })
    }

    fn typed<'a, T>(
        &'a self,
        path: &str,
        default: Option<T>,
        expected: &'static str,
        extract: impl FnOnce(&'a Value) -> Option<T>,
    ) -> ConfigResult<T> {
        match self.get(path) {
            None | Some(Value::Null) => default.ok_or_else(|| ConfigError::path_not_found(path)),
            Some(value) => extract(value)
                .ok_or_else(|| ConfigError::type_mismatch(path, expected, value_kind(value))),
        }
    }

    /// Store `value` at `path`, creating intermediate trees as needed.
    ///
    /// Scalars found on the way are replaced by trees. Setting the root
    /// requires a tree value.
    pub fn set(&mut self, path: &str, value: Value) -> ConfigResult<()> {
        let parts: Vec<&str> = segments(path).collect();
        let Some((last, parents)) = parts.split_last() else {
            if !value.is_object() {
                return Err(ConfigError::type_mismatch(path, "tree", value_kind(&value)));
            }
            self.0 = value;
            return Ok(());
        };

        let mut current = &mut self.0;
        for part in parents {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            let Some(map) = current.as_object_mut() else {
                return Ok(());
            };
            current = map
                .entry((*part).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }

        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        if let Some(map) = current.as_object_mut() {
            map.insert((*last).to_string(), value);
        }
        Ok(())
    }

    /// Merge `other` into this tree.
    ///
    /// Trees present on both sides merge key by key; any other pairing is
    /// resolved in favour of `other`. Later merges win.
    pub fn merge(&mut self, other: Partial) -> &mut Self {
        merge_values(&mut self.0, other.0);
        self
    }

    /// Top-level keys
    pub fn keys(&self) -> Vec<String> {
        self.0
            .as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of top-level keys
    pub fn len(&self) -> usize {
        self.0.as_object().map_or(0, Map::len)
    }

    /// Whether the tree has no keys
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the tree as a JSON value
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consume the tree into a JSON value (always an object)
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl Default for Partial {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Map<String, Value>> for Partial {
    fn from(map: Map<String, Value>) -> Self {
        Self(Value::Object(map))
    }
}

impl TryFrom<Value> for Partial {
    type Error = ConfigError;

    fn try_from(value: Value) -> ConfigResult<Self> {
        match value {
            Value::Object(map) => Ok(Self::from(map)),
            other => Err(ConfigError::type_mismatch("", "tree", value_kind(&other))),
        }
    }
}

impl From<Partial> for Value {
    fn from(partial: Partial) -> Self {
        partial.0
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|segment| !segment.is_empty())
}

fn as_float(value: &Value) -> Option<f64> {
    if value.is_f64() { value.as_f64() } else { None }
}

fn merge_values(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_obj), Value::Object(source_obj)) => {
            for (key, value) in source_obj {
                if let Some(existing) = target_obj.get_mut(&key) {
                    merge_values(existing, value);
                } else {
                    target_obj.insert(key, value);
                }
            }
        }
        (target, source) => {
            *target = source;
        }
    }
}

/// Human-readable kind of a value, as reported in type mismatches
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(n) if !n.is_i64() => "unsigned integer (out of i64 range)",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "tree",
    }
}
