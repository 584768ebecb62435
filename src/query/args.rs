use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::args::ANY;
use crate::error::{BulkTaskError, Result};

/// Caller-supplied query arguments merged with a source's defaults.
///
/// Merging follows two passes: defaults fill in keys the caller left out, then
/// forced keys overwrite whatever the caller said.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryArgs(Map<String, Value>);

impl QueryArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON value, which must be an object (or null)
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(BulkTaskError::InvalidInput(format!(
                "query arguments must be an object, got {other}"
            ))),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Fill in any key the caller did not supply
    pub fn with_defaults(mut self, defaults: &[(&str, Value)]) -> Self {
        for (key, value) in defaults {
            self.0
                .entry((*key).to_string())
                .or_insert_with(|| value.clone());
        }
        self
    }

    /// Overwrite keys regardless of what the caller supplied
    pub fn force(mut self, forced: &[(&str, Value)]) -> Self {
        for (key, value) in forced {
            self.0.insert((*key).to_string(), value.clone());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Integer argument; numeric strings are accepted
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            Value::String(s) => match s.as_str() {
                "true" | "1" => Some(true),
                "false" | "0" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// A filter that may be given as a single string or a list of strings.
    ///
    /// Returns `None` when the key is absent or set to `"any"`, meaning the
    /// field should not be filtered on.
    pub fn get_str_list(&self, key: &str) -> Option<Vec<String>> {
        match self.0.get(key)? {
            Value::String(s) if s == ANY => None,
            Value::String(s) => Some(vec![s.clone()]),
            Value::Array(values) => {
                let list: Vec<String> = values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect();
                if list.iter().any(|v| v == ANY) {
                    None
                } else {
                    Some(list)
                }
            }
            _ => None,
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for QueryArgs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_then_forced() {
        let args = QueryArgs::new()
            .with("posts_per_page", 10)
            .with("order", "DESC")
            .with_defaults(&[("posts_per_page", json!(100)), ("post_type", json!("any"))])
            .force(&[("order", json!("ASC"))]);

        assert_eq!(args.get_i64("posts_per_page"), Some(10));
        assert_eq!(args.get_str("post_type"), Some("any"));
        assert_eq!(args.get_str("order"), Some("ASC"));
    }

    #[test]
    fn test_string_list_filters() {
        let args = QueryArgs::new()
            .with("taxonomy", json!(["category", "post_tag"]))
            .with("post_type", "any")
            .with("role", "editor");

        assert_eq!(
            args.get_str_list("taxonomy"),
            Some(vec!["category".to_string(), "post_tag".to_string()])
        );
        assert_eq!(args.get_str_list("post_type"), None);
        assert_eq!(args.get_str_list("role"), Some(vec!["editor".to_string()]));
        assert_eq!(args.get_str_list("missing"), None);
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(QueryArgs::from_value(json!({"number": 5})).is_ok());
        assert!(QueryArgs::from_value(Value::Null).is_ok());
        assert!(QueryArgs::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn test_lenient_scalars() {
        let args = QueryArgs::new()
            .with("number", "25")
            .with("hide_empty", 0);
        assert_eq!(args.get_i64("number"), Some(25));
        assert_eq!(args.get_bool("hide_empty"), Some(false));
    }
}
