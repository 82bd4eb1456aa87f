//! Context variables — named JSON values carried alongside the conversation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A string-keyed map of JSON values, iterated in key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextVariables {
    values: BTreeMap<String, Value>,
}

impl ContextVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Remove a variable. Returns whether it existed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn all(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Copy every entry of `other` into this map, overwriting on conflict.
    pub fn merge(&mut self, other: ContextVariables) {
        self.values.extend(other.values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_get_delete() {
        let mut vars = ContextVariables::new();
        vars.set("user", json!({"name": "Ada"}));
        assert!(vars.has("user"));
        assert_eq!(vars.get("user").unwrap()["name"], "Ada");
        assert!(vars.delete("user"));
        assert!(!vars.delete("user"));
        assert!(vars.get("user").is_none());
    }

    #[test]
    fn serializes_as_plain_object() {
        let mut vars = ContextVariables::new();
        vars.set("b", json!(2));
        vars.set("a", json!(1));
        assert_eq!(serde_json::to_string(&vars).unwrap(), r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn merge_overwrites() {
        let mut vars = ContextVariables::new();
        vars.set("a", json!(1));
        vars.set("keep", json!(true));
        let mut other = ContextVariables::new();
        other.set("a", json!(9));
        vars.merge(other);
        assert_eq!(vars.get("a"), Some(&json!(9)));
        assert_eq!(vars.len(), 2);
    }
}
