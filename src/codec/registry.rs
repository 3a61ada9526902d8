//! Type Registry Module
//!
//! Per-type serialization rules keyed by the `$type` identifier.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::TYPE_TAG;
use crate::error::CodecError;

/// Custom reader turning the fields of a tagged object into its canonical form.
pub type Reader = Arc<dyn Fn(&Map<String, Value>) -> Result<Value, CodecError> + Send + Sync>;

// == Type Rules ==
/// Rules applied to every JSON object tagged with one type identifier.
#[derive(Clone, Default)]
pub struct TypeRules {
    /// Fields removed at serialize time
    pub excluded_fields: HashSet<String>,
    /// Reader run at deserialize time
    pub reader: Option<Reader>,
}

impl fmt::Debug for TypeRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRules")
            .field("excluded_fields", &self.excluded_fields)
            .field("reader", &self.reader.is_some())
            .finish()
    }
}

// == Type Registry ==
/// Table of [`TypeRules`] consulted by the codec.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    rules: HashMap<String, TypeRules>,
}

impl TypeRegistry {
    // == Constructor ==
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Excludes the named fields of `type_id` from serialized payloads.
    pub fn exclude_fields<I, S>(mut self, type_id: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules
            .entry(type_id.into())
            .or_default()
            .excluded_fields
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Registers a custom reader for `type_id`, replacing any previous one.
    pub fn register_reader<F>(mut self, type_id: impl Into<String>, reader: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<Value, CodecError> + Send + Sync + 'static,
    {
        self.rules.entry(type_id.into()).or_default().reader = Some(Arc::new(reader));
        self
    }

    /// Sets the full rule set for `type_id`.
    pub fn with_rules(mut self, type_id: impl Into<String>, rules: TypeRules) -> Self {
        self.rules.insert(type_id.into(), rules);
        self
    }

    /// Returns the rules registered for `type_id`.
    pub fn rules(&self, type_id: &str) -> Option<&TypeRules> {
        self.rules.get(type_id)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub(crate) fn has_exclusions(&self) -> bool {
        self.rules.values().any(|r| !r.excluded_fields.is_empty())
    }

    pub(crate) fn has_readers(&self) -> bool {
        self.rules.values().any(|r| r.reader.is_some())
    }

    // == Strip Excluded ==
    /// Removes excluded fields from every tagged object in the tree.
    pub(crate) fn strip_excluded(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                if let Some(rules) = tag_of(map).and_then(|tag| self.rules.get(tag)) {
                    for field in &rules.excluded_fields {
                        map.remove(field);
                    }
                }
                for child in map.values_mut() {
                    self.strip_excluded(child);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.strip_excluded(item);
                }
            }
            _ => {}
        }
    }

    // == Apply Readers ==
    /// Rewrites tagged objects through their readers, innermost first.
    pub(crate) fn apply_readers(&self, value: &mut Value) -> Result<(), CodecError> {
        match value {
            Value::Object(map) => {
                for child in map.values_mut() {
                    self.apply_readers(child)?;
                }

                let Some(tag) = tag_of(map).map(str::to_string) else {
                    return Ok(());
                };
                let Some(reader) = self.rules.get(&tag).and_then(|r| r.reader.as_ref()) else {
                    return Ok(());
                };

                let mut rebuilt = reader(map)?;
                // Tagged enums need the identifier to pick the variant again
                if let Value::Object(fields) = &mut rebuilt {
                    fields
                        .entry(TYPE_TAG)
                        .or_insert_with(|| Value::String(tag.clone()));
                }
                *value = rebuilt;
                Ok(())
            }
            Value::Array(items) => items.iter_mut().try_for_each(|item| self.apply_readers(item)),
            _ => Ok(()),
        }
    }
}

fn tag_of(map: &Map<String, Value>) -> Option<&str> {
    map.get(TYPE_TAG).and_then(Value::as_str)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_builder() {
        let registry = TypeRegistry::new()
            .exclude_fields("User", ["password", "salt"])
            .register_reader("Money", |fields| Ok(Value::Object(fields.clone())));

        let user = registry.rules("User").unwrap();
        assert!(user.excluded_fields.contains("password"));
        assert!(user.excluded_fields.contains("salt"));
        assert!(user.reader.is_none());

        assert!(registry.rules("Money").unwrap().reader.is_some());
        assert!(registry.rules("Order").is_none());
        assert!(registry.has_exclusions());
        assert!(registry.has_readers());
    }

    #[test]
    fn test_strip_excluded_nested() {
        let registry = TypeRegistry::new().exclude_fields("User", ["password"]);
        let mut tree = json!({
            "owner": {"$type": "User", "name": "ann", "password": "x"},
            "members": [
                {"$type": "User", "name": "bob", "password": "y"},
                {"$type": "Group", "name": "ops", "password": "kept"}
            ],
            "password": "untagged objects are left alone"
        });

        registry.strip_excluded(&mut tree);

        assert_eq!(tree["owner"], json!({"$type": "User", "name": "ann"}));
        assert_eq!(tree["members"][0], json!({"$type": "User", "name": "bob"}));
        assert_eq!(tree["members"][1]["password"], "kept");
        assert_eq!(tree["password"], "untagged objects are left alone");
    }

    #[test]
    fn test_reader_output_is_retagged() {
        let registry = TypeRegistry::new().register_reader("Money", |fields| {
            let cents = fields.get("Cents").and_then(Value::as_i64).unwrap_or_default();
            Ok(json!({ "amount": cents as f64 / 100.0 }))
        });
        let mut tree = json!([{"$type": "Money", "Cents": 1250, "Currency": "USD"}]);

        registry.apply_readers(&mut tree).unwrap();

        assert_eq!(tree, json!([{"$type": "Money", "amount": 12.5}]));
    }

    #[test]
    fn test_with_rules_replaces_entry() {
        let registry = TypeRegistry::new()
            .exclude_fields("User", ["password"])
            .with_rules("User", TypeRules::default());

        assert!(registry.rules("User").unwrap().excluded_fields.is_empty());
        assert!(!registry.has_exclusions());
    }
}
