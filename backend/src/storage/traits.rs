//! # Storage Traits
//!
//! The ledger is persisted as one JSON document per user in a key-value document
//! store. This module defines the abstraction the domain layer talks to, so the
//! remote store, a local file store or an in-memory store can be swapped freely.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Options for `DocumentStore::set`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Merge into the stored document instead of replacing it
    pub merge: bool,
}

impl SetOptions {
    pub fn replace() -> Self {
        Self { merge: false }
    }

    pub fn merge() -> Self {
        Self { merge: true }
    }
}

/// Trait defining the interface for document storage operations
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document. `Ok(None)` means the document does not exist.
    async fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Value>>;

    /// Write a document, either replacing it or merging into it
    async fn set(&self, collection: &str, doc_id: &str, value: Value, options: SetOptions) -> Result<()>;
}

/// Merge `patch` into `target` the way merging writes behave:
/// objects merge key by key (recursively), `null` deletes the key, and any other
/// value replaces what was there.
pub fn merge_documents(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                if value.is_null() {
                    target.remove(&key);
                    continue;
                }
                let nested = value.is_object() && target.get(&key).map_or(false, Value::is_object);
                if nested {
                    if let Some(existing) = target.get_mut(&key) {
                        merge_documents(existing, value);
                    }
                } else {
                    target.insert(key, strip_nulls(value));
                }
            }
        }
        (target, patch) => *target = strip_nulls(patch),
    }
}

/// Remove `null` members from nested objects so tombstones never get stored
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(object) => Value::Object(
            object
                .into_iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| (key, strip_nulls(value)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_keeps_untouched_fields() {
        let mut stored = json!({"dadosPorAno": {"2024": {"lancamentos": [1]}}, "nextId": 2, "extra": true});

        merge_documents(&mut stored, json!({"dadosPorAno": {"2025": {"lancamentos": []}}, "nextId": 3}));

        assert_eq!(
            stored,
            json!({
                "dadosPorAno": {"2024": {"lancamentos": [1]}, "2025": {"lancamentos": []}},
                "nextId": 3,
                "extra": true
            })
        );
    }

    #[test]
    fn test_merge_null_is_a_tombstone() {
        let mut stored = json!({"dadosPorAno": {"2024": {"lancamentos": [1]}, "2025": {"lancamentos": [2]}}});

        merge_documents(&mut stored, json!({"dadosPorAno": {"2024": null}}));

        assert_eq!(stored, json!({"dadosPorAno": {"2025": {"lancamentos": [2]}}}));
    }

    #[test]
    fn test_merge_into_non_object_replaces() {
        let mut stored = json!("old");
        merge_documents(&mut stored, json!({"a": {"b": null, "c": 1}}));
        assert_eq!(stored, json!({"a": {"c": 1}}));
    }
}
