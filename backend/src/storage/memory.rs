//! In-memory document store.
//!
//! Keeps documents in a map for the lifetime of the process. Used for tests and
//! for running the backend without any remote store. Read and write failures can
//! be switched on to exercise the error paths of the persistence layer.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::traits::{merge_documents, DocumentStore, SetOptions};

#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: Mutex<HashMap<(String, String), Value>>,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document directly, bypassing write counting
    pub fn insert(&self, collection: &str, doc_id: &str, value: Value) {
        self.lock()
            .insert((collection.to_string(), doc_id.to_string()), value);
    }

    pub fn document(&self, collection: &str, doc_id: &str) -> Option<Value> {
        self.lock()
            .get(&(collection.to_string(), doc_id.to_string()))
            .cloned()
    }

    /// Number of successful `set` calls so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), Value>> {
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Value>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("simulated read failure for {}/{}", collection, doc_id);
        }
        Ok(self.document(collection, doc_id))
    }

    async fn set(&self, collection: &str, doc_id: &str, value: Value, options: SetOptions) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("simulated write failure for {}/{}", collection, doc_id);
        }

        let key = (collection.to_string(), doc_id.to_string());
        {
            let mut documents = self.lock();
            let mut document = if options.merge {
                documents.remove(&key).unwrap_or_else(|| Value::Object(Default::default()))
            } else {
                Value::Object(Default::default())
            };
            merge_documents(&mut document, value);
            documents.insert(key, document);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_missing_document() {
        let store = InMemoryDocumentStore::new();
        assert_eq!(store.get("usuarios", "nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_replace_and_merge_writes() {
        let store = InMemoryDocumentStore::new();

        store
            .set("usuarios", "u1", json!({"a": 1, "b": {"c": 2}}), SetOptions::replace())
            .await
            .unwrap();
        store
            .set("usuarios", "u1", json!({"b": {"d": 3}}), SetOptions::merge())
            .await
            .unwrap();
        assert_eq!(
            store.get("usuarios", "u1").await.unwrap(),
            Some(json!({"a": 1, "b": {"c": 2, "d": 3}}))
        );

        store
            .set("usuarios", "u1", json!({"b": {}}), SetOptions::replace())
            .await
            .unwrap();
        assert_eq!(store.document("usuarios", "u1"), Some(json!({"b": {}})));
        assert_eq!(store.write_count(), 3);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = InMemoryDocumentStore::new();
        store.set_fail_writes(true);
        store.set_fail_reads(true);

        assert!(store.set("usuarios", "u1", json!({}), SetOptions::replace()).await.is_err());
        assert!(store.get("usuarios", "u1").await.is_err());
        assert_eq!(store.write_count(), 0);

        store.set_fail_reads(false);
        assert_eq!(store.get("usuarios", "u1").await.unwrap(), None);
    }
}
