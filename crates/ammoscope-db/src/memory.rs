//! In-process entity store.
//!
//! Used for dry runs and tests. Mirrors the PostgreSQL backend's behaviour:
//! a serial `_id` on reads, duplicate-key rejection, shallow merge on update.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;

use ammoscope_common::{fields, Document};

use crate::error::{DbError, Result};
use crate::store::{entity_key, without_store_id, EntityStore};

struct Row {
    serial: u64,
    doc: Document,
}

pub struct MemoryStore {
    rows: RwLock<BTreeMap<String, Row>>,
    next_serial: AtomicU64,
    reachable: AtomicBool,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_serial: AtomicU64::new(1),
            reachable: AtomicBool::new(true),
            writes: AtomicU64::new(0),
        }
    }

    /// Simulate losing (or regaining) the connection.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Inserts and updates applied so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Stored document without the internal `_id`.
    pub async fn get(&self, key: &str) -> Option<Document> {
        self.rows.read().await.get(key).map(|row| row.doc.clone())
    }

    /// All stored documents, ordered by key.
    pub async fn snapshot(&self) -> Vec<Document> {
        self.rows.read().await.values().map(|row| row.doc.clone()).collect()
    }

    fn check_reachable(&self) -> Result<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DbError::Unreachable("memory store is offline".to_string()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        self.check_reachable()
    }

    async fn find_one(&self, key: &str) -> Result<Option<Document>> {
        self.check_reachable()?;
        let rows = self.rows.read().await;
        Ok(rows.get(key).map(|row| {
            let mut doc = row.doc.clone();
            doc.insert(fields::STORE_ID.to_string(), Value::from(row.serial));
            doc
        }))
    }

    async fn insert_one(&self, entity: &Document) -> Result<()> {
        self.check_reachable()?;
        let key = entity_key(entity)?.to_string();
        let mut rows = self.rows.write().await;
        if rows.contains_key(&key) {
            return Err(DbError::Duplicate(key));
        }
        let serial = self.next_serial.fetch_add(1, Ordering::SeqCst);
        rows.insert(key, Row { serial, doc: without_store_id(entity) });
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_one(&self, key: &str, fields: &Document) -> Result<bool> {
        self.check_reachable()?;
        let mut rows = self.rows.write().await;
        let Some(row) = rows.get_mut(key) else {
            return Ok(false);
        };
        for (field, value) in without_store_id(fields) {
            row.doc.insert(field, value);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn count(&self) -> Result<u64> {
        self.check_reachable()?;
        Ok(self.rows.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[tokio::test]
    async fn test_insert_then_find_exposes_store_id() {
        let store = MemoryStore::new();
        store.insert_one(&doc(json!({ "id": "x", "name": "Foo" }))).await.unwrap();

        let found = store.find_one("x").await.unwrap().unwrap();
        assert_eq!(found.get("name"), Some(&json!("Foo")));
        assert_eq!(found.get("_id"), Some(&json!(1)));
        assert_eq!(store.get("x").await, Some(doc(json!({ "id": "x", "name": "Foo" }))));
        assert_eq!(store.find_one("y").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = MemoryStore::new();
        let entity = doc(json!({ "id": "x" }));
        store.insert_one(&entity).await.unwrap();
        assert!(matches!(store.insert_one(&entity).await, Err(DbError::Duplicate(k)) if k == "x"));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_requires_id() {
        let store = MemoryStore::new();
        let err = store.insert_one(&doc(json!({ "name": "nameless" }))).await;
        assert!(matches!(err, Err(DbError::InvalidEntity(_))));
    }

    #[tokio::test]
    async fn test_update_merges_only_given_fields() {
        let store = MemoryStore::new();
        store
            .insert_one(&doc(json!({ "id": "x", "name": "Foo", "finalScore": 5 })))
            .await
            .unwrap();

        let matched = store.update_one("x", &doc(json!({ "finalScore": 10 }))).await.unwrap();
        assert!(matched);
        assert_eq!(
            store.get("x").await,
            Some(doc(json!({ "id": "x", "name": "Foo", "finalScore": 10 })))
        );
        assert!(!store.update_one("missing", &doc(json!({ "a": 1 }))).await.unwrap());
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_offline_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_reachable(false);
        assert!(matches!(store.ping().await, Err(DbError::Unreachable(_))));
        assert!(store.find_one("x").await.is_err());
        store.set_reachable(true);
        assert!(store.ping().await.is_ok());
    }
}
