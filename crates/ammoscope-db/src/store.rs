//! Key-indexed entity store.
//!
//! Entities are JSON documents addressed by their `id` field. A backend may
//! expose its own internal identifier under `_id` on reads; callers must not
//! treat that field as entity data.

use async_trait::async_trait;

use ammoscope_common::{fields, Document};

use crate::error::{DbError, Result};

#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Cheap liveness check, issued once before a run.
    async fn ping(&self) -> Result<()>;

    /// Entity whose `id` equals `key`, if any.
    async fn find_one(&self, key: &str) -> Result<Option<Document>>;

    /// Insert a new entity. Fails with `Duplicate` if the key is taken.
    async fn insert_one(&self, entity: &Document) -> Result<()>;

    /// Overwrite only the given fields of an existing entity.
    /// Returns false when no entity matched.
    async fn update_one(&self, key: &str, fields: &Document) -> Result<bool>;

    /// Number of stored entities.
    async fn count(&self) -> Result<u64>;
}

/// Natural key of an entity about to be inserted.
pub(crate) fn entity_key(entity: &Document) -> Result<&str> {
    entity
        .get(fields::ID)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DbError::InvalidEntity("entity has no string `id`".to_string()))
}

/// Copy without the backend-internal identifier.
pub(crate) fn without_store_id(entity: &Document) -> Document {
    let mut doc = entity.clone();
    doc.remove(fields::STORE_ID);
    doc
}
