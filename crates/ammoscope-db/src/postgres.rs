//! PostgreSQL entity store.
//!
//! One row per entity:
//!   _id  BIGSERIAL  internal identifier, surfaced on reads
//!   id   TEXT       natural key, unique
//!   doc  JSONB      the entity document
//!
//! Partial updates merge at the top level with `doc || $2`.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use tracing::{debug, info};

use ammoscope_common::{fields, Document};

use crate::error::{DbError, Result};
use crate::store::{entity_key, without_store_id, EntityStore};

pub const DEFAULT_TABLE: &str = "bullets";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    table: String,
}

impl PgStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        Ok(Self { pool, table: table.to_string() })
    }

    /// Build a lazily-connecting pool; the first query (normally `ping`)
    /// is what actually reaches the server.
    pub fn connect_lazy(url: &str, table: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(url)?;
        Self::new(pool, table)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the entity table if it is missing.
    pub async fn initialize(&self) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                _id  BIGSERIAL PRIMARY KEY,
                id   TEXT NOT NULL UNIQUE,
                doc  JSONB NOT NULL
            )",
            self.table
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        info!(table = %self.table, "Entity table ready");
        Ok(())
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::Unreachable(e.to_string()))?;
        Ok(())
    }

    async fn find_one(&self, key: &str) -> Result<Option<Document>> {
        let sql = format!("SELECT _id, doc FROM {} WHERE id = $1", self.table);
        let row: Option<(i64, Json<Document>)> = sqlx::query_as(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(serial, Json(mut doc))| {
            doc.insert(fields::STORE_ID.to_string(), Value::from(serial));
            doc
        }))
    }

    async fn insert_one(&self, entity: &Document) -> Result<()> {
        let key = entity_key(entity)?;
        let doc = without_store_id(entity);
        let sql = format!("INSERT INTO {} (id, doc) VALUES ($1, $2)", self.table);

        let result = sqlx::query(&sql)
            .bind(key)
            .bind(Json(&doc))
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => {
                debug!(id = key, "Inserted entity");
                Ok(())
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(DbError::Duplicate(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_one(&self, key: &str, fields: &Document) -> Result<bool> {
        let patch = without_store_id(fields);
        let sql = format!("UPDATE {} SET doc = doc || $2 WHERE id = $1", self.table);

        let done = sqlx::query(&sql)
            .bind(key)
            .bind(Json(&patch))
            .execute(&self.pool)
            .await?;

        debug!(id = key, n_fields = patch.len(), "Updated entity");
        Ok(done.rows_affected() > 0)
    }

    async fn count(&self) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let n: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(n.max(0) as u64)
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_head = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_head && valid_tail && name.len() <= 63 {
        Ok(())
    } else {
        Err(DbError::InvalidTableName(name.to_string()))
    }
}
