//! Process-wide keyed state store and harvest cursor persistence.
//!
//! The [`StateStore`] trait is the only persistence seam the harvester
//! needs: string keys to string values. Cursor state is serialized as JSON
//! under `TRACKING_PAGE_STATE_KEY` plus the context key (see
//! [`crate::context`]).
//!
//! Concurrent rebuilds racing on the same context key are not coordinated
//! here; callers must serialize rebuild invocations per context.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Persisted paging progress for one harvest context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorState {
    /// Last completed page number.
    pub page: u64,
    /// Last row identifier seen on that page.
    pub last_id: i64,
}

/// Keyed string-to-string state, shared process-wide.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Load the cursor stored under `key`, if any.
///
/// A value that no longer parses is treated as absent: the harvest falls
/// back to offset paging instead of failing.
pub async fn load_cursor(store: &dyn StateStore, key: &str) -> Result<Option<CursorState>> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(cursor) => Ok(Some(cursor)),
        Err(err) => {
            tracing::warn!(key, %err, "discarding unparsable cursor state");
            Ok(None)
        }
    }
}

pub async fn store_cursor(store: &dyn StateStore, key: &str, cursor: &CursorState) -> Result<()> {
    store.set(key, &serde_json::to_string(cursor)?).await
}

pub async fn clear_cursor(store: &dyn StateStore, key: &str) -> Result<()> {
    store.delete(key).await
}

/// State store backed by the crate-owned `app_state` table.
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM app_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO app_state (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM app_state WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// In-memory state store for tests and embedded use.
#[derive(Default)]
pub struct MemoryStateStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("state store mutex poisoned"))?
            .get(key)
            .cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("state store mutex poisoned"))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("state store mutex poisoned"))?
            .remove(key);
        Ok(())
    }
}
