//! Row storage seam for the main table.
//!
//! The harvester and tracking flows only ever need three operations against
//! the externally-owned table: enumerate identifiers in ascending order,
//! load full rows by identifier, and apply a keyed field update. The
//! [`RowSource`] trait captures those plus one capability flag — whether the
//! backend can efficiently evaluate an `id > ?` comparison, which gates the
//! harvester's cursor-based paging.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::config::is_identifier;
use crate::document::FieldValue;
use crate::schema;

/// Raw row as handed back by storage, before document validation.
pub type RawRow = BTreeMap<String, FieldValue>;

/// Keyed/range access to the main table.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Whether the backend supports comparison predicates on the identifier
    /// column. Sources that cannot (e.g. remote row feeds without pushdown)
    /// force the harvester to stay on offset paging.
    fn supports_cursor_conditions(&self) -> bool {
        true
    }

    /// Fetch row identifiers in ascending order.
    ///
    /// With `after_id` set, only identifiers strictly greater are returned.
    /// `limit: None` means all matching rows (`offset` must be 0 then).
    async fn select_ids(
        &self,
        offset: i64,
        limit: Option<i64>,
        after_id: Option<i64>,
    ) -> Result<Vec<i64>>;

    /// Load the full rows for the given identifiers. Unknown identifiers
    /// are silently absent from the result.
    async fn load_rows(&self, ids: &[i64]) -> Result<Vec<RawRow>>;

    /// Apply a field update to one row. Returns the number of rows affected.
    async fn update_row(&self, id: i64, fields: &[(String, FieldValue)]) -> Result<u64>;
}

/// [`RowSource`] over a SQLite table with the fixed six-column layout.
pub struct SqliteRowSource {
    pool: SqlitePool,
    table: String,
}

impl SqliteRowSource {
    pub fn new(pool: SqlitePool, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if !is_identifier(&table) {
            anyhow::bail!("table name '{}' is not a bare SQL identifier", table);
        }
        Ok(Self { pool, table })
    }
}

#[async_trait]
impl RowSource for SqliteRowSource {
    async fn select_ids(
        &self,
        offset: i64,
        limit: Option<i64>,
        after_id: Option<i64>,
    ) -> Result<Vec<i64>> {
        let mut sql = format!("SELECT id FROM {}", self.table);
        if after_id.is_some() {
            sql.push_str(" WHERE id > ?");
        }
        // Paging correctness depends on a deterministic order.
        sql.push_str(" ORDER BY id ASC");
        if limit.is_some() {
            sql.push_str(" LIMIT ? OFFSET ?");
        }

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(after) = after_id {
            query = query.bind(after);
        }
        if let Some(limit) = limit {
            query = query.bind(limit).bind(offset);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn load_rows(&self, ids: &[i64]) -> Result<Vec<RawRow>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM {} WHERE id IN ({}) ORDER BY id ASC",
            schema::column_names().join(", "),
            self.table,
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut raw = RawRow::new();
            raw.insert("id".to_string(), int_field(row.try_get("id")?));
            raw.insert("name".to_string(), text_field(row.try_get("name")?));
            raw.insert("url".to_string(), text_field(row.try_get("url")?));
            raw.insert(
                "description".to_string(),
                text_field(row.try_get("description")?),
            );
            raw.insert("price".to_string(), float_field(row.try_get("price")?));
            raw.insert("category".to_string(), text_field(row.try_get("category")?));
            out.push(raw);
        }
        Ok(out)
    }

    async fn update_row(&self, id: i64, fields: &[(String, FieldValue)]) -> Result<u64> {
        if fields.is_empty() {
            return Ok(0);
        }
        let mut assignments = Vec::with_capacity(fields.len());
        for (name, _) in fields {
            let def = schema::property(name)
                .ok_or_else(|| anyhow::anyhow!("unknown column '{}' in update", name))?;
            if def.name == "id" {
                anyhow::bail!("the identifier column cannot be updated");
            }
            assignments.push(format!("{} = ?", def.name));
        }
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?",
            self.table,
            assignments.join(", ")
        );

        let mut query = sqlx::query(&sql);
        for (_, value) in fields {
            query = match value {
                FieldValue::Integer(v) => query.bind(*v),
                FieldValue::Float(v) => query.bind(*v),
                FieldValue::Text(v) | FieldValue::Uri(v) => query.bind(v.clone()),
                FieldValue::Null => query.bind(Option::<String>::None),
            };
        }
        let result = query.bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn int_field(value: Option<i64>) -> FieldValue {
    value.map(FieldValue::Integer).unwrap_or(FieldValue::Null)
}

fn text_field(value: Option<String>) -> FieldValue {
    value.map(FieldValue::Text).unwrap_or(FieldValue::Null)
}

fn float_field(value: Option<f64>) -> FieldValue {
    value.map(FieldValue::Float).unwrap_or(FieldValue::Null)
}
