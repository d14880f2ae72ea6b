//! Index registry seam and datasource lookup.
//!
//! Indexes are externally owned; this core only asks which of them declare
//! the fixed datasource id as valid, and notifies them of tracking events
//! through the [`IndexHandle`] trait.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::context::DATASOURCE_ID;
use crate::document::RowDocument;

/// Per-datasource configuration an index exposes.
///
/// `languages` is the optional translation restriction. The row schema is
/// not translatable, so a present restriction never excludes anything
/// today (see [`crate::tracking::filter_valid_item_ids`]).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexDatasourceConfig {
    pub languages: Option<LanguageRules>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageRules {
    pub selected: Vec<String>,
}

/// Handle to one externally-owned search index.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`is_valid_datasource`](IndexHandle::is_valid_datasource) | Does this index declare the datasource? |
/// | [`configuration`](IndexHandle::configuration) | Per-datasource config, if declared |
/// | [`track_items_inserted`](IndexHandle::track_items_inserted) | Queue ids for first-time indexing |
/// | [`track_items_updated`](IndexHandle::track_items_updated) | Queue ids for reindexing |
/// | [`track_items_deleted`](IndexHandle::track_items_deleted) | Remove ids from the index queue |
#[async_trait]
pub trait IndexHandle: Send + Sync {
    fn index_id(&self) -> &str;

    fn is_valid_datasource(&self, datasource_id: &str) -> bool;

    fn configuration(&self, datasource_id: &str) -> Option<IndexDatasourceConfig>;

    async fn track_items_inserted(&self, datasource_id: &str, ids: &[i64]) -> Result<()>;

    async fn track_items_updated(&self, datasource_id: &str, ids: &[i64]) -> Result<()>;

    async fn track_items_deleted(&self, datasource_id: &str, ids: &[i64]) -> Result<()>;
}

/// Source of the full index set.
#[async_trait]
pub trait IndexRegistry: Send + Sync {
    async fn load_all(&self) -> Result<BTreeMap<String, Arc<dyn IndexHandle>>>;
}

/// Registry over a fixed set of handles, for composition roots and tests.
#[derive(Default)]
pub struct StaticIndexRegistry {
    indexes: BTreeMap<String, Arc<dyn IndexHandle>>,
}

impl StaticIndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, index: Arc<dyn IndexHandle>) {
        self.indexes.insert(index.index_id().to_string(), index);
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}

#[async_trait]
impl IndexRegistry for StaticIndexRegistry {
    async fn load_all(&self) -> Result<BTreeMap<String, Arc<dyn IndexHandle>>> {
        Ok(self.indexes.clone())
    }
}

/// All indexes currently configured to index this data type.
///
/// Registry resolution failure degrades to "no interested indexes" rather
/// than failing the caller; tracking then proceeds as a no-op.
pub async fn get_indexes_for_data_type(
    registry: &dyn IndexRegistry,
    _doc: &RowDocument,
) -> BTreeMap<String, Arc<dyn IndexHandle>> {
    let indexes = match registry.load_all().await {
        Ok(indexes) => indexes,
        Err(err) => {
            tracing::warn!(%err, "index registry unavailable, treating as zero interested indexes");
            return BTreeMap::new();
        }
    };

    indexes
        .into_iter()
        .filter(|(_, index)| index.is_valid_datasource(DATASOURCE_ID))
        .collect()
}
