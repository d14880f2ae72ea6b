//! Change tracking: notify interested indexes of row mutations.
//!
//! On each insert/update/delete the [`TrackingManager`] resolves the set of
//! indexes declaring this datasource and issues the matching tracking call
//! per index, one row identifier at a time. Tracking calls to different
//! indexes are independent: a failure against one index never prevents
//! notifying the rest, and the outcome is reported as an aggregate.

use std::sync::Arc;

use anyhow::Result;

use crate::context::DATASOURCE_ID;
use crate::document::{FieldValue, RowDocument};
use crate::registry::{get_indexes_for_data_type, IndexHandle, IndexRegistry};
use crate::rows::RowSource;

/// Aggregate outcome of one tracking invocation.
#[derive(Debug, Default)]
pub struct TrackingReport {
    /// Indexes successfully notified.
    pub notified: Vec<String>,
    /// Indexes whose tracking call failed; the rest were still attempted.
    pub failures: Vec<TrackingFailure>,
}

#[derive(Debug)]
pub struct TrackingFailure {
    pub index_id: String,
    pub error: anyhow::Error,
}

impl TrackingReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct TrackingManager {
    registry: Arc<dyn IndexRegistry>,
}

impl TrackingManager {
    pub fn new(registry: Arc<dyn IndexRegistry>) -> Self {
        Self { registry }
    }

    /// Track a brand-new row.
    pub async fn data_insert(&self, doc: &RowDocument) -> Result<TrackingReport> {
        self.track_data_change(doc, true).await
    }

    /// Track a changed row already known to the trackers.
    pub async fn data_update(&self, doc: &RowDocument) -> Result<TrackingReport> {
        self.track_data_change(doc, false).await
    }

    /// Notify every interested index of an insert or update.
    ///
    /// Zero interested indexes is a successful no-op. The identifier set is
    /// filtered per index through [`filter_valid_item_ids`] before the
    /// notification is emitted.
    pub async fn track_data_change(&self, doc: &RowDocument, is_new: bool) -> Result<TrackingReport> {
        let indexes = get_indexes_for_data_type(self.registry.as_ref(), doc).await;
        let mut report = TrackingReport::default();
        if indexes.is_empty() {
            return Ok(report);
        }

        // The underlying primitive takes batches, but this entry point
        // always tracks exactly one row.
        let item_ids = vec![doc.item_id()?];

        for (index_id, index) in &indexes {
            let filtered = filter_valid_item_ids(index.as_ref(), DATASOURCE_ID, &item_ids);
            if filtered.is_empty() {
                continue;
            }
            let outcome = if is_new {
                index.track_items_inserted(DATASOURCE_ID, &filtered).await
            } else {
                index.track_items_updated(DATASOURCE_ID, &filtered).await
            };
            record(&mut report, index_id, outcome);
        }

        tracing::debug!(
            is_new,
            notified = report.notified.len(),
            failed = report.failures.len(),
            "tracked data change"
        );
        Ok(report)
    }

    /// Notify every interested index that a row was deleted.
    ///
    /// Deletes bypass validity filtering: the identifier goes to each
    /// interested index unconditionally.
    pub async fn data_delete(&self, doc: &RowDocument) -> Result<TrackingReport> {
        let indexes = get_indexes_for_data_type(self.registry.as_ref(), doc).await;
        let mut report = TrackingReport::default();
        if indexes.is_empty() {
            return Ok(report);
        }

        let item_ids = vec![doc.item_id()?];

        for (index_id, index) in &indexes {
            let outcome = index.track_items_deleted(DATASOURCE_ID, &item_ids).await;
            record(&mut report, index_id, outcome);
        }
        Ok(report)
    }

    /// Apply a field update to the main table, then track the change.
    ///
    /// Returns an empty report when the update matched no row; otherwise
    /// the row is reloaded and tracked as an update.
    pub async fn update_and_track(
        &self,
        source: &dyn RowSource,
        id: i64,
        fields: &[(String, FieldValue)],
    ) -> Result<TrackingReport> {
        let affected = source.update_row(id, fields).await?;
        if affected == 0 {
            return Ok(TrackingReport::default());
        }

        let mut rows = source.load_rows(&[id]).await?;
        let raw = rows
            .pop()
            .ok_or_else(|| anyhow::anyhow!("row {} vanished after update", id))?;
        let doc = RowDocument::from_row(raw)?;
        self.data_update(&doc).await
    }
}

fn record(report: &mut TrackingReport, index_id: &str, outcome: Result<()>) {
    match outcome {
        Ok(()) => report.notified.push(index_id.to_string()),
        Err(error) => {
            tracing::warn!(index_id, %error, "tracking call failed, continuing with remaining indexes");
            report.failures.push(TrackingFailure {
                index_id: index_id.to_string(),
                error,
            });
        }
    }
}

/// Validity filter over datasource-specific item identifiers.
///
/// Identifiers pass unchanged when the index does not declare the
/// datasource, when its configuration cannot be read, or when no language
/// restriction is configured. The language branch is an explicit extension
/// point: this data type carries no language codes, so a configured
/// restriction cannot exclude anything either.
pub fn filter_valid_item_ids(
    index: &dyn IndexHandle,
    datasource_id: &str,
    item_ids: &[i64],
) -> Vec<i64> {
    if !index.is_valid_datasource(datasource_id) {
        return item_ids.to_vec();
    }
    let Some(config) = index.configuration(datasource_id) else {
        return item_ids.to_vec();
    };
    if config.languages.is_none() {
        return item_ids.to_vec();
    }
    item_ids.to_vec()
}
