//! Paginated, resumable enumeration of indexable row identifiers.
//!
//! A rebuild of tracking information may span many separate invocations
//! (one page per scheduler tick). [`TableHarvester::get_item_ids`] produces
//! stable ascending pages and persists a `(page, last_id)` cursor per
//! context, so a later call can continue with an `id > last_id` condition
//! instead of an ever-growing OFFSET scan. Restarting at the same page
//! number reproduces an equivalent result set either way; only performance
//! differs.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::DatasourceConfig;
use crate::context::TrackingContext;
use crate::document::RowDocument;
use crate::rows::RowSource;
use crate::state::{self, CursorState, StateStore};

/// Datasource ids whose paging sequences are not monotonic, so the
/// last-id continuation must never be used for them.
const CURSOR_PAGING_EXCLUDED: &[&str] = &["search_api_task"];

pub struct TableHarvester {
    source: Arc<dyn RowSource>,
    state: Arc<dyn StateStore>,
    config: DatasourceConfig,
    context: TrackingContext,
}

impl TableHarvester {
    pub fn new(
        source: Arc<dyn RowSource>,
        state: Arc<dyn StateStore>,
        config: DatasourceConfig,
        context: TrackingContext,
    ) -> Self {
        Self {
            source,
            state,
            config,
            context,
        }
    }

    fn cursor_paging_allowed(&self) -> bool {
        self.source.supports_cursor_conditions()
            && !CURSOR_PAGING_EXCLUDED.contains(&self.context.datasource_id.as_str())
    }

    /// Enumerate row identifiers eligible for indexing.
    ///
    /// `page: None` returns every eligible identifier in one call and never
    /// touches cursor state. With a page number, exactly one page of
    /// `tracking_page_size` identifiers is fetched, ascending by id, and
    /// the context's cursor is updated: upserted after a non-empty page,
    /// deleted once a page comes back empty (harvest exhausted).
    ///
    /// Returns `Ok(None)` when no identifiers matched — the signal that a
    /// paged harvest is finished and a future page 0 starts fresh.
    pub async fn get_item_ids(&self, page: Option<u64>) -> Result<Option<Vec<i64>>> {
        let Some(page) = page else {
            let ids = self.source.select_ids(0, None, None).await?;
            return Ok(if ids.is_empty() { None } else { Some(ids) });
        };

        let page_size = self.config.page_size()?;
        let state_key = self.context.state_key();
        let cursor = state::load_cursor(self.state.as_ref(), &state_key).await?;

        let mut offset = page as i64 * page_size;
        let mut after_id = None;
        if page > 0 && self.cursor_paging_allowed() {
            // Only the pick-up-where-the-last-page-left-off case can use
            // the faster continuation; any other cursor is stale.
            if let Some(cursor) = &cursor {
                if cursor.page == page - 1 {
                    after_id = Some(cursor.last_id);
                    offset = 0;
                }
            }
        }

        let ids = self
            .source
            .select_ids(offset, Some(page_size), after_id)
            .await?;

        tracing::debug!(
            page,
            offset,
            ?after_id,
            count = ids.len(),
            "harvested id page"
        );

        let Some(&last_id) = ids.last() else {
            state::clear_cursor(self.state.as_ref(), &state_key).await?;
            return Ok(None);
        };

        state::store_cursor(self.state.as_ref(), &state_key, &CursorState { page, last_id })
            .await?;
        Ok(Some(ids))
    }

    /// Load the given rows as validated documents, keyed by identifier.
    ///
    /// A row failing schema validation fails only itself; it is skipped
    /// with a warning and the rest of the batch loads normally.
    pub async fn load_multiple(&self, ids: &[i64]) -> Result<BTreeMap<i64, RowDocument>> {
        let rows = self.source.load_rows(ids).await?;

        let mut items = BTreeMap::new();
        for raw in rows {
            let doc = match RowDocument::from_row(raw) {
                Ok(doc) => doc,
                Err(err) => {
                    tracing::warn!(%err, "skipping row that failed schema validation");
                    continue;
                }
            };
            let id = match doc.item_id() {
                Ok(id) => id,
                Err(err) => {
                    tracing::warn!(%err, "skipping row without a usable identifier");
                    continue;
                }
            };
            let label = item_label(id, &self.config.hash_salt)?;
            items.insert(id, doc.with_label(label));
        }
        Ok(items)
    }
}

/// Salted per-item label, unique per row identifier.
fn item_label(id: i64, salt: &str) -> Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(salt.as_bytes())
        .map_err(|err| anyhow::anyhow!("invalid hash salt: {err}"))?;
    mac.update(id.to_string().as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
