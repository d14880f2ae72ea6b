use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use rowdex::config::{Config, DatasourceConfig, DbConfig};
use rowdex::context::DATASOURCE_ID;
use rowdex::db;
use rowdex::document::{FieldValue, RowDocument};
use rowdex::registry::{
    IndexDatasourceConfig, IndexHandle, IndexRegistry, LanguageRules, StaticIndexRegistry,
};
use rowdex::rows::SqliteRowSource;
use rowdex::tracking::{filter_valid_item_ids, TrackingManager};

/// Index handle that records every tracking call it receives.
struct MockIndex {
    id: String,
    declares_datasource: bool,
    config: IndexDatasourceConfig,
    fail: bool,
    events: Mutex<Vec<(String, Vec<i64>)>>,
}

impl MockIndex {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            declares_datasource: true,
            config: IndexDatasourceConfig::default(),
            fail: false,
            events: Mutex::new(Vec::new()),
        }
    }

    fn not_declaring(mut self) -> Self {
        self.declares_datasource = false;
        self
    }

    fn with_language_restriction(mut self) -> Self {
        self.config = IndexDatasourceConfig {
            languages: Some(LanguageRules {
                selected: vec!["en".to_string()],
            }),
        };
        self
    }

    fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    fn record(&self, kind: &str, ids: &[i64]) -> Result<()> {
        if self.fail {
            anyhow::bail!("index '{}' is offline", self.id);
        }
        self.events
            .lock()
            .unwrap()
            .push((kind.to_string(), ids.to_vec()));
        Ok(())
    }

    fn events(&self) -> Vec<(String, Vec<i64>)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl IndexHandle for MockIndex {
    fn index_id(&self) -> &str {
        &self.id
    }

    fn is_valid_datasource(&self, datasource_id: &str) -> bool {
        self.declares_datasource && datasource_id == DATASOURCE_ID
    }

    fn configuration(&self, datasource_id: &str) -> Option<IndexDatasourceConfig> {
        self.is_valid_datasource(datasource_id)
            .then(|| self.config.clone())
    }

    async fn track_items_inserted(&self, _datasource_id: &str, ids: &[i64]) -> Result<()> {
        self.record("inserted", ids)
    }

    async fn track_items_updated(&self, _datasource_id: &str, ids: &[i64]) -> Result<()> {
        self.record("updated", ids)
    }

    async fn track_items_deleted(&self, _datasource_id: &str, ids: &[i64]) -> Result<()> {
        self.record("deleted", ids)
    }
}

/// Registry whose storage backend cannot be resolved.
struct BrokenRegistry;

#[async_trait]
impl IndexRegistry for BrokenRegistry {
    async fn load_all(&self) -> Result<BTreeMap<String, Arc<dyn IndexHandle>>> {
        anyhow::bail!("index storage plugin missing")
    }
}

fn doc_with_id(id: i64) -> RowDocument {
    RowDocument::from_row(BTreeMap::from([
        ("id".to_string(), FieldValue::Integer(id)),
        ("name".to_string(), FieldValue::Text("A".to_string())),
        ("url".to_string(), FieldValue::Uri("http://x".to_string())),
        ("description".to_string(), FieldValue::Text("d".to_string())),
        ("price".to_string(), FieldValue::Float(9.5)),
        ("category".to_string(), FieldValue::Text("c".to_string())),
    ]))
    .unwrap()
}

fn manager_with(indexes: Vec<Arc<MockIndex>>) -> TrackingManager {
    let mut registry = StaticIndexRegistry::new();
    for index in indexes {
        registry.register(index);
    }
    TrackingManager::new(Arc::new(registry))
}

#[tokio::test]
async fn insert_notifies_every_declaring_index() {
    let products = Arc::new(MockIndex::new("products"));
    let archive = Arc::new(MockIndex::new("archive"));
    let unrelated = Arc::new(MockIndex::new("unrelated").not_declaring());
    let manager = manager_with(vec![products.clone(), archive.clone(), unrelated.clone()]);

    let report = manager.data_insert(&doc_with_id(7)).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.notified, vec!["archive", "products"]);
    assert_eq!(products.events(), vec![("inserted".to_string(), vec![7])]);
    assert_eq!(archive.events(), vec![("inserted".to_string(), vec![7])]);
    assert!(unrelated.events().is_empty());
}

#[tokio::test]
async fn update_and_insert_emit_distinct_notifications() {
    let index = Arc::new(MockIndex::new("products"));
    let manager = manager_with(vec![index.clone()]);

    manager.data_insert(&doc_with_id(1)).await.unwrap();
    manager.data_update(&doc_with_id(1)).await.unwrap();

    assert_eq!(
        index.events(),
        vec![
            ("inserted".to_string(), vec![1]),
            ("updated".to_string(), vec![1]),
        ]
    );
}

#[tokio::test]
async fn delete_bypasses_validity_filtering() {
    let restricted = Arc::new(MockIndex::new("restricted").with_language_restriction());
    let manager = manager_with(vec![restricted.clone()]);

    let report = manager.data_delete(&doc_with_id(5)).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(restricted.events(), vec![("deleted".to_string(), vec![5])]);
}

#[tokio::test]
async fn language_restriction_filter_is_identity_for_this_data() {
    let restricted = MockIndex::new("restricted").with_language_restriction();
    assert_eq!(
        filter_valid_item_ids(&restricted, DATASOURCE_ID, &[1, 2, 3]),
        vec![1, 2, 3]
    );

    let plain = MockIndex::new("plain");
    assert_eq!(filter_valid_item_ids(&plain, DATASOURCE_ID, &[4]), vec![4]);
}

#[tokio::test]
async fn one_failing_index_does_not_block_the_rest() {
    let offline = Arc::new(MockIndex::new("a_offline").failing());
    let healthy = Arc::new(MockIndex::new("b_healthy"));
    let manager = manager_with(vec![offline.clone(), healthy.clone()]);

    let report = manager.data_update(&doc_with_id(2)).await.unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.notified, vec!["b_healthy"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index_id, "a_offline");
    assert_eq!(healthy.events(), vec![("updated".to_string(), vec![2])]);
}

#[tokio::test]
async fn zero_interested_indexes_is_a_successful_noop() {
    let manager = manager_with(vec![]);
    let report = manager.data_insert(&doc_with_id(1)).await.unwrap();
    assert!(report.is_complete());
    assert!(report.notified.is_empty());
}

#[tokio::test]
async fn unresolvable_registry_degrades_to_noop() {
    let manager = TrackingManager::new(Arc::new(BrokenRegistry));
    let report = manager.data_insert(&doc_with_id(1)).await.unwrap();
    assert!(report.is_complete());
    assert!(report.notified.is_empty());
}

#[tokio::test]
async fn update_and_track_applies_and_notifies() {
    let tmp = TempDir::new().unwrap();
    let config = Config {
        db: DbConfig {
            path: tmp.path().join("rowdex.sqlite"),
        },
        datasource: DatasourceConfig {
            main_table: "my_custom_table".to_string(),
            tracking_page_size: Some(100),
            hash_salt: "test-salt".to_string(),
        },
    };
    let pool = db::connect(&config).await.unwrap();
    sqlx::query(
        "CREATE TABLE my_custom_table (
            id INTEGER PRIMARY KEY, name TEXT, url TEXT,
            description TEXT, price REAL, category TEXT
        )",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO my_custom_table VALUES (1, 'old', 'http://x', 'd', 1.0, 'c')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let index = Arc::new(MockIndex::new("products"));
    let manager = manager_with(vec![index.clone()]);
    let source = SqliteRowSource::new(pool.clone(), "my_custom_table").unwrap();

    let report = manager
        .update_and_track(
            &source,
            1,
            &[("name".to_string(), FieldValue::Text("new".to_string()))],
        )
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(index.events(), vec![("updated".to_string(), vec![1])]);

    let name: String = sqlx::query_scalar("SELECT name FROM my_custom_table WHERE id = 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(name, "new");

    // Updating a missing row tracks nothing.
    let report = manager
        .update_and_track(
            &source,
            99,
            &[("name".to_string(), FieldValue::Text("x".to_string()))],
        )
        .await
        .unwrap();
    assert!(report.notified.is_empty());
    assert_eq!(index.events().len(), 1);
}
