//! In-process store implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::broadcast;

use consult_core::{Error, Result};

use crate::config::StoreConfig;
use crate::document::{Document, Filter};
use crate::store::{DocumentChange, DocumentStore, DocumentWatch, QueryWatch};

#[derive(Default)]
struct CollectionState {
    docs: HashMap<String, Document>,
    /// Collection-wide channel feeding query watches. Created lazily.
    changes: Option<broadcast::Sender<DocumentChange>>,
    /// Per-document channels, created on first watch.
    doc_channels: HashMap<String, broadcast::Sender<DocumentChange>>,
}

impl CollectionState {
    fn notify(&mut self, id: &str, change: DocumentChange) {
        if let Some(tx) = self.doc_channels.get(id) {
            if tx.receiver_count() == 0 {
                self.doc_channels.remove(id);
            } else {
                let _ = tx.send(change.clone());
            }
        }
        if let Some(tx) = &self.changes {
            if tx.receiver_count() == 0 {
                self.changes = None;
            } else {
                let _ = tx.send(change);
            }
        }
    }
}

/// In-memory `DocumentStore` with snapshot fan-out over broadcast channels.
///
/// The daemon's default backend, and the store every test runs against.
/// All operations complete synchronously under a `parking_lot` lock; the
/// async trait surface exists for the remote backends that replace this in
/// production deployments.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, CollectionState>>,
    watch_capacity: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_config(&StoreConfig::default())
    }

    pub fn with_config(config: &StoreConfig) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            watch_capacity: config.watch_capacity,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(
        &self,
        collection: &str,
        id: &str,
        value: serde_json::Value,
    ) -> Result<Document> {
        if !value.is_object() {
            return Err(Error::validation("document payload must be a JSON object"));
        }

        let mut collections = self.collections.write();
        let state = collections.entry(collection.to_string()).or_default();
        if state.docs.contains_key(id) {
            return Err(Error::already_exists(format!("{collection}/{id}")));
        }

        let doc = Document {
            id: id.to_string(),
            version: 1,
            data: value,
            updated_at: Utc::now(),
        };
        state.docs.insert(id.to_string(), doc.clone());
        state.notify(id, DocumentChange::Updated(doc.clone()));
        Ok(doc)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|state| state.docs.get(id))
            .cloned())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: serde_json::Value,
        expected_version: Option<u64>,
    ) -> Result<Document> {
        let Some(patch) = patch.as_object() else {
            return Err(Error::validation("update patch must be a JSON object"));
        };

        let mut collections = self.collections.write();
        let state = collections
            .get_mut(collection)
            .ok_or_else(|| Error::not_found(format!("{collection}/{id}")))?;
        let doc = state
            .docs
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("{collection}/{id}")))?;

        if let Some(expected) = expected_version {
            if doc.version != expected {
                return Err(Error::Conflict {
                    collection: collection.to_string(),
                    id: id.to_string(),
                    expected,
                    found: doc.version,
                });
            }
        }

        let fields = doc
            .data
            .as_object_mut()
            .ok_or_else(|| Error::internal("stored document is not an object"))?;
        for (key, value) in patch {
            fields.insert(key.clone(), value.clone());
        }
        doc.version += 1;
        doc.updated_at = Utc::now();

        let snapshot = doc.clone();
        state.notify(id, DocumentChange::Updated(snapshot.clone()));
        Ok(snapshot)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let mut collections = self.collections.write();
        if let Some(state) = collections.get_mut(collection) {
            if state.docs.remove(id).is_some() {
                state.notify(id, DocumentChange::Deleted { id: id.to_string() });
            }
        }
        Ok(())
    }

    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .map(|state| {
                state
                    .docs
                    .values()
                    .filter(|doc| filter.matches(&doc.data))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn watch_document(&self, collection: &str, id: &str) -> Result<DocumentWatch> {
        let mut collections = self.collections.write();
        let state = collections.entry(collection.to_string()).or_default();
        let tx = state
            .doc_channels
            .entry(id.to_string())
            .or_insert_with(|| broadcast::channel(self.watch_capacity).0);
        Ok(DocumentWatch { rx: tx.subscribe() })
    }

    async fn watch_query(&self, collection: &str, filter: Filter) -> Result<QueryWatch> {
        let mut collections = self.collections.write();
        let state = collections.entry(collection.to_string()).or_default();
        let tx = state
            .changes
            .get_or_insert_with(|| broadcast::channel(self.watch_capacity).0);
        Ok(QueryWatch {
            filter,
            rx: tx.subscribe(),
        })
    }
}
