//! The store trait and snapshot subscription handles.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::warn;

use consult_core::Result;

use crate::document::{Document, Filter};

/// Change event delivered to watchers.
#[derive(Debug, Clone)]
pub enum DocumentChange {
    /// Full snapshot after a create or update.
    Updated(Document),
    /// The document was deleted.
    Deleted { id: String },
}

/// Document create/read/update/delete with equality-filter queries and
/// snapshot subscriptions.
///
/// Writes can carry an expected version; a mismatch fails the write with
/// `Error::Conflict` instead of silently overwriting a concurrent writer.
/// Subscriptions deliver full snapshots at-least-once; rapid successive
/// writes may coalesce, so watchers must treat each snapshot as the current
/// state rather than a log entry.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates a document. Fails with `AlreadyExists` on a duplicate id.
    async fn create(&self, collection: &str, id: &str, value: serde_json::Value)
        -> Result<Document>;

    /// Reads one document.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Merges `patch` (a JSON object) into the document's top-level fields.
    ///
    /// With `expected_version`, the write is a compare-and-swap: it fails
    /// with `Error::Conflict` when the stored version differs. Returns the
    /// new snapshot.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: serde_json::Value,
        expected_version: Option<u64>,
    ) -> Result<Document>;

    /// Deletes a document. Deleting an absent document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Returns all documents matching an equality filter.
    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>>;

    /// Subscribes to one document's snapshots.
    async fn watch_document(&self, collection: &str, id: &str) -> Result<DocumentWatch>;

    /// Subscribes to snapshots of every document matching `filter`.
    async fn watch_query(&self, collection: &str, filter: Filter) -> Result<QueryWatch>;
}

/// Subscription to one document. Dropping the handle unsubscribes.
pub struct DocumentWatch {
    pub(crate) rx: broadcast::Receiver<DocumentChange>,
}

impl DocumentWatch {
    /// Waits for the next change. Returns `None` once the store is gone.
    ///
    /// A slow consumer may miss intermediate snapshots; the watch then skips
    /// ahead to the next one, matching the latest-snapshot delivery of the
    /// backing store.
    pub async fn next(&mut self) -> Option<DocumentChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "document watch lagged, skipping to latest");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Subscription to every document matching a filter. Dropping the handle
/// unsubscribes.
pub struct QueryWatch {
    pub(crate) filter: Filter,
    pub(crate) rx: broadcast::Receiver<DocumentChange>,
}

impl QueryWatch {
    /// Waits for the next snapshot of a matching document.
    pub async fn next(&mut self) -> Option<Document> {
        loop {
            match self.rx.recv().await {
                Ok(DocumentChange::Updated(doc)) if self.filter.matches(&doc.data) => {
                    return Some(doc)
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "query watch lagged, skipping to latest");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
