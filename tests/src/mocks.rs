//! Fault-injection wrappers for testing error paths.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use consult_core::{Error, Result};
use docstore::{Document, DocumentStore, DocumentWatch, Filter, QueryWatch};

/// Store wrapper that injects failures.
///
/// Delegates to the wrapped store until a failure mode is switched on,
/// letting tests verify that signaling and trial logic fail closed instead
/// of panicking or corrupting state.
pub struct FlakyStore {
    inner: Arc<dyn DocumentStore>,
    fail_reads: Mutex<bool>,
    fail_writes: Mutex<bool>,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self {
            inner,
            fail_reads: Mutex::new(false),
            fail_writes: Mutex::new(false),
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.lock() = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    fn check_read(&self) -> Result<()> {
        if *self.fail_reads.lock() {
            return Err(Error::store("injected read failure"));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        if *self.fail_writes.lock() {
            return Err(Error::store("injected write failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn create(
        &self,
        collection: &str,
        id: &str,
        value: serde_json::Value,
    ) -> Result<Document> {
        self.check_write()?;
        self.inner.create(collection, id, value).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.check_read()?;
        self.inner.get(collection, id).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: serde_json::Value,
        expected_version: Option<u64>,
    ) -> Result<Document> {
        self.check_write()?;
        self.inner.update(collection, id, patch, expected_version).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.check_write()?;
        self.inner.delete(collection, id).await
    }

    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        self.check_read()?;
        self.inner.query(collection, filter).await
    }

    async fn watch_document(&self, collection: &str, id: &str) -> Result<DocumentWatch> {
        self.check_read()?;
        self.inner.watch_document(collection, id).await
    }

    async fn watch_query(&self, collection: &str, filter: Filter) -> Result<QueryWatch> {
        self.check_read()?;
        self.inner.watch_query(collection, filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn delegates_until_failure_mode() {
        let flaky = FlakyStore::new(Arc::new(MemoryStore::new()));

        flaky.create("things", "t1", json!({"a": 1})).await.unwrap();
        assert!(flaky.get("things", "t1").await.unwrap().is_some());

        flaky.set_fail_reads(true);
        assert!(flaky.get("things", "t1").await.is_err());

        flaky.set_fail_reads(false);
        assert!(flaky.get("things", "t1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn write_failures_do_not_land() {
        let flaky = FlakyStore::new(Arc::new(MemoryStore::new()));
        flaky.set_fail_writes(true);

        assert!(flaky.create("things", "t1", json!({})).await.is_err());

        flaky.set_fail_writes(false);
        assert!(flaky.get("things", "t1").await.unwrap().is_none());
    }
}
