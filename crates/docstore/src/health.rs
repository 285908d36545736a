//! Store health probe.

use serde_json::json;
use tracing::warn;

use crate::store::DocumentStore;

const PROBE_COLLECTION: &str = "_health_probe";

/// Verifies the store can serve a write/read/delete roundtrip.
pub async fn check_connection(store: &dyn DocumentStore) -> bool {
    let id = format!("probe-{}", chrono::Utc::now().timestamp_millis());

    let created = store
        .create(PROBE_COLLECTION, &id, json!({"ok": true}))
        .await;
    if let Err(e) = created {
        warn!(error = %e, "store health probe write failed");
        return false;
    }

    let read_ok = matches!(store.get(PROBE_COLLECTION, &id).await, Ok(Some(_)));
    if !read_ok {
        warn!("store health probe read failed");
    }

    if let Err(e) = store.delete(PROBE_COLLECTION, &id).await {
        warn!(error = %e, "store health probe cleanup failed");
    }

    read_ok
}
