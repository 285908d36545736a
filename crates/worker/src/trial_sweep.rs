//! Trial expiry sweep.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use consult_core::{Result, TrialRecord};
use docstore::{DocumentStore, Filter};
use telemetry::metrics;
use trial::service::disable_chat_for_session;

/// Disables chat for trials whose window closed without a client noticing.
///
/// The per-client ticker normally does this, but it dies with the client
/// process; the sweep is the authority that makes expiry stick.
pub struct TrialSweepWorker {
    store: Arc<dyn DocumentStore>,
}

impl TrialSweepWorker {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// One sweep over the still-active trials.
    pub async fn run(&self) -> Result<()> {
        let docs = self
            .store
            .query(TrialRecord::COLLECTION, &Filter::eq("active", true))
            .await?;
        let now = Utc::now();
        let mut swept = 0u64;

        for doc in docs {
            let record: TrialRecord = match doc.decode() {
                Ok(r) => r,
                Err(e) => {
                    warn!(doc_id = %doc.id, error = %e, "skipping undecodable trial record");
                    continue;
                }
            };
            if record.ends_at > now {
                continue;
            }

            match disable_chat_for_session(self.store.as_ref(), &record.session_id).await {
                Ok(()) => {
                    metrics().trials_expired.inc();
                    swept += 1;
                }
                Err(e) => {
                    warn!(session_id = %record.session_id, error = %e, "failed to sweep expired trial");
                }
            }
        }

        if swept > 0 {
            info!(swept, "disabled chat for expired trials");
        }
        Ok(())
    }
}
