//! Terminal-session retention.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use consult_core::limits::TERMINAL_RETENTION_HOURS;
use consult_core::{CallSession, CallStatus, Result};
use docstore::{DocumentStore, Filter};
use signaling::CallSignaling;

/// Deletes terminal call sessions past the retention age.
///
/// Nothing in the call flow ever deletes a session, so terminal records
/// accumulate until this sweep removes them.
pub struct RetentionWorker {
    store: Arc<dyn DocumentStore>,
    signaling: Arc<CallSignaling>,
}

impl RetentionWorker {
    pub fn new(store: Arc<dyn DocumentStore>, signaling: Arc<CallSignaling>) -> Self {
        Self { store, signaling }
    }

    /// One sweep over the terminal statuses.
    pub async fn run(&self) -> Result<()> {
        let cutoff = Utc::now() - Duration::hours(TERMINAL_RETENTION_HOURS);
        let mut deleted = 0u64;

        for status in [
            CallStatus::Rejected,
            CallStatus::Missed,
            CallStatus::Ended,
            CallStatus::Cancelled,
        ] {
            let docs = self
                .store
                .query(
                    CallSession::COLLECTION,
                    &Filter::eq("status", status.as_str()),
                )
                .await?;

            for doc in docs {
                let session: CallSession = match doc.decode() {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(doc_id = %doc.id, error = %e, "skipping undecodable call session");
                        continue;
                    }
                };
                let expired = session.ended_at.is_some_and(|t| t < cutoff);
                if !expired {
                    continue;
                }

                match self.signaling.delete_call_session(&session.id).await {
                    Ok(()) => deleted += 1,
                    Err(e) => {
                        warn!(session_id = %session.id, error = %e, "failed to delete old session");
                    }
                }
            }
        }

        if deleted > 0 {
            info!(deleted, "deleted terminal sessions past retention");
        }
        Ok(())
    }
}
