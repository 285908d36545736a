//! Missed-call timeout authority.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use consult_core::limits::RING_TIMEOUT_SECS;
use consult_core::{CallSession, CallStatus, Error, Result};
use docstore::{DocumentStore, Filter};
use signaling::CallSignaling;

/// Marks calls nobody answered as `missed`.
///
/// The callee only learns of a call while its incoming watch is running,
/// so an unattended device leaves sessions stuck in `calling`/`ringing`
/// forever. Each sweep moves sessions older than the ring timeout to
/// `missed`; a participant who answers concurrently wins the CAS race and
/// the sweep backs off.
pub struct MissedCallWorker {
    store: Arc<dyn DocumentStore>,
    signaling: Arc<CallSignaling>,
}

impl MissedCallWorker {
    pub fn new(store: Arc<dyn DocumentStore>, signaling: Arc<CallSignaling>) -> Self {
        Self { store, signaling }
    }

    /// One sweep over the unanswered statuses.
    pub async fn run(&self) -> Result<()> {
        let cutoff = Utc::now() - Duration::seconds(RING_TIMEOUT_SECS);
        let mut marked = 0u64;

        for status in [CallStatus::Calling, CallStatus::Ringing] {
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
                if session.created_at > cutoff {
                    continue;
                }

                match self.signaling.mark_call_missed(&session.id).await {
                    Ok(_) => marked += 1,
                    Err(e)
                        if e.is_conflict()
                            || matches!(e, Error::InvalidTransition { .. })
                            || e.is_not_found() =>
                    {
                        // A participant got there first.
                        debug!(session_id = %session.id, "missed-call sweep lost the race");
                    }
                    Err(e) => {
                        warn!(session_id = %session.id, error = %e, "failed to mark call missed");
                    }
                }
            }
        }

        if marked > 0 {
            info!(marked, "marked unanswered calls as missed");
        }
        Ok(())
    }
}
