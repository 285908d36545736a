//! Watch handles the call UI consumes.

use tracing::warn;

use consult_core::{CallSession, CallStatus};
use docstore::{DocumentChange, DocumentWatch, QueryWatch};

/// One notification from the callee-side incoming watch.
#[derive(Debug, Clone)]
pub enum IncomingCall {
    /// A session in `calling` state: the device should ring.
    Ring(CallSession),
    /// Any other change to a session addressed to this user.
    Update(CallSession),
}

impl IncomingCall {
    pub fn session(&self) -> &CallSession {
        match self {
            Self::Ring(s) | Self::Update(s) => s,
        }
    }
}

/// Watch over every call session addressed to one user.
///
/// Dropping the handle unsubscribes.
pub struct IncomingCalls {
    inner: QueryWatch,
}

impl IncomingCalls {
    pub(crate) fn new(inner: QueryWatch) -> Self {
        Self { inner }
    }

    /// Waits for the next snapshot. Returns `None` once the store is gone.
    ///
    /// Snapshots that fail to decode are skipped rather than killing the
    /// subscription loop.
    pub async fn next(&mut self) -> Option<IncomingCall> {
        while let Some(doc) = self.inner.next().await {
            match doc.decode::<CallSession>() {
                Ok(session) if session.status == CallStatus::Calling => {
                    return Some(IncomingCall::Ring(session))
                }
                Ok(session) => return Some(IncomingCall::Update(session)),
                Err(e) => {
                    warn!(doc_id = %doc.id, error = %e, "skipping undecodable call session");
                }
            }
        }
        None
    }
}

/// Watch over a single call session.
///
/// Dropping the handle unsubscribes.
pub struct CallWatch {
    inner: DocumentWatch,
}

impl CallWatch {
    pub(crate) fn new(inner: DocumentWatch) -> Self {
        Self { inner }
    }

    /// Waits for the next session snapshot. Returns `None` once the
    /// document is deleted or the store is gone.
    pub async fn next(&mut self) -> Option<CallSession> {
        while let Some(change) = self.inner.next().await {
            match change {
                DocumentChange::Updated(doc) => match doc.decode::<CallSession>() {
                    Ok(session) => return Some(session),
                    Err(e) => {
                        warn!(doc_id = %doc.id, error = %e, "skipping undecodable call session");
                    }
                },
                DocumentChange::Deleted { .. } => return None,
            }
        }
        None
    }
}
