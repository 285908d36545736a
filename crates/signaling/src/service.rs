//! The signaling service.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use validator::Validate;

use consult_core::{CallKind, CallSession, CallStatus, Error, Participant, Result};
use docstore::{DocumentStore, Filter};
use telemetry::metrics;

use crate::subscription::{CallWatch, IncomingCalls};

/// Call lifecycle coordinator over the shared document store.
///
/// Every transition is written compare-and-swap against the version the
/// client read, so two participants racing on the same session (caller
/// cancels while callee accepts) resolve deterministically: the loser gets
/// `Error::Conflict` and re-reads instead of silently clobbering a
/// terminal status. No write is retried automatically; the user re-triggers
/// the action.
pub struct CallSignaling {
    store: Arc<dyn DocumentStore>,
}

impl CallSignaling {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Creates the shared session document with status `calling` and
    /// returns its id (also the media channel name).
    ///
    /// On a store failure the session does not exist and the caller must
    /// abort call setup.
    pub async fn create_call_session(
        &self,
        caller: Participant,
        callee: Participant,
        kind: CallKind,
        rate_per_minute: u32,
    ) -> Result<String> {
        let session = CallSession::new(caller, callee, kind, rate_per_minute);
        session.validate()?;

        let value = serde_json::to_value(&session)?;
        self.store
            .create(CallSession::COLLECTION, &session.id, value)
            .await?;

        metrics().calls_created.inc();
        info!(
            session_id = %session.id,
            kind = ?session.kind,
            rate = session.rate_per_minute,
            "call session created"
        );
        Ok(session.id)
    }

    /// Reads one session.
    pub async fn get_call_session(&self, id: &str) -> Result<CallSession> {
        let doc = self
            .store
            .get(CallSession::COLLECTION, id)
            .await?
            .ok_or_else(|| Error::not_found(format!("call session {id}")))?;
        doc.decode()
    }

    /// Caller has joined the media channel and the callee device is being
    /// alerted. Informational, not required for acceptance.
    pub async fn mark_ringing(&self, id: &str) -> Result<CallSession> {
        self.transition(id, CallStatus::Ringing, None).await
    }

    /// Callee answers. Stamps the start time billing runs from.
    pub async fn accept_call(&self, id: &str) -> Result<CallSession> {
        self.transition(id, CallStatus::Accepted, None).await
    }

    /// Callee declines before answering.
    pub async fn reject_call(&self, id: &str) -> Result<CallSession> {
        self.transition(id, CallStatus::Rejected, None).await
    }

    /// Either party hangs up before the call was accepted.
    pub async fn cancel_call(&self, id: &str) -> Result<CallSession> {
        self.transition(id, CallStatus::Cancelled, None).await
    }

    /// The timeout authority gave up waiting for an answer.
    pub async fn mark_call_missed(&self, id: &str) -> Result<CallSession> {
        self.transition(id, CallStatus::Missed, None).await
    }

    /// Either party hangs up an accepted call, reporting the elapsed
    /// duration. Stamps the end time and the derived cost.
    pub async fn end_call(&self, id: &str, duration_secs: u32) -> Result<CallSession> {
        self.transition(id, CallStatus::Ended, Some(duration_secs))
            .await
    }

    /// Mid-call periodic stamp of duration and running cost, without a
    /// status change. Only meaningful on an accepted call.
    pub async fn update_call_duration_and_cost(
        &self,
        id: &str,
        duration_secs: u32,
    ) -> Result<CallSession> {
        let doc = self
            .store
            .get(CallSession::COLLECTION, id)
            .await?
            .ok_or_else(|| Error::not_found(format!("call session {id}")))?;
        let mut session: CallSession = doc.decode()?;
        session.set_billing(duration_secs);

        let patch = serde_json::to_value(&session)?;
        let updated = self
            .store
            .update(CallSession::COLLECTION, id, patch, Some(doc.version))
            .await?;
        updated.decode()
    }

    /// Removes a session document. Not part of the normal call flow; used
    /// by the retention authority.
    pub async fn delete_call_session(&self, id: &str) -> Result<()> {
        self.store.delete(CallSession::COLLECTION, id).await
    }

    /// Watches every session addressed to `user_id` as callee.
    ///
    /// Snapshots in `calling` state ring the phone; everything else is a
    /// status update for a call screen already showing. The watch must be
    /// alive to learn of new calls.
    pub async fn incoming_calls(&self, user_id: &str) -> Result<IncomingCalls> {
        let watch = self
            .store
            .watch_query(CallSession::COLLECTION, Filter::eq("callee.id", user_id))
            .await?;
        debug!(user_id, "incoming-call watch started");
        Ok(IncomingCalls::new(watch))
    }

    /// Watches one session's snapshots, used by the call screen to react
    /// to the other party's actions.
    pub async fn watch_call(&self, id: &str) -> Result<CallWatch> {
        let watch = self.store.watch_document(CallSession::COLLECTION, id).await?;
        Ok(CallWatch::new(watch))
    }

    /// Reads, validates, and compare-and-swap writes one status transition.
    async fn transition(
        &self,
        id: &str,
        next: CallStatus,
        duration_secs: Option<u32>,
    ) -> Result<CallSession> {
        let doc = self
            .store
            .get(CallSession::COLLECTION, id)
            .await?
            .ok_or_else(|| Error::not_found(format!("call session {id}")))?;
        let mut session: CallSession = doc.decode()?;

        let changed = session.apply_status(next, Utc::now())?;
        if let Some(secs) = duration_secs {
            session.set_billing(secs);
        }
        if !changed && duration_secs.is_none() {
            // Idempotent re-apply (double hang-up, double reject): nothing
            // to write.
            debug!(session_id = id, status = %next, "transition already applied");
            return Ok(session);
        }

        let patch = serde_json::to_value(&session)?;
        match self
            .store
            .update(CallSession::COLLECTION, id, patch, Some(doc.version))
            .await
        {
            Ok(updated) => {
                self.record_transition(next);
                info!(session_id = id, status = %next, "call transition");
                updated.decode()
            }
            Err(e) => {
                if e.is_conflict() {
                    metrics().transition_conflicts.inc();
                    warn!(session_id = id, status = %next, "transition lost a write race");
                }
                Err(e)
            }
        }
    }

    fn record_transition(&self, status: CallStatus) {
        let m = metrics();
        match status {
            CallStatus::Accepted => m.calls_accepted.inc(),
            CallStatus::Rejected => m.calls_rejected.inc(),
            CallStatus::Missed => m.calls_missed.inc(),
            CallStatus::Ended => m.calls_ended.inc(),
            CallStatus::Cancelled => m.calls_cancelled.inc(),
            CallStatus::Calling | CallStatus::Ringing => {}
        }
    }
}
