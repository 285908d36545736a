//! Call session types and the status state machine.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::billing::call_cost;
use crate::error::{Error, Result};

/// Kind of media carried by a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Audio,
    Video,
}

/// Lifecycle status of a call session.
///
/// `Calling` is the initial status written by the caller. `Ringing` is
/// informational, set once the caller has joined the media channel. The
/// last four statuses are terminal: once written, no further transition
/// is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Calling,
    Ringing,
    Accepted,
    Rejected,
    Missed,
    Ended,
    Cancelled,
}

impl CallStatus {
    /// Returns the status as the string stored in documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calling => "calling",
            Self::Ringing => "ringing",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Missed => "missed",
            Self::Ended => "ended",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further transition is accepted from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::Missed | Self::Ended | Self::Cancelled
        )
    }

    /// Whether moving to `next` is a legal transition.
    ///
    /// `Ended` requires an accepted call; hanging up earlier is `Cancelled`.
    /// `Missed` is reserved for the timeout authority and only applies while
    /// the callee has not answered.
    pub fn can_transition_to(&self, next: CallStatus) -> bool {
        use CallStatus::*;
        matches!(
            (self, next),
            (Calling, Ringing | Accepted | Rejected | Missed | Cancelled)
                | (Ringing, Accepted | Rejected | Missed | Cancelled)
                | (Accepted, Ended)
        )
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One party in a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Participant {
    #[validate(length(min = 1, max = 64))]
    pub id: String,
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(max = 2048))]
    pub avatar_url: Option<String>,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar_url: None,
        }
    }
}

/// A single call attempt between two users.
///
/// This is the shared document both participants' clients mutate; its id
/// doubles as the media channel name.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CallSession {
    pub id: String,
    #[validate(nested)]
    pub caller: Participant,
    #[validate(nested)]
    pub callee: Participant,
    pub kind: CallKind,
    /// Agreed rate in whole currency units per minute.
    #[validate(range(min = 1, max = 100_000))]
    pub rate_per_minute: u32,
    pub status: CallStatus,
    pub created_at: DateTime<Utc>,
    /// Stamped when the callee accepts.
    pub started_at: Option<DateTime<Utc>>,
    /// Stamped on any terminal transition.
    pub ended_at: Option<DateTime<Utc>>,
    /// Accumulated call duration in seconds, reported by the ending client.
    #[serde(default)]
    pub duration_secs: u32,
    /// Cost derived from `duration_secs` and `rate_per_minute`.
    #[serde(default)]
    pub total_cost: u64,
}

impl CallSession {
    /// Store collection holding call session documents.
    pub const COLLECTION: &'static str = "call_sessions";

    /// Creates a new session in the initial `Calling` status.
    pub fn new(
        caller: Participant,
        callee: Participant,
        kind: CallKind,
        rate_per_minute: u32,
    ) -> Self {
        let id = generate_call_id(&caller.id, &callee.id);
        Self {
            id,
            caller,
            callee,
            kind,
            rate_per_minute,
            status: CallStatus::Calling,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            duration_secs: 0,
            total_cost: 0,
        }
    }

    /// The media channel name for this call.
    pub fn channel_name(&self) -> &str {
        &self.id
    }

    /// Applies a status transition, stamping the timestamp the new status
    /// requires.
    ///
    /// Returns `Ok(false)` when the session is already in `next` (an
    /// idempotent re-apply, common when both parties hang up at once) and
    /// `Ok(true)` when the status changed. Any other move out of a terminal
    /// status, or a move the state machine does not allow, is
    /// `Error::InvalidTransition`.
    pub fn apply_status(&mut self, next: CallStatus, at: DateTime<Utc>) -> Result<bool> {
        if self.status == next {
            return Ok(false);
        }
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next == CallStatus::Accepted {
            self.started_at = Some(at);
        } else if next.is_terminal() {
            self.ended_at = Some(at);
        }
        Ok(true)
    }

    /// Stamps the reported duration and the cost derived from it.
    pub fn set_billing(&mut self, duration_secs: u32) {
        self.duration_secs = duration_secs;
        self.total_cost = call_cost(duration_secs, self.rate_per_minute);
    }
}

/// Generates the shared session/channel id for a caller/callee pair:
/// `{caller}_{callee}_{millis}`.
///
/// Ids embed a millisecond timestamp. A process-wide monotonic guard keeps
/// ids unique even when two calls start within the same millisecond.
pub fn generate_call_id(caller_id: &str, callee_id: &str) -> String {
    static LAST_MILLIS: AtomicI64 = AtomicI64::new(0);

    let mut candidate = Utc::now().timestamp_millis();
    loop {
        let last = LAST_MILLIS.load(Ordering::SeqCst);
        if candidate <= last {
            candidate = last + 1;
        }
        if LAST_MILLIS
            .compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            break;
        }
    }
    format!("{caller_id}_{callee_id}_{candidate}")
}
