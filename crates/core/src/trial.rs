//! Free-trial window types for chat sessions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// The free-trial record for one chat session.
///
/// The stamped `ends_at` is the single countdown authority: remaining time
/// is always derived from it, never from a decrementing counter, so the
/// countdown survives process restarts and suspensions.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TrialRecord {
    /// Chat session this trial belongs to (owned by the chat subsystem).
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
    #[validate(length(min = 1, max = 64))]
    pub user_id: String,
    #[validate(length(min = 1, max = 64))]
    pub expert_id: String,
    pub started_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Cleared when the trial expires or converts to paid chat.
    pub active: bool,
    /// Last chat gate written to the store; clients read the derived value
    /// from [`TrialRecord::status`] instead.
    pub chat_enabled: bool,
    /// Set when a wallet top-up converted this session to paid chat.
    #[serde(default)]
    pub paid_chat_started: bool,
}

impl TrialRecord {
    /// Store collection holding trial documents.
    pub const COLLECTION: &'static str = "chat_trials";

    /// Creates a fresh trial starting now.
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        expert_id: impl Into<String>,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            expert_id: expert_id.into(),
            started_at: now,
            ends_at: now + duration,
            active: true,
            chat_enabled: true,
            paid_chat_started: false,
        }
    }

    /// Seconds left in the trial window, floored at zero.
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> u32 {
        (self.ends_at - now).num_seconds().max(0) as u32
    }

    /// Whether the free window is still open.
    pub fn is_trial_active(&self, now: DateTime<Utc>) -> bool {
        self.active && self.seconds_remaining(now) > 0
    }

    /// Derived view of this record at `now`.
    pub fn status(&self, now: DateTime<Utc>) -> TrialStatus {
        let seconds_remaining = self.seconds_remaining(now);
        let is_active = self.is_trial_active(now);
        TrialStatus {
            session_id: self.session_id.clone(),
            seconds_remaining,
            is_active,
            chat_enabled: is_active || self.paid_chat_started,
        }
    }
}

/// Point-in-time view of a trial, as shown to the chat UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialStatus {
    pub session_id: String,
    pub seconds_remaining: u32,
    pub is_active: bool,
    /// Whether messages may be composed right now: an open trial window or
    /// a paid conversion.
    pub chat_enabled: bool,
}

/// Why a message send was blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendBlockReason {
    /// No trial record and no wallet balance.
    NoTrialNoBalance,
    /// The trial window closed and the wallet is empty.
    TrialExpired,
    /// The gate could not be evaluated; sends fail closed.
    StoreUnavailable,
}

/// Outcome of the pre-send monetization gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendPermission {
    pub allowed: bool,
    pub reason: Option<SendBlockReason>,
}

impl SendPermission {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn denied(reason: SendBlockReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}
