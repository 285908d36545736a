//! Test data builders.

use chrono::{Duration, Utc};
use uuid::Uuid;

use consult_core::{CallKind, CallSession, Participant, TrialRecord};
use trial::TrialConfig;

/// The client side of a call.
pub fn caller() -> Participant {
    Participant::new("client-asha", "Asha Verma")
}

/// The expert side of a call.
pub fn callee() -> Participant {
    Participant::new("expert-rao", "Dr. Rao")
}

/// A fresh audio session at rate 20/min, not yet stored.
pub fn audio_session() -> CallSession {
    CallSession::new(caller(), callee(), CallKind::Audio, 20)
}

/// A unique chat session id per test.
pub fn chat_session_id() -> String {
    format!("chat-{}", Uuid::new_v4())
}

/// Trial timings small enough to let a test watch a full expiry.
pub fn fast_trial_config() -> TrialConfig {
    TrialConfig {
        trial_secs: 2,
        tick_millis: 50,
        warning_secs: vec![1],
    }
}

/// A trial whose window closed two minutes ago but was never disabled,
/// as left behind by a client that died mid-trial.
pub fn expired_trial(session_id: &str) -> TrialRecord {
    TrialRecord::new(
        session_id,
        "client-asha",
        "expert-rao",
        Duration::seconds(60),
        Utc::now() - Duration::seconds(180),
    )
}
