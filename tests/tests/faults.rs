//! Store failure behavior: structured errors out, no panics, and the
//! monetization gate fails closed.

use std::sync::Arc;

use consult_core::{CallKind, Error, SendBlockReason};
use docstore::MemoryStore;
use integration_tests::fixtures::{callee, caller, chat_session_id};
use integration_tests::mocks::FlakyStore;
use signaling::CallSignaling;
use trial::{FreeTrialService, TrialConfig};

fn flaky_stack() -> (Arc<FlakyStore>, CallSignaling, FreeTrialService) {
    let flaky = Arc::new(FlakyStore::new(Arc::new(MemoryStore::new())));
    let signaling = CallSignaling::new(flaky.clone());
    let trials = FreeTrialService::new(flaky.clone(), TrialConfig::default());
    (flaky, signaling, trials)
}

#[tokio::test]
async fn failed_create_leaves_no_session_behind() {
    let (flaky, signaling, _trials) = flaky_stack();

    flaky.set_fail_writes(true);
    let err = signaling
        .create_call_session(caller(), callee(), CallKind::Audio, 20)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Store(_)));

    // Once the store recovers the same call can be placed cleanly.
    flaky.set_fail_writes(false);
    let id = signaling
        .create_call_session(caller(), callee(), CallKind::Audio, 20)
        .await
        .unwrap();
    assert!(signaling.get_call_session(&id).await.is_ok());
}

#[tokio::test]
async fn transition_surfaces_read_failures() {
    let (flaky, signaling, _trials) = flaky_stack();
    let id = signaling
        .create_call_session(caller(), callee(), CallKind::Audio, 20)
        .await
        .unwrap();

    flaky.set_fail_reads(true);
    let err = signaling.accept_call(&id).await.unwrap_err();
    assert!(matches!(err, Error::Store(_)));
}

#[tokio::test]
async fn send_gate_fails_closed_even_with_balance() {
    let (flaky, _signaling, trials) = flaky_stack();
    let id = chat_session_id();

    flaky.set_fail_reads(true);
    let gate = trials.can_send_message(&id, "client-asha", 500).await;
    assert!(!gate.allowed);
    assert_eq!(gate.reason, Some(SendBlockReason::StoreUnavailable));
}

#[tokio::test]
async fn trial_init_propagates_store_failure() {
    let (flaky, _signaling, trials) = flaky_stack();

    flaky.set_fail_writes(true);
    let err = trials
        .initialize_trial(&chat_session_id(), "client-asha", "expert-rao")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    trials.shutdown();
}
