//! Free-trial countdown and chat gating scenarios.
//!
//! Expiry tests shrink the window to two seconds so a full countdown fits
//! in a test run; the gating logic itself never depends on tick cadence.

use std::time::Duration;

use tokio::time::timeout;

use consult_core::{SendBlockReason, TrialRecord};
use docstore::DocumentStore;
use integration_tests::fixtures::{chat_session_id, expired_trial, fast_trial_config};
use integration_tests::setup::TestContext;
use trial::{FreeTrialService, TrialConfig, TrialEvent};

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn fresh_trial_reports_full_window() {
    let ctx = TestContext::new();
    let id = chat_session_id();

    let status = ctx
        .trials
        .initialize_trial(&id, "client-asha", "expert-rao")
        .await
        .unwrap();

    assert_eq!(status.seconds_remaining, 60);
    assert!(status.is_active);
    assert!(status.chat_enabled);
    ctx.trials.shutdown();
}

#[tokio::test]
async fn remaining_time_is_non_increasing() {
    let ctx = TestContext::new();
    let id = chat_session_id();
    ctx.trials
        .initialize_trial(&id, "client-asha", "expert-rao")
        .await
        .unwrap();

    let mut last = u32::MAX;
    for _ in 0..3 {
        let status = ctx.trials.get_trial_status(&id).await.unwrap();
        assert!(status.seconds_remaining <= last);
        last = status.seconds_remaining;
        tokio::time::sleep(Duration::from_millis(400)).await;
    }
    ctx.trials.shutdown();
}

#[tokio::test]
async fn reinitializing_keeps_the_original_window() {
    let ctx = TestContext::new();
    let id = chat_session_id();

    ctx.trials
        .initialize_trial(&id, "client-asha", "expert-rao")
        .await
        .unwrap();
    ctx.trials
        .initialize_trial(&id, "client-asha", "expert-rao")
        .await
        .unwrap();

    // The second init must not have rewritten the record.
    let doc = ctx
        .store
        .get(TrialRecord::COLLECTION, &id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc.version, 1);
    ctx.trials.shutdown();
}

#[tokio::test]
async fn countdown_warns_expires_and_disables_chat() {
    let ctx = TestContext::with_trial_config(fast_trial_config());
    let id = chat_session_id();

    ctx.trials
        .initialize_trial(&id, "client-asha", "expert-rao")
        .await
        .unwrap();
    let mut watch = ctx.trials.watch_trial(&id).await.unwrap();

    let mut saw_warning = false;
    let mut last_remaining = u32::MAX;
    loop {
        let event = timeout(WAIT, watch.next())
            .await
            .expect("countdown stalled")
            .expect("watch closed");
        match event {
            TrialEvent::Tick(status) => {
                assert!(status.seconds_remaining <= last_remaining);
                last_remaining = status.seconds_remaining;
            }
            TrialEvent::Warning { seconds_left } => {
                assert_eq!(seconds_left, 1);
                saw_warning = true;
            }
            TrialEvent::Expired => break,
            TrialEvent::ChatEnabled => panic!("no top-up in this scenario"),
        }
    }
    assert!(saw_warning, "threshold warning never fired");

    // Expiry must stick in the store, not just in the event stream.
    let mut status = ctx.trials.get_trial_status(&id).await.unwrap();
    for _ in 0..20 {
        if !status.is_active {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        status = ctx.trials.get_trial_status(&id).await.unwrap();
    }
    assert!(!status.is_active);
    assert!(!status.chat_enabled);
    assert_eq!(status.seconds_remaining, 0);

    let gate = ctx.trials.can_send_message(&id, "client-asha", 0).await;
    assert!(!gate.allowed);
    assert_eq!(gate.reason, Some(SendBlockReason::TrialExpired));

    let paid = ctx.trials.can_send_message(&id, "client-asha", 50).await;
    assert!(paid.allowed);
    ctx.trials.shutdown();
}

#[tokio::test]
async fn send_gate_truth_table() {
    let ctx = TestContext::new();
    let id = chat_session_id();

    // No trial record yet: balance decides.
    let gate = ctx.trials.can_send_message(&id, "client-asha", 0).await;
    assert!(!gate.allowed);
    assert_eq!(gate.reason, Some(SendBlockReason::NoTrialNoBalance));
    assert!(ctx.trials.can_send_message(&id, "client-asha", 50).await.allowed);

    // Mid-trial: free regardless of balance.
    ctx.trials
        .initialize_trial(&id, "client-asha", "expert-rao")
        .await
        .unwrap();
    assert!(ctx.trials.can_send_message(&id, "client-asha", 0).await.allowed);

    // Expired trial left behind by a dead client: balance decides again.
    let stale = chat_session_id();
    let record = expired_trial(&stale);
    ctx.store
        .create(
            TrialRecord::COLLECTION,
            &stale,
            serde_json::to_value(&record).unwrap(),
        )
        .await
        .unwrap();
    assert!(!ctx.trials.can_send_message(&stale, "client-asha", 0).await.allowed);
    assert!(ctx.trials.can_send_message(&stale, "client-asha", 50).await.allowed);
    ctx.trials.shutdown();
}

#[tokio::test]
async fn topup_mid_countdown_stops_the_ticker() {
    // Fast ticks but a window long enough that natural expiry can never
    // race the top-up.
    let ctx = TestContext::with_trial_config(TrialConfig {
        trial_secs: 30,
        tick_millis: 50,
        warning_secs: vec![5],
    });
    let id = chat_session_id();

    ctx.trials
        .initialize_trial(&id, "client-asha", "expert-rao")
        .await
        .unwrap();
    let mut watch = ctx.trials.watch_trial(&id).await.unwrap();

    // Let at least one countdown tick through first.
    loop {
        match timeout(WAIT, watch.next()).await.unwrap().unwrap() {
            TrialEvent::Tick(status) if status.is_active => break,
            _ => {}
        }
    }

    let status = ctx.trials.enable_chat_after_balance(&id).await.unwrap();
    assert!(status.chat_enabled);
    assert!(!status.is_active);

    // Drain the stream past the conversion point, then require silence:
    // no expiry and no live countdown tick may follow.
    let mut converted = false;
    loop {
        match timeout(Duration::from_millis(500), watch.next()).await {
            Ok(Some(TrialEvent::ChatEnabled)) => converted = true,
            Ok(Some(TrialEvent::Expired)) => panic!("ticker survived the top-up"),
            Ok(Some(TrialEvent::Tick(status))) => {
                assert!(
                    !status.is_active || !converted,
                    "live countdown tick after conversion"
                );
            }
            Ok(Some(TrialEvent::Warning { .. })) => {}
            Ok(None) | Err(_) => break,
        }
    }
    assert!(converted, "conversion event never arrived");

    let after = ctx.trials.get_trial_status(&id).await.unwrap();
    assert!(after.chat_enabled);
    ctx.trials.shutdown();
}

#[tokio::test]
async fn authoritative_time_survives_restart() {
    let ctx = TestContext::new();
    let id = chat_session_id();
    ctx.trials
        .initialize_trial(&id, "client-asha", "expert-rao")
        .await
        .unwrap();
    ctx.trials.shutdown();

    // A fresh service over the same store: no local timer state, only the
    // stamped end time.
    let fresh = FreeTrialService::new(ctx.dyn_store(), fast_trial_config());
    let status = fresh.get_trial_status(&id).await.unwrap();
    assert!(status.seconds_remaining > 0 && status.seconds_remaining <= 60);
    assert!(status.is_active);
    fresh.shutdown();
}
