//! Background authority sweeps: missed calls, trial expiry, retention.
//!
//! Workers are exercised one sweep at a time (`run()`); the scheduler's
//! interval loops add nothing testable on top.

use chrono::{Duration, Utc};

use consult_core::{CallStatus, CallSession, TrialRecord};
use docstore::DocumentStore;
use integration_tests::fixtures::{audio_session, expired_trial, chat_session_id};
use integration_tests::setup::TestContext;
use trial::CHAT_SESSIONS_COLLECTION;
use worker::{MissedCallWorker, RetentionWorker, TrialSweepWorker};

/// Writes a session that has been stuck unanswered for two minutes.
async fn insert_stale_call(ctx: &TestContext) -> String {
    let mut session = audio_session();
    session.created_at = Utc::now() - Duration::seconds(120);
    ctx.store
        .create(
            CallSession::COLLECTION,
            &session.id,
            serde_json::to_value(&session).unwrap(),
        )
        .await
        .unwrap();
    session.id
}

#[tokio::test]
async fn stale_unanswered_calls_go_missed() {
    let ctx = TestContext::new();
    let stale = insert_stale_call(&ctx).await;

    let worker = MissedCallWorker::new(ctx.dyn_store(), ctx.signaling.clone());
    worker.run().await.unwrap();

    let session = ctx.signaling.get_call_session(&stale).await.unwrap();
    assert_eq!(session.status, CallStatus::Missed);
    assert!(session.ended_at.is_some());
}

#[tokio::test]
async fn fresh_calls_are_left_alone() {
    let ctx = TestContext::new();
    let fresh = ctx
        .signaling
        .create_call_session(
            integration_tests::fixtures::caller(),
            integration_tests::fixtures::callee(),
            consult_core::CallKind::Audio,
            20,
        )
        .await
        .unwrap();

    let worker = MissedCallWorker::new(ctx.dyn_store(), ctx.signaling.clone());
    worker.run().await.unwrap();

    let session = ctx.signaling.get_call_session(&fresh).await.unwrap();
    assert_eq!(session.status, CallStatus::Calling);
}

#[tokio::test]
async fn answered_calls_are_never_swept() {
    let ctx = TestContext::new();
    let stale = insert_stale_call(&ctx).await;
    ctx.signaling.accept_call(&stale).await.unwrap();

    let worker = MissedCallWorker::new(ctx.dyn_store(), ctx.signaling.clone());
    worker.run().await.unwrap();

    let session = ctx.signaling.get_call_session(&stale).await.unwrap();
    assert_eq!(session.status, CallStatus::Accepted);
}

#[tokio::test]
async fn sweep_disables_expired_trials_and_their_chat() {
    let ctx = TestContext::new();
    let id = chat_session_id();
    let record = expired_trial(&id);
    ctx.store
        .create(
            TrialRecord::COLLECTION,
            &id,
            serde_json::to_value(&record).unwrap(),
        )
        .await
        .unwrap();
    ctx.store
        .create(
            CHAT_SESSIONS_COLLECTION,
            &id,
            serde_json::json!({"chat_enabled": true}),
        )
        .await
        .unwrap();

    TrialSweepWorker::new(ctx.dyn_store()).run().await.unwrap();

    let trial_doc = ctx
        .store
        .get(TrialRecord::COLLECTION, &id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(trial_doc.data["active"], serde_json::json!(false));
    assert_eq!(trial_doc.data["chat_enabled"], serde_json::json!(false));

    let chat_doc = ctx
        .store
        .get(CHAT_SESSIONS_COLLECTION, &id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(chat_doc.data["chat_enabled"], serde_json::json!(false));
}

#[tokio::test]
async fn sweep_leaves_open_windows_alone() {
    let ctx = TestContext::new();
    let id = chat_session_id();
    ctx.trials
        .initialize_trial(&id, "client-asha", "expert-rao")
        .await
        .unwrap();

    TrialSweepWorker::new(ctx.dyn_store()).run().await.unwrap();

    let status = ctx.trials.get_trial_status(&id).await.unwrap();
    assert!(status.is_active);
    ctx.trials.shutdown();
}

#[tokio::test]
async fn retention_deletes_only_old_terminal_sessions() {
    let ctx = TestContext::new();

    // A call that ended long past the retention window.
    let mut old = audio_session();
    old.apply_status(CallStatus::Accepted, Utc::now()).unwrap();
    old.apply_status(CallStatus::Ended, Utc::now() - Duration::days(45))
        .unwrap();
    ctx.store
        .create(
            CallSession::COLLECTION,
            &old.id,
            serde_json::to_value(&old).unwrap(),
        )
        .await
        .unwrap();

    // A call that just ended.
    let recent = ctx
        .signaling
        .create_call_session(
            integration_tests::fixtures::caller(),
            integration_tests::fixtures::callee(),
            consult_core::CallKind::Audio,
            20,
        )
        .await
        .unwrap();
    ctx.signaling.accept_call(&recent).await.unwrap();
    ctx.signaling.end_call(&recent, 30).await.unwrap();

    RetentionWorker::new(ctx.dyn_store(), ctx.signaling.clone())
        .run()
        .await
        .unwrap();

    assert!(ctx
        .store
        .get(CallSession::COLLECTION, &old.id)
        .await
        .unwrap()
        .is_none());
    assert!(ctx.signaling.get_call_session(&recent).await.is_ok());
}
