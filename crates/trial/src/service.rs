//! The free-trial service.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use validator::Validate;

use consult_core::{
    Error, Result, SendBlockReason, SendPermission, TrialRecord, TrialStatus,
};
use docstore::{DocumentChange, DocumentStore, DocumentWatch};
use telemetry::metrics;

use crate::config::TrialConfig;
use crate::watch::{TrialEvent, TrialWatch};

/// Collection holding the chat-session records owned by the chat
/// subsystem. This service only patches their chat gate fields.
pub const CHAT_SESSIONS_COLLECTION: &str = "chat_sessions";

/// Capacity of each session's event channel; a UI consumer that falls this
/// far behind skips to the latest tick.
const EVENT_CAPACITY: usize = 32;

struct SessionTasks {
    events: broadcast::Sender<TrialEvent>,
    ticker: Option<JoinHandle<()>>,
    store_watch: Option<JoinHandle<()>>,
}

impl SessionTasks {
    fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            events,
            ticker: None,
            store_watch: None,
        }
    }

    fn ticker_running(&self) -> bool {
        self.ticker.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn abort(self) {
        if let Some(h) = self.ticker {
            h.abort();
        }
        if let Some(h) = self.store_watch {
            h.abort();
        }
    }
}

/// Grants each chat session a fixed free window, drives the live countdown,
/// and gates message sends behind wallet balance once the window closes.
///
/// Holds one ticker task and one store-watch task per active session;
/// `cleanup` tears them down individually or in bulk, and `shutdown`
/// must be called before dropping the service at process exit.
pub struct FreeTrialService {
    store: Arc<dyn DocumentStore>,
    config: TrialConfig,
    sessions: Mutex<HashMap<String, SessionTasks>>,
}

impl FreeTrialService {
    pub fn new(store: Arc<dyn DocumentStore>, config: TrialConfig) -> Self {
        Self {
            store,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Creates the trial record for a chat session and starts its ticker.
    ///
    /// Idempotent: a session that already has a record (this client or a
    /// concurrent one) gets its current status back, with tasks restarted
    /// if the window is still open.
    pub async fn initialize_trial(
        &self,
        session_id: &str,
        user_id: &str,
        expert_id: &str,
    ) -> Result<TrialStatus> {
        if let Some(doc) = self.store.get(TrialRecord::COLLECTION, session_id).await? {
            let record: TrialRecord = doc.decode()?;
            self.ensure_tasks(&record).await?;
            return Ok(record.status(Utc::now()));
        }

        let now = Utc::now();
        let record = TrialRecord::new(
            session_id,
            user_id,
            expert_id,
            self.config.trial_duration(),
            now,
        );
        record.validate()?;
        let value = serde_json::to_value(&record)?;

        match self
            .store
            .create(TrialRecord::COLLECTION, session_id, value)
            .await
        {
            Ok(_) => {
                metrics().trials_started.inc();
                info!(session_id, user_id, expert_id, "trial started");
            }
            Err(Error::AlreadyExists(_)) => {
                // Lost an init race with another client; its record wins.
                let doc = self
                    .store
                    .get(TrialRecord::COLLECTION, session_id)
                    .await?
                    .ok_or_else(|| Error::not_found(format!("trial {session_id}")))?;
                let record: TrialRecord = doc.decode()?;
                self.ensure_tasks(&record).await?;
                return Ok(record.status(Utc::now()));
            }
            Err(e) => return Err(e),
        }

        self.ensure_tasks(&record).await?;
        Ok(record.status(now))
    }

    /// One-shot authoritative read: remaining time derived from the stamped
    /// end time, correct across process restarts.
    pub async fn get_trial_status(&self, session_id: &str) -> Result<TrialStatus> {
        let doc = self
            .store
            .get(TrialRecord::COLLECTION, session_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("trial {session_id}")))?;
        let record: TrialRecord = doc.decode()?;
        Ok(record.status(Utc::now()))
    }

    /// Subscribes to the session's merged event stream: local ticker ticks
    /// plus recomputations triggered by remote store changes.
    ///
    /// Re-subscribing after a restart restarts the ticker when the window
    /// is still open.
    pub async fn watch_trial(&self, session_id: &str) -> Result<TrialWatch> {
        if let Some(doc) = self.store.get(TrialRecord::COLLECTION, session_id).await? {
            let record: TrialRecord = doc.decode()?;
            self.ensure_tasks(&record).await?;
        }

        let mut sessions = self.sessions.lock();
        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionTasks::new);
        Ok(TrialWatch {
            rx: entry.events.subscribe(),
        })
    }

    /// Converts the session to paid chat after a wallet top-up: stops the
    /// countdown and re-enables chat on both records.
    pub async fn enable_chat_after_balance(&self, session_id: &str) -> Result<TrialStatus> {
        // Stop the countdown first so no expiry tick races the conversion.
        let events = {
            let mut sessions = self.sessions.lock();
            sessions.get_mut(session_id).map(|entry| {
                if let Some(ticker) = entry.ticker.take() {
                    ticker.abort();
                }
                entry.events.clone()
            })
        };

        let doc = self
            .store
            .update(
                TrialRecord::COLLECTION,
                session_id,
                json!({"active": false, "chat_enabled": true, "paid_chat_started": true}),
                None,
            )
            .await?;

        if let Err(e) = self
            .store
            .update(
                CHAT_SESSIONS_COLLECTION,
                session_id,
                json!({"chat_enabled": true, "paid_chat_started": true}),
                None,
            )
            .await
        {
            if e.is_not_found() {
                debug!(session_id, "no chat session record to enable");
            } else {
                warn!(session_id, error = %e, "failed to enable chat session record");
            }
        }

        metrics().trials_converted.inc();
        info!(session_id, "chat converted to paid");
        if let Some(events) = events {
            let _ = events.send(TrialEvent::ChatEnabled);
        }

        let record: TrialRecord = doc.decode()?;
        Ok(record.status(Utc::now()))
    }

    /// The pre-send monetization gate.
    ///
    /// No trial record: allowed only with balance. Open window: allowed.
    /// Closed window: allowed only with balance. A store failure denies
    /// the send (fail closed).
    pub async fn can_send_message(
        &self,
        session_id: &str,
        user_id: &str,
        balance: u64,
    ) -> SendPermission {
        let decision = match self.store.get(TrialRecord::COLLECTION, session_id).await {
            Ok(None) => {
                if balance > 0 {
                    SendPermission::allowed()
                } else {
                    SendPermission::denied(SendBlockReason::NoTrialNoBalance)
                }
            }
            Ok(Some(doc)) => match doc.decode::<TrialRecord>() {
                Ok(record) => {
                    let now = Utc::now();
                    if record.is_trial_active(now) || record.paid_chat_started || balance > 0 {
                        SendPermission::allowed()
                    } else {
                        SendPermission::denied(SendBlockReason::TrialExpired)
                    }
                }
                Err(e) => {
                    warn!(session_id, error = %e, "undecodable trial record, denying send");
                    SendPermission::denied(SendBlockReason::StoreUnavailable)
                }
            },
            Err(e) => {
                warn!(session_id, error = %e, "trial read failed, denying send");
                metrics().store_errors.inc();
                SendPermission::denied(SendBlockReason::StoreUnavailable)
            }
        };

        if decision.allowed {
            metrics().messages_allowed.inc();
        } else {
            metrics().messages_blocked.inc();
            debug!(session_id, user_id, reason = ?decision.reason, "message send blocked");
        }
        decision
    }

    /// Tears down the ticker and store watch for one session, or for every
    /// session when `session_id` is `None`.
    pub fn cleanup(&self, session_id: Option<&str>) {
        let mut sessions = self.sessions.lock();
        match session_id {
            Some(id) => {
                if let Some(entry) = sessions.remove(id) {
                    entry.abort();
                }
            }
            None => {
                for (_, entry) in sessions.drain() {
                    entry.abort();
                }
            }
        }
    }

    /// Bulk teardown of every outstanding task.
    pub fn shutdown(&self) {
        self.cleanup(None);
    }

    /// Makes sure the session has its event channel, store watch, and
    /// (while the window is open) ticker.
    async fn ensure_tasks(&self, record: &TrialRecord) -> Result<()> {
        let store_watch = self
            .store
            .watch_document(TrialRecord::COLLECTION, &record.session_id)
            .await?;

        let mut sessions = self.sessions.lock();
        let entry = sessions
            .entry(record.session_id.clone())
            .or_insert_with(SessionTasks::new);

        if entry.store_watch.is_none() {
            entry.store_watch = Some(tokio::spawn(run_store_watch(
                store_watch,
                entry.events.clone(),
            )));
        }

        if !entry.ticker_running() && record.is_trial_active(Utc::now()) {
            entry.ticker = Some(tokio::spawn(run_ticker(
                self.store.clone(),
                entry.events.clone(),
                record.session_id.clone(),
                record.ends_at,
                self.config.warning_secs.clone(),
                self.config.tick_period(),
            )));
        }
        Ok(())
    }
}

impl Drop for FreeTrialService {
    fn drop(&mut self) {
        for (_, entry) in self.sessions.lock().drain() {
            entry.abort();
        }
    }
}

/// Disables chat on both the trial record and the chat-session record.
///
/// Shared by the expiring ticker and the server-side sweep authority; a
/// missing chat-session record is tolerated since that document belongs to
/// the chat subsystem.
pub async fn disable_chat_for_session(store: &dyn DocumentStore, session_id: &str) -> Result<()> {
    store
        .update(
            TrialRecord::COLLECTION,
            session_id,
            json!({"active": false, "chat_enabled": false}),
            None,
        )
        .await?;

    match store
        .update(
            CHAT_SESSIONS_COLLECTION,
            session_id,
            json!({"chat_enabled": false}),
            None,
        )
        .await
    {
        Ok(_) => Ok(()),
        Err(e) if e.is_not_found() => {
            debug!(session_id, "no chat session record to disable");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// The per-session countdown: recomputes remaining time from the stamped
/// end time every tick, warns at the configured thresholds, and disables
/// chat when the window closes.
async fn run_ticker(
    store: Arc<dyn DocumentStore>,
    events: broadcast::Sender<TrialEvent>,
    session_id: String,
    ends_at: DateTime<Utc>,
    warning_secs: Vec<u32>,
    tick_period: std::time::Duration,
) {
    let mut ticker = tokio::time::interval(tick_period);
    let mut last_remaining = u32::MAX;

    loop {
        ticker.tick().await;

        let remaining = (ends_at - Utc::now()).num_seconds().max(0) as u32;
        let _ = events.send(TrialEvent::Tick(TrialStatus {
            session_id: session_id.clone(),
            seconds_remaining: remaining,
            is_active: remaining > 0,
            chat_enabled: remaining > 0,
        }));

        // A suspended process can cross several thresholds in one tick;
        // each one still gets its warning.
        for &threshold in &warning_secs {
            if last_remaining > threshold && remaining <= threshold && remaining > 0 {
                let _ = events.send(TrialEvent::Warning {
                    seconds_left: threshold,
                });
            }
        }

        if remaining == 0 {
            let _ = events.send(TrialEvent::Expired);
            if let Err(e) = disable_chat_for_session(store.as_ref(), &session_id).await {
                warn!(session_id = %session_id, error = %e, "failed to disable chat on expiry");
            }
            metrics().trials_expired.inc();
            info!(session_id = %session_id, "trial expired");
            break;
        }
        last_remaining = remaining;
    }
}

/// Forwards remote record changes into the session's event stream as
/// recomputed ticks.
async fn run_store_watch(mut watch: DocumentWatch, events: broadcast::Sender<TrialEvent>) {
    while let Some(change) = watch.next().await {
        let DocumentChange::Updated(doc) = change else {
            continue;
        };
        match doc.decode::<TrialRecord>() {
            Ok(record) => {
                let _ = events.send(TrialEvent::Tick(record.status(Utc::now())));
            }
            Err(e) => {
                warn!(doc_id = %doc.id, error = %e, "skipping undecodable trial record");
            }
        }
    }
}
