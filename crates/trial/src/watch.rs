//! Trial event stream.

use tokio::sync::broadcast;
use tracing::warn;

use consult_core::TrialStatus;

/// Events delivered to a trial subscriber.
///
/// `Tick` carries a freshly recomputed status, whether the trigger was the
/// local ticker or a remote store change; subscribers treat each one as
/// the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrialEvent {
    /// Periodic or store-driven status recomputation.
    Tick(TrialStatus),
    /// The countdown crossed a warning threshold.
    Warning { seconds_left: u32 },
    /// The free window closed and chat was disabled.
    Expired,
    /// A wallet top-up converted the session to paid chat.
    ChatEnabled,
}

/// Subscription to one session's trial events. Dropping the handle
/// unsubscribes; the service's `cleanup` tears down the backing tasks.
pub struct TrialWatch {
    pub(crate) rx: broadcast::Receiver<TrialEvent>,
}

impl TrialWatch {
    /// Waits for the next event. Returns `None` once the session's tasks
    /// are torn down.
    pub async fn next(&mut self) -> Option<TrialEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "trial watch lagged, skipping to latest");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
