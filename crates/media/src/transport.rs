//! The transport trait and its event stream.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::warn;

use consult_core::Result;

/// Why a remote user left the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineReason {
    /// The peer left deliberately.
    Quit,
    /// The connection dropped.
    Dropped,
}

/// Events emitted by a media transport.
#[derive(Debug, Clone)]
pub enum MediaEvent {
    /// The local user joined the channel.
    JoinChannelSuccess { channel: String, uid: u32 },
    /// A remote user joined.
    UserJoined { uid: u32 },
    /// A remote user left.
    UserOffline { uid: u32, reason: OfflineReason },
    /// The engine reported an error.
    Error { code: i32, message: String },
}

/// Capability interface over whatever media engine is linked in.
///
/// The call screen drives this alongside the signaling watch: signaling
/// decides whether the call exists, the transport carries it.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// One-time engine setup. Must be called before joining a channel.
    async fn initialize(&self) -> Result<()>;

    /// Joins the named channel (the call session id) as `uid`.
    async fn join_channel(&self, channel: &str, uid: u32) -> Result<()>;

    /// Leaves the current channel, if any.
    async fn leave_channel(&self) -> Result<()>;

    /// Mutes or unmutes the local audio track.
    async fn set_muted(&self, muted: bool) -> Result<()>;

    /// Enables or disables the local video track.
    async fn set_video_enabled(&self, enabled: bool) -> Result<()>;

    /// Switches between front and back camera.
    async fn switch_camera(&self) -> Result<()>;

    /// Subscribes to engine events.
    fn events(&self) -> MediaEvents;
}

/// Subscription to media engine events. Dropping the handle unsubscribes.
pub struct MediaEvents {
    pub(crate) rx: broadcast::Receiver<MediaEvent>,
}

impl MediaEvents {
    /// Waits for the next event. Returns `None` once the engine is gone.
    pub async fn next(&mut self) -> Option<MediaEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "media event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
