//! Mock media engine.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use consult_core::{Error, Result};

use crate::transport::{MediaEvent, MediaEvents, MediaTransport, OfflineReason};

#[derive(Debug, Default)]
struct EngineState {
    initialized: bool,
    joined: Option<(String, u32)>,
    muted: bool,
    video_enabled: bool,
    front_camera: bool,
    should_fail: bool,
}

/// In-memory media engine. Performs no real audio/video transport.
///
/// Tracks join/mute/video state, emits the same events a real engine
/// would, and can simulate failures for error-path tests.
pub struct MockMediaEngine {
    state: Mutex<EngineState>,
    events_tx: broadcast::Sender<MediaEvent>,
}

impl MockMediaEngine {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(32);
        Self {
            state: Mutex::new(EngineState {
                video_enabled: true,
                front_camera: true,
                ..EngineState::default()
            }),
            events_tx,
        }
    }

    /// Simulate engine failures on subsequent operations.
    pub fn set_should_fail(&self, fail: bool) {
        self.state.lock().should_fail = fail;
    }

    /// The channel currently joined, if any.
    pub fn joined_channel(&self) -> Option<String> {
        self.state.lock().joined.as_ref().map(|(c, _)| c.clone())
    }

    pub fn is_muted(&self) -> bool {
        self.state.lock().muted
    }

    pub fn is_video_enabled(&self) -> bool {
        self.state.lock().video_enabled
    }

    /// Injects a remote-peer event, standing in for the far side of a call.
    pub fn emit_remote(&self, event: MediaEvent) {
        let _ = self.events_tx.send(event);
    }

    fn check(&self) -> Result<()> {
        if self.state.lock().should_fail {
            return Err(Error::media("simulated engine failure"));
        }
        Ok(())
    }
}

impl Default for MockMediaEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaTransport for MockMediaEngine {
    async fn initialize(&self) -> Result<()> {
        self.check()?;
        self.state.lock().initialized = true;
        debug!("mock media engine initialized");
        Ok(())
    }

    async fn join_channel(&self, channel: &str, uid: u32) -> Result<()> {
        self.check()?;
        {
            let mut state = self.state.lock();
            if !state.initialized {
                return Err(Error::media("engine not initialized"));
            }
            if state.joined.is_some() {
                return Err(Error::media("already in a channel"));
            }
            state.joined = Some((channel.to_string(), uid));
        }
        let _ = self.events_tx.send(MediaEvent::JoinChannelSuccess {
            channel: channel.to_string(),
            uid,
        });
        Ok(())
    }

    async fn leave_channel(&self) -> Result<()> {
        self.check()?;
        let left = self.state.lock().joined.take();
        if let Some((_, uid)) = left {
            let _ = self.events_tx.send(MediaEvent::UserOffline {
                uid,
                reason: OfflineReason::Quit,
            });
        }
        Ok(())
    }

    async fn set_muted(&self, muted: bool) -> Result<()> {
        self.check()?;
        self.state.lock().muted = muted;
        Ok(())
    }

    async fn set_video_enabled(&self, enabled: bool) -> Result<()> {
        self.check()?;
        self.state.lock().video_enabled = enabled;
        Ok(())
    }

    async fn switch_camera(&self) -> Result<()> {
        self.check()?;
        let mut state = self.state.lock();
        state.front_camera = !state.front_camera;
        Ok(())
    }

    fn events(&self) -> MediaEvents {
        MediaEvents {
            rx: self.events_tx.subscribe(),
        }
    }
}
