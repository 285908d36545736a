//! Free-trial timer for chat sessions.
//!
//! Every chat session starts with a fixed free window (60 seconds by
//! default). While it runs, a per-session ticker gives the UI a live
//! countdown with warnings near the end; when it closes, chat is gated
//! behind wallet balance. The stamped end time in the store is the only
//! countdown authority: tickers and subscribers always recompute remaining
//! time from it, so a suspended or restarted client picks up the correct
//! value instead of resuming a stale counter.

pub mod config;
pub mod service;
pub mod watch;

pub use config::TrialConfig;
pub use service::{FreeTrialService, CHAT_SESSIONS_COLLECTION};
pub use watch::{TrialEvent, TrialWatch};
