//! Media transport capability for call screens.
//!
//! The signaling state machine coordinates who is in a call; the media
//! transport carries the actual audio/video. This crate defines the
//! capability interface the call UI drives ([`MediaTransport`]) and the
//! event stream it listens to in parallel with call-status snapshots.
//!
//! No real transport ships in this repository: [`MockMediaEngine`]
//! satisfies the interface with in-memory state only, so the rest of the
//! core can be exercised end-to-end without an SDK.

pub mod mock;
pub mod transport;

pub use mock::MockMediaEngine;
pub use transport::{MediaEvent, MediaEvents, MediaTransport, OfflineReason};
