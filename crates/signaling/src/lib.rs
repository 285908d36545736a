//! Call signaling for the consultation core.
//!
//! Coordinates the lifecycle of a call between two independently running
//! clients. The shared session document is the only communication channel:
//! the caller writes it into existence, either party moves its status, and
//! both react to snapshots pushed by the store. There is no peer-to-peer
//! signaling and no push notification; a callee learns of a call only
//! while an incoming-call watch is running.

pub mod service;
pub mod subscription;

pub use service::CallSignaling;
pub use subscription::{CallWatch, IncomingCall, IncomingCalls};
