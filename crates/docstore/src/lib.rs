//! Document store abstraction for the consultation core.
//!
//! Call sessions and trial records live in a shared document store; the
//! only coordination channel between two clients is mutating the same
//! document and observing it through a snapshot subscription. This crate
//! defines that seam:
//! - [`DocumentStore`]: create/read/update/delete, equality-filter queries,
//!   and snapshot subscriptions, with optional compare-and-swap versions
//! - [`MemoryStore`]: the in-process implementation used by the daemon's
//!   default backend and by tests

pub mod config;
pub mod document;
pub mod health;
pub mod memory;
pub mod store;

pub use config::{StoreBackend, StoreConfig};
pub use document::{Document, Filter};
pub use memory::MemoryStore;
pub use store::{DocumentChange, DocumentStore, DocumentWatch, QueryWatch};
