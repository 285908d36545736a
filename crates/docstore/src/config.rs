//! Store configuration.

use serde::{Deserialize, Serialize};

/// Which backend the daemon runs against.
///
/// Only the in-process backend ships in this repository; hosted document
/// stores plug in behind the same trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
}

/// Document store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend selection.
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    /// Buffered snapshots per watch before a slow consumer starts skipping.
    #[serde(default = "default_watch_capacity")]
    pub watch_capacity: usize,
}

fn default_backend() -> StoreBackend {
    StoreBackend::Memory
}

fn default_watch_capacity() -> usize {
    64
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            watch_capacity: default_watch_capacity(),
        }
    }
}
