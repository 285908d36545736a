//! Document snapshots and the supported query shape.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use consult_core::Result;

/// A stored document snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Monotonic version, incremented on every write. Used as the
    /// compare-and-swap precondition for transition writes.
    pub version: u64,
    pub data: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Decodes the payload into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

/// Single-field equality filter, the only query shape the store supports.
///
/// The field may be a dot-separated path into nested objects
/// (`"callee.id"`).
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: serde_json::Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether a document payload matches this filter.
    pub fn matches(&self, data: &serde_json::Value) -> bool {
        let mut current = data;
        for segment in self.field.split('.') {
            match current.get(segment) {
                Some(next) => current = next,
                None => return false,
            }
        }
        *current == self.value
    }
}
