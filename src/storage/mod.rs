//! Persistence of the planner state.
//!  - Every logical piece of state (categories, tasks, timer, ...) is stored under its own key.
//!  - Values are plain JSON. There is no schema version: anything missing or unreadable falls
//!    back to its default.
//!  - Saving is best-effort. The in-memory [Planner](crate::planner::Planner) stays
//!    authoritative when a write fails.

pub mod json_storage;
pub mod snapshot;

#[cfg(test)]
pub mod memory;

use std::future::Future;

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{trace, warn};

/// Interface for abstracting the key value store behind the planner.
pub trait StateStorage {
    /// Raw stored value for `key`, `None` when nothing was stored yet.
    fn load_raw(&self, key: &str) -> impl Future<Output = Result<Option<String>>>;

    fn save_raw(&self, key: &str, value: &str) -> impl Future<Output = Result<()>>;
}

/// Reads and decodes `key`. Missing keys, read errors and malformed JSON all yield `None`.
pub async fn load_value<T: DeserializeOwned>(storage: &impl StateStorage, key: &str) -> Option<T> {
    let raw = match storage.load_raw(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            trace!("No stored value for {key}");
            return None;
        }
        Err(e) => {
            warn!("Couldn't read {key}, using default: {e:?}");
            return None;
        }
    };

    match serde_json::from_str::<T>(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Stored value for {key} is malformed, using default: {e}");
            None
        }
    }
}

pub async fn save_value<T: Serialize>(
    storage: &impl StateStorage,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string_pretty(value)?;
    storage.save_raw(key, &raw).await
}
