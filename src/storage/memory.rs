use std::{collections::HashMap, sync::Mutex};

use anyhow::{anyhow, Result};

use super::StateStorage;

/// In-memory store for tests. `failing` turns every write into an error.
#[derive(Default)]
pub struct MemoryStorage {
    pub values: Mutex<HashMap<String, String>>,
    pub failing: bool,
}

impl MemoryStorage {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

impl StateStorage for MemoryStorage {
    async fn load_raw(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn save_raw(&self, key: &str, value: &str) -> Result<()> {
        if self.failing {
            return Err(anyhow!("storage for {key} is unavailable"));
        }
        self.insert(key, value);
        Ok(())
    }
}
