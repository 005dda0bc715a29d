use std::{io::ErrorKind, path::PathBuf};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;

use super::StateStorage;

/// The main realization of [StateStorage]: one `<key>.json` file per key inside `state_dir`.
/// Reads take a shared lock and writes an exclusive one, so a `watch` process never sees a
/// half written value from a concurrent command.
pub struct JsonFileStorage {
    state_dir: PathBuf,
}

impl JsonFileStorage {
    pub fn new(state_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&state_dir)?;

        Ok(Self { state_dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.state_dir.join(format!("{key}.json"))
    }
}

impl StateStorage for JsonFileStorage {
    async fn load_raw(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        let mut file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => Err(e)?,
        };

        file.lock_shared()?;
        let mut content = String::new();
        let read = file.read_to_string(&mut content).await;
        file.unlock_async().await?;
        read?;

        debug!("Loaded {path:?}");
        Ok(Some(content))
    }

    async fn save_raw(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        // Truncating only after the lock is held keeps readers from seeing an empty file.
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await?;

        file.lock_exclusive()?;
        let result = async {
            file.set_len(0).await?;
            file.write_all(value.as_bytes()).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;
        file.unlock_async().await?;
        result?;

        debug!("Saved {path:?}");
        Ok(())
    }
}
