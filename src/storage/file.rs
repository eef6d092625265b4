use crate::storage::{KeyValueStore, StorageError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Key-value store backed by a single JSON file. Writes go through a temp file followed
/// by a rename, so a reader never observes a partially written record.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        FileStore {
            path,
            write_lock: Mutex::new(()),
        }
    }

    async fn read_entries(&self) -> Result<HashMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    #[instrument(skip(self, value), fields(key = key))]
    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.read_entries().await?;
        entries.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, serde_json::to_string(&entries)?).await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!("💾 Wrote '{}' to '{}'", key, self.path.display());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_entries().await?.get(key).cloned())
    }
}
