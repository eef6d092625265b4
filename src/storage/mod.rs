mod file;

pub use file::FileStore;

use async_trait::async_trait;
use std::fmt::Debug;
use std::io;
use thiserror::Error;

/// Key under which the most recent fix is persisted.
pub const LAST_LOCATION_KEY: &str = "last_location";

/// A string key-value store with atomic single-key writes, persisted across restarts.
#[async_trait]
pub trait KeyValueStore: Debug + Send + Sync {
    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("{}", source)]
    Io {
        #[from]
        source: io::Error,
    },
    #[error("store file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}
