pub mod replay;

use crate::domain::Fix;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Debug;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyPriority {
    HighAccuracy,
    BalancedPower,
}

/// A recurring fix request: target interval, minimum spacing floor and accuracy priority.
#[derive(Clone, Copy, Debug)]
pub struct SamplingRequest {
    pub interval: Duration,
    pub min_spacing: Duration,
    pub priority: AccuracyPriority,
}

impl SamplingRequest {
    /// The pace at which fixes are delivered. The spacing floor only kicks in when the
    /// target interval is configured below it.
    pub fn spacing(&self) -> Duration {
        self.interval.max(self.min_spacing)
    }
}

#[async_trait]
pub trait LocationProvider: Debug + Send + Sync {
    /// Registers a recurring fix request. Fixes are pushed onto `tx` until the returned
    /// subscription is cancelled or dropped; delivery may be suspended indefinitely if no
    /// fix can be produced.
    async fn request_updates(&self, request: SamplingRequest, tx: Sender<Fix>) -> Result<Subscription, ProviderError>;
}

/// Handle for an active fix request; cancelling or dropping it unregisters the request.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn new(handle: JoinHandle<()>) -> Self {
        Subscription { handle }
    }

    /// Whether the provider has ended delivery on its own, e.g. a replayed track ran out.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn cancel(self) {
        self.handle.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("unable to read track file '{path}': {source}")]
    Io { source: io::Error, path: PathBuf },
    #[error("track file '{path}' is not valid JSON: {source}")]
    Malformed { source: serde_json::Error, path: PathBuf },
}
