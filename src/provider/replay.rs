use crate::domain::Fix;
use crate::provider::{LocationProvider, ProviderError, SamplingRequest, Subscription};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::mpsc::Sender;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, instrument, trace};

/// Replays a recorded track file, delivering one fix per sampling tick. Stands in for a
/// live positioning source when running as a backend simulation.
#[derive(Debug)]
pub struct ReplayProvider {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct TrackPoint {
    latitude: f64,
    longitude: f64,
}

impl ReplayProvider {
    pub fn new(path: PathBuf) -> Self {
        ReplayProvider { path }
    }
}

#[async_trait]
impl LocationProvider for ReplayProvider {
    #[instrument(skip(self, tx))]
    async fn request_updates(&self, request: SamplingRequest, tx: Sender<Fix>) -> Result<Subscription, ProviderError> {
        info!("🗺️ Loading track '{}'...", self.path.display());
        let points = load_track(&self.path).await?;
        info!("🗺️ Loading track '{}'... OK, {} point(s)", self.path.display(), points.len());

        let spacing = request.spacing();
        trace!(priority = ?request.priority, "Delivering a fix every {:?}", spacing);

        // Delivery loop
        let handle = tokio::spawn(async move {
            let mut next_delivery = Instant::now() + spacing;
            for point in points {
                sleep_until(next_delivery).await;
                next_delivery += spacing;

                if tx.send(Fix::new(point.latitude, point.longitude)).await.is_err() {
                    debug!("🗺️ Fix channel closed, ending replay");
                    return;
                }
            }
            debug!("🗺️ Track exhausted, no further fixes will be delivered");
        });

        Ok(Subscription::new(handle))
    }
}

async fn load_track(path: &PathBuf) -> Result<Vec<TrackPoint>, ProviderError> {
    let content = fs::read_to_string(path).await.map_err(|e| ProviderError::Io {
        source: e,
        path: path.clone(),
    })?;

    let entries = serde_json::from_str::<Vec<serde_json::Value>>(&content).map_err(|e| ProviderError::Malformed {
        source: e,
        path: path.clone(),
    })?;

    // Entries that do not parse as a coordinate pair are skipped silently; a missed
    // sample is not an error, the next tick is the only recovery path.
    let points = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<TrackPoint>(entry) {
            Ok(point) => Some(point),
            Err(e) => {
                debug!("🗺️ Skipping unreadable track point: {}", e);
                None
            }
        })
        .collect::<Vec<_>>();

    Ok(points)
}
