use crate::domain::LocationSnapshot;
use tokio::sync::watch::Receiver;
use tracing::{info, instrument};

/// Surfaces the tracking status while sampling is active, the daemon's stand-in for a
/// persistent notification. Carries nothing back into the sampler.
#[instrument(skip_all)]
pub async fn status_listener(mut rx: Receiver<LocationSnapshot>) {
    while rx.changed().await.is_ok() {
        let snapshot: LocationSnapshot = rx.borrow().clone();
        let Some(fix) = snapshot.fix else {
            continue;
        };

        match snapshot.place {
            Some(place) => info!("📍 Last fix {} ({})", fix.storage_value(), place),
            None => info!("📍 Last fix {}", fix.storage_value()),
        }
    }
}
