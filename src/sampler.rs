use crate::domain::commands::SamplerCommand;
use crate::domain::{Fix, LocationSnapshot};
use crate::geocoder::ReverseGeocoder;
use crate::provider::{LocationProvider, SamplingRequest, Subscription};
use crate::storage::{KeyValueStore, LAST_LOCATION_KEY};
use std::sync::Arc;
use tokio::sync::mpsc::{Receiver, Sender, channel};
use tokio::sync::watch::{Receiver as WatchReceiver, Sender as WatchSender, channel as watch_channel};
use tracing::{debug, error, info, instrument, warn};

pub const UNKNOWN_LOCATION: &str = "Unknown Location";
pub const GEOCODING_FAILED: &str = "Error fetching location";

/// Runs the periodic sampling loop: while running, every fix delivered by the provider
/// overwrites the persisted last-known-location record. Fixes arrive over a bounded
/// channel with this sampler as the single consumer, so the record is never written
/// concurrently.
#[derive(Debug)]
pub struct LocationSampler {
    provider: Arc<dyn LocationProvider>,
    store: Arc<dyn KeyValueStore>,
    geocoder: Arc<dyn ReverseGeocoder>,
    request: SamplingRequest,
    command_rx: Receiver<SamplerCommand>,
    fix_tx: Sender<Fix>,
    fix_rx: Receiver<Fix>,
    subscription: Option<Subscription>,
    notifier_tx: WatchSender<LocationSnapshot>,
    notifier_rx: WatchReceiver<LocationSnapshot>,
}

impl LocationSampler {
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        store: Arc<dyn KeyValueStore>,
        geocoder: Arc<dyn ReverseGeocoder>,
        request: SamplingRequest,
        command_rx: Receiver<SamplerCommand>,
        fix_buffer_size: usize,
    ) -> Self {
        let (fix_tx, fix_rx) = channel::<Fix>(fix_buffer_size);
        let (notifier_tx, notifier_rx) = watch_channel(LocationSnapshot::default());

        LocationSampler {
            provider,
            store,
            geocoder,
            request,
            command_rx,
            fix_tx,
            fix_rx,
            subscription: None,
            notifier_tx,
            notifier_rx,
        }
    }

    /// Accessor for the last known location; stays readable after sampling stops.
    pub fn notifier(&self) -> WatchReceiver<LocationSnapshot> {
        self.notifier_rx.clone()
    }

    #[instrument(skip(self))]
    pub async fn listen(&mut self) {
        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    match command {
                        Some(SamplerCommand::Start) => self.start().await,
                        Some(SamplerCommand::Stop) => self.stop(),
                        None => {
                            debug!("Command channel closed, shutting down the sampler");
                            self.stop();
                            return;
                        }
                    }
                }
                Some(fix) = self.fix_rx.recv() => {
                    self.on_fix(fix).await;
                }
            }
        }
    }

    async fn start(&mut self) {
        if self.subscription.as_ref().is_some_and(|subscription| !subscription.is_finished()) {
            warn!("🛰️ Sampling is already active, ignoring start command");
            return;
        }

        info!("🛰️ Starting location sampling every {:?}...", self.request.interval);
        match self.provider.request_updates(self.request, self.fix_tx.clone()).await {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                info!("🛰️ Starting location sampling every {:?}... OK", self.request.interval);
            }
            Err(e) => error!("❌ Could not request location updates: {}", e),
        }
    }

    fn stop(&mut self) {
        match self.subscription.take() {
            Some(subscription) => {
                subscription.cancel();
                info!("🛑 Stopped location sampling");
            }
            None => debug!("🛑 Sampling is not active, ignoring stop command"),
        }
    }

    async fn on_fix(&mut self, fix: Fix) {
        if self.subscription.is_none() {
            debug!("Dropping fix {} delivered after stop", fix.storage_value());
            return;
        }

        let value = fix.storage_value();
        if let Err(e) = self.store.put(LAST_LOCATION_KEY, &value).await {
            error!("❌ Could not persist location '{}': {}", value, e);
            return;
        }
        self.notifier_tx.send_modify(|snapshot| {
            snapshot.fix = Some(fix);
            snapshot.place = None;
        });

        // Display-only lookup; the record is already persisted at this point and a slow
        // or failing geocoder cannot undo that.
        let geocoder = self.geocoder.clone();
        let notifier_tx = self.notifier_tx.clone();
        tokio::spawn(async move {
            let place = resolve_place(geocoder.as_ref(), fix.latitude, fix.longitude).await;
            info!("📍 Saved location: {} --> {}", value, place);
            notifier_tx.send_if_modified(|snapshot| {
                if snapshot.fix != Some(fix) {
                    debug!("Discarding place '{}', a newer fix owns the snapshot", place);
                    return false;
                }
                snapshot.place = Some(place);
                true
            });
        });
    }
}

async fn resolve_place(geocoder: &dyn ReverseGeocoder, latitude: f64, longitude: f64) -> String {
    match geocoder.reverse(latitude, longitude).await {
        Ok(Some(place)) => place,
        Ok(None) => UNKNOWN_LOCATION.to_string(),
        Err(e) => {
            warn!("⚠️ Reverse geocoding failed: {}", e);
            GEOCODING_FAILED.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocoder::GeocoderError;
    use crate::provider::{AccuracyPriority, ProviderError};
    use crate::storage::StorageError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use test_log::test;

    #[derive(Debug, Default)]
    struct FakeProvider {
        registrations: AtomicUsize,
        ends_immediately: bool,
        fix_tx: Mutex<Option<Sender<Fix>>>,
    }

    #[async_trait]
    impl LocationProvider for FakeProvider {
        async fn request_updates(&self, _request: SamplingRequest, tx: Sender<Fix>) -> Result<Subscription, ProviderError> {
            self.registrations.fetch_add(1, Ordering::SeqCst);
            *self.fix_tx.lock().unwrap() = Some(tx);

            let handle = if self.ends_immediately {
                tokio::spawn(async {})
            } else {
                tokio::spawn(std::future::pending::<()>())
            };
            Ok(Subscription::new(handle))
        }
    }

    #[derive(Debug, Default)]
    struct MemoryStore {
        entries: Mutex<HashMap<String, String>>,
        fail_writes: bool,
    }

    #[async_trait]
    impl KeyValueStore for MemoryStore {
        async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.fail_writes {
                return Err(StorageError::Io {
                    source: io::Error::other("disk full"),
                });
            }
            self.entries.lock().unwrap().insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }
    }

    #[derive(Debug)]
    enum StubGeocoder {
        Place(&'static str),
        NoMatch,
        Failing,
        /// Echoes the latitude as the place name, after sleeping that many milliseconds.
        SlowEcho,
    }

    #[async_trait]
    impl ReverseGeocoder for StubGeocoder {
        async fn reverse(&self, latitude: f64, _longitude: f64) -> Result<Option<String>, GeocoderError> {
            match self {
                StubGeocoder::Place(place) => Ok(Some(place.to_string())),
                StubGeocoder::NoMatch => Ok(None),
                StubGeocoder::Failing => Err(GeocoderError::Rejected("boom".to_string())),
                StubGeocoder::SlowEcho => {
                    tokio::time::sleep(Duration::from_millis(latitude as u64)).await;
                    Ok(Some(latitude.to_string()))
                }
            }
        }
    }

    fn request() -> SamplingRequest {
        SamplingRequest {
            interval: Duration::from_secs(120),
            min_spacing: Duration::from_secs(60),
            priority: AccuracyPriority::HighAccuracy,
        }
    }

    fn sampler(provider: Arc<FakeProvider>, store: Arc<MemoryStore>, geocoder: StubGeocoder) -> (LocationSampler, Sender<SamplerCommand>) {
        let (command_tx, command_rx) = channel::<SamplerCommand>(4);
        let sampler = LocationSampler::new(provider, store, Arc::new(geocoder), request(), command_rx, 4);
        (sampler, command_tx)
    }

    async fn place_from(notifier: &mut WatchReceiver<LocationSnapshot>) -> String {
        loop {
            let place = notifier.borrow_and_update().place.clone();
            if let Some(place) = place {
                return place;
            }
            notifier.changed().await.expect("notifier closed before a place was resolved");
        }
    }

    #[test(tokio::test)]
    async fn start_twice_registers_a_single_update_request() {
        let provider = Arc::new(FakeProvider::default());
        let (mut sampler, _command_tx) = sampler(provider.clone(), Arc::new(MemoryStore::default()), StubGeocoder::NoMatch);

        sampler.start().await;
        sampler.start().await;

        assert_eq!(provider.registrations.load(Ordering::SeqCst), 1);
    }

    #[test(tokio::test)]
    async fn stop_is_idempotent() {
        let (mut sampler, _command_tx) = sampler(Arc::new(FakeProvider::default()), Arc::new(MemoryStore::default()), StubGeocoder::NoMatch);

        sampler.stop();
        sampler.stop();

        sampler.start().await;
        sampler.stop();
        sampler.stop();
    }

    #[test(tokio::test)]
    async fn the_last_fix_wins() -> Result<(), StorageError> {
        let store = Arc::new(MemoryStore::default());
        let (mut sampler, _command_tx) = sampler(Arc::new(FakeProvider::default()), store.clone(), StubGeocoder::NoMatch);

        sampler.start().await;
        sampler.on_fix(Fix::new(37.4219, -122.0840)).await;
        sampler.on_fix(Fix::new(51.8615899, 4.3580323)).await;
        sampler.on_fix(Fix::new(1.0, 2.0)).await;

        assert_eq!(store.get(LAST_LOCATION_KEY).await?, Some("1.0,2.0".to_string()));

        Ok(())
    }

    #[test(tokio::test)]
    async fn a_fix_after_stop_is_dropped_and_the_record_is_kept() -> Result<(), StorageError> {
        let store = Arc::new(MemoryStore::default());
        let (mut sampler, _command_tx) = sampler(Arc::new(FakeProvider::default()), store.clone(), StubGeocoder::NoMatch);

        sampler.start().await;
        sampler.on_fix(Fix::new(37.4219, -122.0840)).await;
        sampler.stop();
        sampler.on_fix(Fix::new(51.8615899, 4.3580323)).await;

        assert_eq!(store.get(LAST_LOCATION_KEY).await?, Some("37.4219,-122.084".to_string()));

        Ok(())
    }

    #[test(tokio::test)]
    async fn a_geocoding_failure_does_not_block_persistence() -> Result<(), StorageError> {
        let store = Arc::new(MemoryStore::default());
        let (mut sampler, _command_tx) = sampler(Arc::new(FakeProvider::default()), store.clone(), StubGeocoder::Failing);
        let mut notifier = sampler.notifier();

        sampler.start().await;
        sampler.on_fix(Fix::new(0.0, 0.0)).await;

        assert_eq!(store.get(LAST_LOCATION_KEY).await?, Some("0.0,0.0".to_string()));
        assert_eq!(place_from(&mut notifier).await, GEOCODING_FAILED);

        Ok(())
    }

    #[test(tokio::test)]
    async fn an_empty_geocoding_result_maps_to_the_unknown_sentinel() {
        let (mut sampler, _command_tx) = sampler(Arc::new(FakeProvider::default()), Arc::new(MemoryStore::default()), StubGeocoder::NoMatch);
        let mut notifier = sampler.notifier();

        sampler.start().await;
        sampler.on_fix(Fix::new(0.0, 0.0)).await;

        assert_eq!(place_from(&mut notifier).await, UNKNOWN_LOCATION);
    }

    #[test(tokio::test)]
    async fn a_resolved_place_surfaces_verbatim() -> Result<(), StorageError> {
        let store = Arc::new(MemoryStore::default());
        let (mut sampler, _command_tx) = sampler(
            Arc::new(FakeProvider::default()),
            store.clone(),
            StubGeocoder::Place("1600 Amphitheatre Parkway"),
        );
        let mut notifier = sampler.notifier();

        sampler.start().await;
        sampler.on_fix(Fix::new(37.4219, -122.0840)).await;

        assert_eq!(store.get(LAST_LOCATION_KEY).await?, Some("37.4219,-122.084".to_string()));
        assert_eq!(place_from(&mut notifier).await, "1600 Amphitheatre Parkway");

        Ok(())
    }

    #[test(tokio::test)]
    async fn a_storage_failure_is_surfaced_but_does_not_panic() {
        let store = Arc::new(MemoryStore {
            entries: Mutex::new(HashMap::new()),
            fail_writes: true,
        });
        let (mut sampler, _command_tx) = sampler(Arc::new(FakeProvider::default()), store, StubGeocoder::NoMatch);
        let notifier = sampler.notifier();

        sampler.start().await;
        sampler.on_fix(Fix::new(1.0, 2.0)).await;

        // The failed write is not published as the last known location
        assert_eq!(notifier.borrow().fix, None);
    }

    #[test(tokio::test)]
    async fn commands_drive_the_state_machine_through_the_channel() {
        let provider = Arc::new(FakeProvider::default());
        let (mut sampler, command_tx) = sampler(provider.clone(), Arc::new(MemoryStore::default()), StubGeocoder::NoMatch);

        let handle = tokio::spawn(async move { sampler.listen().await });

        command_tx.send(SamplerCommand::Start).await.expect("could not send start");
        command_tx.send(SamplerCommand::Stop).await.expect("could not send stop");
        command_tx.send(SamplerCommand::Stop).await.expect("could not send stop");
        drop(command_tx);

        handle.await.expect("sampler task failed");
        assert_eq!(provider.registrations.load(Ordering::SeqCst), 1);
    }

    #[test(tokio::test(start_paused = true))]
    async fn a_delivery_gap_leaves_the_prior_record_unchanged() -> Result<(), StorageError> {
        let provider = Arc::new(FakeProvider::default());
        let store = Arc::new(MemoryStore::default());
        let (mut sampler, command_tx) = sampler(provider.clone(), store.clone(), StubGeocoder::NoMatch);
        let mut notifier = sampler.notifier();

        let handle = tokio::spawn(async move { sampler.listen().await });
        command_tx.send(SamplerCommand::Start).await.expect("could not send start");
        while provider.registrations.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let fix_tx = provider.fix_tx.lock().unwrap().clone().expect("expected a registered fix sender");
        fix_tx.send(Fix::new(37.4219, -122.0840)).await.expect("could not deliver a fix");
        while notifier.borrow_and_update().fix.is_none() {
            notifier.changed().await.expect("notifier closed before the fix was published");
        }

        // Several target intervals pass without a single delivery
        tokio::time::advance(Duration::from_secs(10 * 120)).await;
        tokio::task::yield_now().await;

        assert!(!handle.is_finished(), "expected the sampler to keep awaiting the next fix");
        assert_eq!(store.get(LAST_LOCATION_KEY).await?, Some("37.4219,-122.084".to_string()));

        Ok(())
    }

    #[test(tokio::test(start_paused = true))]
    async fn a_slow_lookup_for_an_older_fix_does_not_overwrite_the_place() {
        let (mut sampler, _command_tx) = sampler(Arc::new(FakeProvider::default()), Arc::new(MemoryStore::default()), StubGeocoder::SlowEcho);
        let notifier = sampler.notifier();

        sampler.start().await;
        sampler.on_fix(Fix::new(500.0, 0.0)).await;
        sampler.on_fix(Fix::new(1.0, 0.0)).await;

        // Far past both lookups; the slower one resolves last
        tokio::time::sleep(Duration::from_secs(2)).await;

        let snapshot = notifier.borrow().clone();
        assert_eq!(snapshot.place, Some("1".to_string()));
        assert_eq!(snapshot.fix.map(|fix| fix.latitude), Some(1.0));
    }

    #[test(tokio::test)]
    async fn start_re_registers_once_the_provider_ends_delivery() {
        let provider = Arc::new(FakeProvider {
            ends_immediately: true,
            ..FakeProvider::default()
        });
        let (mut sampler, _command_tx) = sampler(provider.clone(), Arc::new(MemoryStore::default()), StubGeocoder::NoMatch);

        sampler.start().await;
        // Let the immediately-ending delivery task run to completion
        tokio::task::yield_now().await;
        sampler.start().await;

        assert_eq!(provider.registrations.load(Ordering::SeqCst), 2);
    }
}
