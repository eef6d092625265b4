use crate::app_config::AppConfig;
use crate::domain::commands::SamplerCommand;
use crate::geocoder::NominatimGeocoder;
use crate::provider::SamplingRequest;
use crate::provider::replay::ReplayProvider;
use crate::sampler::LocationSampler;
use crate::status_listener::status_listener;
use crate::storage::FileStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task;
use tracing::info;

mod app_config;
mod domain;
mod geocoder;
mod provider;
mod sampler;
mod status_listener;
mod storage;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    info!("🧭 Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load();
    info!("✅  Loaded configuration");

    let client = geocoder::new_client()?;
    let geocoder = Arc::new(NominatimGeocoder::new(client, &config));
    let store = Arc::new(FileStore::new(PathBuf::from(config.storage().path())));
    let provider = Arc::new(ReplayProvider::new(PathBuf::from(config.provider().track())));

    let request = SamplingRequest {
        interval: config.sampling().interval(),
        min_spacing: config.sampling().min_spacing(),
        priority: config.sampling().priority(),
    };

    let (command_tx, command_rx) = mpsc::channel::<SamplerCommand>(config.core().command_buffer_size());
    let mut sampler = LocationSampler::new(provider, store, geocoder, request, command_rx, config.core().fix_buffer_size());
    let notifier_rx = sampler.notifier();

    task::spawn(async move {
        status_listener(notifier_rx).await;
    });
    info!("✅  Initialized status listener");

    task::spawn(async move {
        sampler.listen().await;
    });
    info!("✅  Initialized sampler");

    command_tx.send(SamplerCommand::Start).await?;
    info!("🧭 {} is up and running", env!("CARGO_PKG_NAME"));

    tokio::signal::ctrl_c().await?;
    command_tx.send(SamplerCommand::Stop).await?;
    info!("🧭 Shut down");

    Ok(())
}
