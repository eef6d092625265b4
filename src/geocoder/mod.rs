mod nominatim;
mod reverse_response;

pub use nominatim::NominatimGeocoder;

use async_trait::async_trait;
use reqwest::Client;
use std::fmt::Debug;
use thiserror::Error;

pub fn new_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Best-effort coordinate-to-place-name resolution, for display purposes only.
#[async_trait]
pub trait ReverseGeocoder: Debug + Send + Sync {
    /// Resolves a human-readable place name; `Ok(None)` when nothing matches the coordinates.
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<Option<String>, GeocoderError>;
}

#[derive(Error, Debug)]
pub enum GeocoderError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("geocoder rejected the lookup: {0}")]
    Rejected(String),
}
