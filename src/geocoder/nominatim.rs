use crate::app_config::AppConfig;
use crate::geocoder::reverse_response::ReverseResponse;
use crate::geocoder::{GeocoderError, ReverseGeocoder};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

const NO_MATCH_ERROR: &str = "Unable to geocode";

#[derive(Debug)]
pub struct NominatimGeocoder {
    client: Client,
    url: String,
}

impl NominatimGeocoder {
    pub fn new(client: Client, config: &AppConfig) -> Self {
        NominatimGeocoder {
            client,
            url: config.geocoder().url().to_string(),
        }
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    #[instrument(skip(self))]
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<Option<String>, GeocoderError> {
        let response = self
            .client
            .get(format!("{}/reverse", self.url))
            .query(&[("format", "jsonv2"), ("lat", &latitude.to_string()), ("lon", &longitude.to_string())])
            .send()
            .await?
            .error_for_status()?;

        let reverse_response = response.json::<ReverseResponse>().await?;
        debug!("🌍 Resolved ({}, {}) to {:?}", latitude, longitude, reverse_response.display_name);

        match reverse_response {
            ReverseResponse { error: Some(error), .. } if error == NO_MATCH_ERROR => Ok(None),
            ReverseResponse { error: Some(error), .. } => Err(GeocoderError::Rejected(error)),
            ReverseResponse { display_name, .. } => Ok(display_name),
        }
    }
}
