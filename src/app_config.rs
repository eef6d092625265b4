use crate::provider::AccuracyPriority;
use config::Config;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    core: Core,
    sampling: Sampling,
    provider: Provider,
    storage: Storage,
    geocoder: Geocoder,
}

impl AppConfig {
    pub fn load() -> Self {
        Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(config::File::with_name("config_local").required(false))
            .add_source(config::Environment::default())
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn sampling(&self) -> &Sampling {
        &self.sampling
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn geocoder(&self) -> &Geocoder {
        &self.geocoder
    }
}

#[derive(Debug, Deserialize)]
pub struct Core {
    command_buffer_size: usize,
    fix_buffer_size: usize,
}

impl Core {
    pub fn command_buffer_size(&self) -> usize {
        self.command_buffer_size
    }

    pub fn fix_buffer_size(&self) -> usize {
        self.fix_buffer_size
    }
}

#[derive(Debug, Deserialize)]
pub struct Sampling {
    #[serde(with = "humantime_serde")]
    interval: Duration,
    #[serde(with = "humantime_serde")]
    min_spacing: Duration,
    priority: AccuracyPriority,
}

impl Sampling {
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    pub fn priority(&self) -> AccuracyPriority {
        self.priority
    }
}

#[derive(Debug, Deserialize)]
pub struct Provider {
    track: String,
}

impl Provider {
    pub fn track(&self) -> &str {
        &self.track
    }
}

#[derive(Debug, Deserialize)]
pub struct Storage {
    path: String,
}

impl Storage {
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Debug, Deserialize)]
pub struct Geocoder {
    url: String,
}

impl Geocoder {
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn new() -> Self {
        AppConfigBuilder {
            config: AppConfig {
                core: Core {
                    command_buffer_size: 1,
                    fix_buffer_size: 1,
                },
                sampling: Sampling {
                    interval: Duration::from_secs(120),
                    min_spacing: Duration::from_secs(60),
                    priority: AccuracyPriority::HighAccuracy,
                },
                provider: Provider {
                    track: "tracks/demo_track.json".to_string(),
                },
                storage: Storage {
                    path: "data/store.json".to_string(),
                },
                geocoder: Geocoder {
                    url: "https://geocoder.url".to_string(),
                },
            },
        }
    }

    pub fn geocoder_url(mut self, url: String) -> Self {
        self.config.geocoder.url = url;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}
