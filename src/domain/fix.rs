use chrono::{DateTime, Utc};

/// A single successful location reading delivered by a provider.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fix {
    pub latitude: f64,  // In degrees
    pub longitude: f64, // In degrees
    pub captured_at: DateTime<Utc>,
}

impl Fix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Fix {
            latitude,
            longitude,
            captured_at: Utc::now(),
        }
    }

    /// The `"latitude,longitude"` encoding persisted under the last-location key.
    pub fn storage_value(&self) -> String {
        format!("{},{}", format_coordinate(self.latitude), format_coordinate(self.longitude))
    }
}

// Shortest decimal form that keeps a decimal point, so whole degrees encode as "0.0" rather than "0".
fn format_coordinate(value: f64) -> String {
    let formatted = value.to_string();
    if formatted.contains('.') || formatted.contains('e') {
        formatted
    } else {
        format!("{formatted}.0")
    }
}
