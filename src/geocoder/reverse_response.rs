use serde::Deserialize;

/// Subset of a Nominatim `/reverse` reply. A no-match reply carries an `error` field
/// instead of a result, still with status 200.
#[derive(Debug, Deserialize)]
pub struct ReverseResponse {
    pub display_name: Option<String>,
    pub error: Option<String>,
}
