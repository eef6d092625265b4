use crate::domain::Fix;

/// The in-process view of the last known location, published to watchers.
///
/// `place` lags behind `fix`: it is cleared when a new fix is persisted and filled in
/// once the display-only reverse lookup completes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocationSnapshot {
    pub fix: Option<Fix>,
    pub place: Option<String>,
}
