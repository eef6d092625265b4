pub mod commands;
mod fix;
mod snapshot;

pub use fix::Fix;
pub use snapshot::LocationSnapshot;
