pub mod reporting;
pub mod snapshot;
pub mod sweep;
