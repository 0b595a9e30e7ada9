//! Core storage logic for parcel tracking.
//! This crate is the single source of truth for the parcel store contract.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::parcel::{ClientId, Parcel, ParcelId, ParcelStatus};
pub use repo::parcel_repo::{
    GuardStrategy, GuardedAction, ParcelRepository, RepoError, RepoResult,
    SqliteParcelRepository,
};
pub use service::parcel_service::{current_timestamp, ParcelService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
