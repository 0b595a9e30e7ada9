//! Parcel use-case service.
//!
//! # Responsibility
//! - Provide registration and delivery-flow entry points for core callers.
//! - Delegate persistence and guard enforcement to the repository.
//!
//! # Invariants
//! - New parcels always start in `registered` status.
//! - Status only moves forward along `registered -> sent -> delivered`.
//! - Service layer remains storage-agnostic.

use crate::model::parcel::{ClientId, Parcel, ParcelId, ParcelStatus};
use crate::repo::parcel_repo::{ParcelRepository, RepoResult};
use chrono::{SecondsFormat, Utc};
use log::info;

/// Returns the current UTC time in the `created_at` text format.
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Use-case service wrapper for parcel operations.
pub struct ParcelService<R: ParcelRepository> {
    repo: R,
}

impl<R: ParcelRepository> ParcelService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Registers a new parcel stamped with the current UTC time.
    ///
    /// # Contract
    /// - Status is `registered`.
    /// - `created_at` is RFC 3339 with second precision and `Z` suffix.
    /// - Returns the stored parcel including its assigned number.
    pub fn register(&self, client: ClientId, address: impl Into<String>) -> RepoResult<Parcel> {
        self.register_at(client, address, current_timestamp())
    }

    /// Registers a new parcel with a caller-provided creation timestamp.
    pub fn register_at(
        &self,
        client: ClientId,
        address: impl Into<String>,
        created_at: impl Into<String>,
    ) -> RepoResult<Parcel> {
        let mut parcel = Parcel::new(client, ParcelStatus::Registered, address, created_at);
        parcel.number = self.repo.add(&parcel)?;

        info!(
            "event=parcel_register module=service status=ok number={} client={}",
            parcel.number, parcel.client
        );
        Ok(parcel)
    }

    /// Gets one parcel by number.
    pub fn parcel(&self, number: ParcelId) -> RepoResult<Parcel> {
        self.repo.get(number)
    }

    /// Lists all parcels owned by a client.
    pub fn client_parcels(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
        self.repo.get_by_client(client)
    }

    /// Moves a parcel one step along the delivery flow.
    ///
    /// Returns the resulting status. Terminal statuses are returned as-is
    /// without a write. A missing number fails with `NotFound`.
    pub fn next_status(&self, number: ParcelId) -> RepoResult<ParcelStatus> {
        let parcel = self.repo.get(number)?;
        let Some(next) = parcel.status.next() else {
            info!(
                "event=parcel_next_status module=service status=skipped number={} current={}",
                number, parcel.status
            );
            return Ok(parcel.status);
        };

        self.repo.set_status(number, &next)?;
        info!(
            "event=parcel_next_status module=service status=ok number={} from={} to={}",
            number, parcel.status, next
        );
        Ok(next)
    }

    /// Changes the address of a registered parcel.
    ///
    /// Returns repository-level guard errors unchanged.
    pub fn change_address(&self, number: ParcelId, address: &str) -> RepoResult<()> {
        self.repo.set_address(number, address)
    }

    /// Deletes a registered parcel.
    ///
    /// Returns repository-level guard errors unchanged.
    pub fn delete(&self, number: ParcelId) -> RepoResult<()> {
        self.repo.delete(number)
    }
}
