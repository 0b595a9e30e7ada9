//! Domain model for parcel tracking.
//!
//! # Responsibility
//! - Define the data structures shared by storage and service layers.
//!
//! # Invariants
//! - Every parcel is identified by a storage-assigned `ParcelId`.
//! - Deletion is physical; there are no tombstones.

pub mod parcel;
