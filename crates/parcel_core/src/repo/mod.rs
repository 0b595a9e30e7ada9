//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define data access contracts for parcel storage.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `InvalidState`,
//!   `GuardFailed`) distinct from DB transport errors.
//! - Repositories borrow caller-owned connections and never open their own.

pub mod parcel_repo;
