//! Parcel domain model.
//!
//! # Responsibility
//! - Define the canonical parcel record persisted by the store.
//! - Map the free-form status text onto a closed enum without losing values.
//!
//! # Invariants
//! - `number` is assigned by storage on insert and never reused.
//! - Only `ParcelStatus::Registered` permits address changes and deletion.
//! - Status text round-trips unchanged through `ParcelStatus::Other`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};

/// Storage-assigned parcel number.
pub type ParcelId = i64;

/// Opaque identifier of the owning client. Not validated by core.
pub type ClientId = i64;

/// Parcel lifecycle status.
///
/// Persisted as lowercase text. Values outside the known vocabulary are kept
/// verbatim in `Other` so statuses defined by other systems survive reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParcelStatus {
    /// Accepted but not yet shipped. The only mutable state.
    Registered,
    /// Handed over for delivery.
    Sent,
    /// Delivered to the recipient.
    Delivered,
    /// Any status text not known to core.
    Other(String),
}

impl ParcelStatus {
    /// Returns the persisted text form.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Registered => "registered",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Other(value) => value.as_str(),
        }
    }

    /// Parses persisted text. Never fails; unknown text becomes `Other`.
    pub fn parse(value: &str) -> Self {
        match value {
            "registered" => Self::Registered,
            "sent" => Self::Sent,
            "delivered" => Self::Delivered,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns whether the status permits address changes and deletion.
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered)
    }

    /// Returns the status that follows this one in the delivery flow.
    ///
    /// `Delivered` and `Other` are terminal and return `None`.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Registered => Some(Self::Sent),
            Self::Sent => Some(Self::Delivered),
            Self::Delivered | Self::Other(_) => None,
        }
    }
}

impl Display for ParcelStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ParcelStatus {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for ParcelStatus {
    fn from(value: String) -> Self {
        match Self::parse(&value) {
            Self::Other(_) => Self::Other(value),
            known => known,
        }
    }
}

impl Serialize for ParcelStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ParcelStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

/// Canonical parcel record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    /// Storage-assigned number. `0` for a parcel that was never saved.
    pub number: ParcelId,
    /// Owning client.
    pub client: ClientId,
    pub status: ParcelStatus,
    /// Delivery address. Frozen once status leaves `registered`.
    pub address: String,
    /// Creation timestamp text, never mutated after insert.
    pub created_at: String,
}

impl Parcel {
    /// Creates an unsaved parcel. `number` is assigned on insert.
    pub fn new(
        client: ClientId,
        status: ParcelStatus,
        address: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            number: 0,
            client,
            status,
            address: address.into(),
            created_at: created_at.into(),
        }
    }

    /// Returns whether address changes and deletion are currently allowed.
    pub fn is_registered(&self) -> bool {
        self.status.is_registered()
    }
}

#[cfg(test)]
mod tests {
    use super::{Parcel, ParcelStatus};

    #[test]
    fn known_status_text_parses_to_named_variants() {
        assert_eq!(ParcelStatus::parse("registered"), ParcelStatus::Registered);
        assert_eq!(ParcelStatus::parse("sent"), ParcelStatus::Sent);
        assert_eq!(ParcelStatus::parse("delivered"), ParcelStatus::Delivered);
    }

    #[test]
    fn unknown_status_text_is_kept_verbatim() {
        let status = ParcelStatus::parse("Registered");
        assert_eq!(status, ParcelStatus::Other("Registered".to_string()));
        assert_eq!(status.as_str(), "Registered");
        assert!(!status.is_registered());
    }

    #[test]
    fn owned_and_borrowed_text_convert_identically() {
        for text in ["registered", "sent", "delivered", "returned", ""] {
            assert_eq!(ParcelStatus::from(text.to_string()), ParcelStatus::parse(text));
            assert_eq!(ParcelStatus::from(text), ParcelStatus::parse(text));
        }
    }

    #[test]
    fn next_status_follows_delivery_flow() {
        assert_eq!(ParcelStatus::Registered.next(), Some(ParcelStatus::Sent));
        assert_eq!(ParcelStatus::Sent.next(), Some(ParcelStatus::Delivered));
        assert_eq!(ParcelStatus::Delivered.next(), None);
        assert_eq!(ParcelStatus::Other("lost".to_string()).next(), None);
    }

    #[test]
    fn new_parcel_is_unsaved() {
        let parcel = Parcel::new(7, ParcelStatus::Registered, "addr", "2024-01-01T00:00:00Z");
        assert_eq!(parcel.number, 0);
        assert!(parcel.is_registered());
    }
}
