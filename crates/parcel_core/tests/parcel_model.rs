use parcel_core::{Parcel, ParcelStatus};
use serde_json::json;

#[test]
fn parcel_serializes_status_as_plain_text() {
    let mut parcel = Parcel::new(7, ParcelStatus::Sent, "Main St 1", "2024-01-01T00:00:00Z");
    parcel.number = 3;

    let value = serde_json::to_value(&parcel).unwrap();
    assert_eq!(
        value,
        json!({
            "number": 3,
            "client": 7,
            "status": "sent",
            "address": "Main St 1",
            "created_at": "2024-01-01T00:00:00Z"
        })
    );
}

#[test]
fn parcel_deserializes_unknown_status_into_other() {
    let value = json!({
        "number": 9,
        "client": 1,
        "status": "returned",
        "address": "addr",
        "created_at": "2024-01-01T00:00:00Z"
    });

    let parcel: Parcel = serde_json::from_value(value).unwrap();
    assert_eq!(parcel.status, ParcelStatus::Other("returned".to_string()));
    assert!(!parcel.is_registered());
}

#[test]
fn parcel_deserialization_rejects_missing_fields() {
    let value = json!({ "number": 1, "client": 1, "status": "registered" });

    assert!(serde_json::from_value::<Parcel>(value).is_err());
}
