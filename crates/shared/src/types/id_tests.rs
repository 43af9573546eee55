use super::*;
use std::str::FromStr;
use uuid::Uuid;

#[test]
fn test_typed_id_creation() {
    let id = PartyId::new();
    assert!(!id.to_string().is_empty());
}

#[test]
fn test_typed_id_from_uuid() {
    let uuid = Uuid::new_v4();
    let id = BranchId::from_uuid(uuid);
    assert_eq!(id.into_inner(), uuid);
}

#[test]
fn test_typed_id_default_is_fresh() {
    assert_ne!(PartyId::default(), PartyId::default());
}

#[test]
fn test_typed_id_display() {
    let uuid = Uuid::new_v4();
    let id = PartyId::from_uuid(uuid);
    assert_eq!(format!("{id}"), uuid.to_string());
}

#[test]
fn test_typed_id_from_str() {
    let uuid = Uuid::new_v4();
    let id = TransactionId::from_str(&uuid.to_string()).unwrap();
    assert_eq!(id.into_inner(), uuid);
}

#[test]
fn test_typed_id_from_str_error() {
    assert!(PartyId::from_str("invalid").is_err());
}
