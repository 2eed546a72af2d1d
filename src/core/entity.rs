//! Typed view over store records

use crate::core::schema::EntityKind;
use crate::core::store::{Fields, Record, StoreError, StoreResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A record type stored in one table of the store
///
/// Implementors are plain serde structs whose serialized form matches the
/// columns declared for [`Entity::KIND`].
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Table this entity lives in
    const KIND: EntityKind;

    /// Decode a raw store record
    fn from_record(record: Record) -> StoreResult<Self> {
        serde_json::from_value(Value::Object(record)).map_err(|e| StoreError::Decode {
            kind: Self::KIND,
            message: e.to_string(),
        })
    }
}

/// Serialize a write payload into store fields
///
/// Payload structs skip `None` members, so only the columns the caller
/// actually supplied reach the store.
pub fn to_fields<T: Serialize>(kind: EntityKind, payload: &T) -> StoreResult<Fields> {
    match serde_json::to_value(payload) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(StoreError::InvalidField {
            kind,
            field: "<payload>".to_string(),
            message: format!("expected an object, got {other}"),
        }),
        Err(e) => Err(StoreError::InvalidField {
            kind,
            field: "<payload>".to_string(),
            message: e.to_string(),
        }),
    }
}
