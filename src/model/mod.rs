//! Ledger record schema.
//!
//! Every entity is stored under its own key as a JSON object tagged with
//! `objectType`. Orders and shipments share one key space.

mod order;
mod shipment;

pub use order::{parse_items, Order, OrderItem, OrderStatus};
pub(crate) use order::validate_items;
pub use shipment::{Shipment, DEFAULT_PICKUP_LOCATION, IN_TRANSIT_STATUS};

use crate::error::{ContractError, Result};
use crate::types::ObjectType;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A record stored as one ledger entry.
pub trait LedgerRecord: Serialize + DeserializeOwned {
    const OBJECT_TYPE: ObjectType;

    fn key(&self) -> &str;

    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode the value stored under `key`.
    ///
    /// A value carrying another `objectType` is reported as
    /// [`ContractError::NotFound`] for this record type; a value that does not
    /// parse is a [`ContractError::Serialization`].
    fn from_bytes(key: &str, bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        let tag = value.get("objectType").and_then(|t| t.as_str());
        if tag != Some(Self::OBJECT_TYPE.as_str()) {
            return Err(ContractError::not_found(Self::OBJECT_TYPE, key));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Lenient decode used by list queries: anything that is not a well-formed
    /// record of this type is skipped.
    fn try_from_bytes(bytes: &[u8]) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes).ok()?;
        if value.get("objectType").and_then(|t| t.as_str()) != Some(Self::OBJECT_TYPE.as_str()) {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

/// Serialize `Option<String>` as `""` when absent; accept `""`, `null` or a
/// missing field as absent.
pub(crate) mod empty_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.filter(|s| !s.is_empty()))
    }
}
