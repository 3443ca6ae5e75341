//! Core types shared by the ledger, the contract and the gateway.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Transaction identifier assigned by the ledger (lowercase hex SHA-256).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(pub String);

impl TxId {
    /// Derive a transaction id from the submitting credential and a nonce.
    pub fn derive(creator: &MspId, nonce: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(creator.0.as_bytes());
        hasher.update(nonce.to_le_bytes());
        TxId(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.0.get(..8).unwrap_or(&self.0);
        write!(f, "TxId({}...)", short)
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Microseconds since Unix epoch, as assigned by the ledger to a transaction.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current wall-clock time. Only ledger clocks call this; contract code
    /// reads the transaction timestamp instead.
    pub fn now() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or(0);
        Timestamp(micros)
    }

    pub fn as_micros(self) -> i64 {
        self.0
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Membership-service-provider id of an organization (`Org1MSP`, ...).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MspId(pub String);

impl MspId {
    pub fn new(id: impl Into<String>) -> Self {
        MspId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for MspId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MspId({})", self.0)
    }
}

impl fmt::Display for MspId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authenticated caller of a transaction.
///
/// The ledger attaches this to every transaction after verifying the
/// caller's credential; the contract never reads identity from a payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub msp_id: MspId,
    /// Enrollment name inside the organization (informational).
    pub subject: String,
}

impl Identity {
    pub fn new(msp_id: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            msp_id: MspId::new(msp_id),
            subject: subject.into(),
        }
    }
}

/// Tag stored in every record's `objectType` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    #[serde(rename = "ORDER")]
    Order,
    #[serde(rename = "SHIPMENT")]
    Shipment,
}

impl ObjectType {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Order => "ORDER",
            ObjectType::Shipment => "SHIPMENT",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contract function names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    CreateOrder,
    AcceptOrder,
    UpdateProductionStatus,
    PickupGoods,
    UpdateLocation,
    DeliverGoods,
    ConfirmReceipt,
    QueryOrder,
    QueryShipment,
    QueryOrderList,
    QueryAllLedgerData,
    QueryOrderHistory,
    QueryShipmentHistory,
}

impl Operation {
    pub const ALL: [Operation; 13] = [
        Operation::CreateOrder,
        Operation::AcceptOrder,
        Operation::UpdateProductionStatus,
        Operation::PickupGoods,
        Operation::UpdateLocation,
        Operation::DeliverGoods,
        Operation::ConfirmReceipt,
        Operation::QueryOrder,
        Operation::QueryShipment,
        Operation::QueryOrderList,
        Operation::QueryAllLedgerData,
        Operation::QueryOrderHistory,
        Operation::QueryShipmentHistory,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::CreateOrder => "CreateOrder",
            Operation::AcceptOrder => "AcceptOrder",
            Operation::UpdateProductionStatus => "UpdateProductionStatus",
            Operation::PickupGoods => "PickupGoods",
            Operation::UpdateLocation => "UpdateLocation",
            Operation::DeliverGoods => "DeliverGoods",
            Operation::ConfirmReceipt => "ConfirmReceipt",
            Operation::QueryOrder => "QueryOrder",
            Operation::QueryShipment => "QueryShipment",
            Operation::QueryOrderList => "QueryOrderList",
            Operation::QueryAllLedgerData => "QueryAllLedgerData",
            Operation::QueryOrderHistory => "QueryOrderHistory",
            Operation::QueryShipmentHistory => "QueryShipmentHistory",
        }
    }

    /// Look up an operation by its contract function name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.name() == name)
    }

    /// Whether the operation writes to the ledger (and is submitted rather
    /// than evaluated).
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Operation::CreateOrder
                | Operation::AcceptOrder
                | Operation::UpdateProductionStatus
                | Operation::PickupGoods
                | Operation::UpdateLocation
                | Operation::DeliverGoods
                | Operation::ConfirmReceipt
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Opaque pagination cursor produced by the ledger.
///
/// The empty bookmark means "start of range" when passed in and "range
/// exhausted" when returned.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bookmark(pub String);

impl Bookmark {
    pub fn start() -> Self {
        Bookmark(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Bookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bookmark({:?})", self.0)
    }
}

impl From<&str> for Bookmark {
    fn from(s: &str) -> Self {
        Bookmark(s.to_string())
    }
}

impl From<String> for Bookmark {
    fn from(s: String) -> Self {
        Bookmark(s)
    }
}
