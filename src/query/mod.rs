//! Read-side shapes: paged range queries and platform audit snapshots.

mod pager;

pub use pager::{PageRequest, Pages, QueryPager, QueryResponse, DEFAULT_MAX_PAGE_SIZE};

use crate::ledger::VersionRecord;
use crate::types::{Timestamp, TxId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A history entry with its value decoded but no diff.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHistoryRecord {
    pub tx_id: TxId,
    pub timestamp: Timestamp,
    pub is_delete: bool,
    /// `None` for deletes and for values that are not JSON.
    pub value: Option<Value>,
}

impl From<VersionRecord> for RawHistoryRecord {
    fn from(record: VersionRecord) -> Self {
        let value = match (&record.value, record.is_delete) {
            (Some(bytes), false) => serde_json::from_slice(bytes).ok(),
            _ => None,
        };
        RawHistoryRecord {
            tx_id: record.tx_id,
            timestamp: record.timestamp,
            is_delete: record.is_delete,
            value,
        }
    }
}

/// A key's current value together with its full history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub key: String,
    pub current: Value,
    pub history: Vec<RawHistoryRecord>,
}
