//! The ledger capability the contract runs against.
//!
//! A ledger is a key-value store with optimistic multi-version concurrency
//! control. Every committed write appends one immutable [`VersionRecord`]
//! to the key's history chain. Transactions read committed state, buffer
//! their writes, and are validated only at commit: if any key a
//! transaction read has changed since, the commit fails with
//! [`LedgerError::MvccReadConflict`](crate::error::LedgerError).
//!
//! - [`Ledger`]: the trait implemented by ledger backends
//! - [`TxStub`]: the contract-side view of one transaction
//! - [`MemoryLedger`]: in-process implementation

mod clock;
mod memory;
mod stub;

pub use clock::{Clock, ManualClock, SystemClock};
pub use memory::{MemoryLedger, MemoryLedgerConfig};
pub use stub::TxStub;

use crate::error::LedgerError;
use crate::types::{Bookmark, Identity, Timestamp, TxId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Commit height at which a key's current value was written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(pub u64);

/// One entry in a key's history chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub tx_id: TxId,
    pub timestamp: Timestamp,
    pub is_delete: bool,
    /// Raw value bytes (`None` for deletes).
    pub value: Option<Vec<u8>>,
}

/// A key and its current value, as returned by range scans.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

/// One page of a range scan.
#[derive(Clone, Debug, Default)]
pub struct RangePage {
    pub entries: Vec<KeyValue>,
    /// Cursor to resume after this page; empty when the range is exhausted.
    pub bookmark: Bookmark,
    pub fetched_records_count: u32,
}

/// Order in which a ledger yields a key's history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOrder {
    /// Descending by timestamp.
    #[default]
    NewestFirst,
    /// Ascending by timestamp.
    OldestFirst,
    /// No ordering guarantee.
    Unspecified,
}

/// Transaction header assigned by the ledger when a transaction begins.
#[derive(Clone, Debug)]
pub struct TxHeader {
    pub tx_id: TxId,
    /// Consensus transaction time. All records written by the transaction
    /// carry this value.
    pub timestamp: Timestamp,
    pub creator: Identity,
}

/// Versions observed and values written by a transaction.
#[derive(Clone, Debug, Default)]
pub struct ReadWriteSet {
    /// Version of every key read (`None` if the key was absent).
    pub reads: BTreeMap<String, Option<Version>>,
    pub writes: BTreeMap<String, Vec<u8>>,
}

impl ReadWriteSet {
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Outcome of a successful commit.
#[derive(Clone, Debug)]
pub struct CommitReceipt {
    pub tx_id: TxId,
    pub version: Version,
    pub keys_written: Vec<String>,
}

/// Lazily produced history of one key.
pub type HistoryIter<'a> = Box<dyn Iterator<Item = Result<VersionRecord, LedgerError>> + Send + 'a>;

/// Backend ledger.
///
/// Implementations must be safe to share across threads: transactions on
/// different keys run in parallel and only meet at [`Ledger::commit`].
pub trait Ledger: Send + Sync {
    /// Start a transaction for an authenticated creator.
    fn begin(&self, creator: Identity) -> TxHeader;

    /// Read the committed value of a key with its version.
    fn read(&self, key: &str) -> Result<Option<(Version, Vec<u8>)>, LedgerError>;

    /// Validate the read set and atomically apply the write set.
    fn commit(&self, header: &TxHeader, rwset: ReadWriteSet) -> Result<CommitReceipt, LedgerError>;

    /// History chain of a key, in [`Ledger::history_order`].
    fn history_of(&self, key: &str) -> Result<HistoryIter<'_>, LedgerError>;

    fn history_order(&self) -> HistoryOrder;

    /// Scan `[start, end)` in native key order. An empty `end` is unbounded.
    /// `bookmark` resumes a previous scan; empty starts at `start`.
    fn range_scan(
        &self,
        start: &str,
        end: &str,
        page_size: u32,
        bookmark: &Bookmark,
    ) -> Result<RangePage, LedgerError>;

    /// Committed value of a key.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self.read(key)?.map(|(_, value)| value))
    }
}
