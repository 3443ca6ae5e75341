//! Per-transaction context handed to the contract.

use super::{CommitReceipt, HistoryIter, HistoryOrder, Ledger, RangePage, ReadWriteSet, TxHeader};
use crate::error::LedgerError;
use crate::types::{Bookmark, Identity, MspId, Timestamp, TxId};

/// One in-flight transaction.
///
/// Reads go to committed ledger state (or this transaction's own buffered
/// writes) and are recorded with their version for commit-time validation.
/// Writes are buffered until [`TxStub::commit`]. Dropping a stub without
/// committing discards its writes.
pub struct TxStub<'l> {
    ledger: &'l dyn Ledger,
    header: TxHeader,
    rwset: ReadWriteSet,
}

impl<'l> TxStub<'l> {
    /// Begin a transaction on `ledger` as `creator`.
    pub fn begin(ledger: &'l dyn Ledger, creator: Identity) -> Self {
        let header = ledger.begin(creator);
        Self {
            ledger,
            header,
            rwset: ReadWriteSet::default(),
        }
    }

    pub fn tx_id(&self) -> &TxId {
        &self.header.tx_id
    }

    /// Consensus timestamp of this transaction.
    pub fn tx_timestamp(&self) -> Timestamp {
        self.header.timestamp
    }

    pub fn creator(&self) -> &Identity {
        &self.header.creator
    }

    pub fn creator_msp_id(&self) -> &MspId {
        &self.header.creator.msp_id
    }

    /// Read a key, seeing this transaction's own writes first.
    pub fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        if let Some(value) = self.rwset.writes.get(key) {
            return Ok(Some(value.clone()));
        }

        let committed = self.ledger.read(key)?;
        self.rwset
            .reads
            .entry(key.to_string())
            .or_insert_with(|| committed.as_ref().map(|(version, _)| *version));
        Ok(committed.map(|(_, value)| value))
    }

    /// Buffer a write.
    pub fn put_state(&mut self, key: &str, value: Vec<u8>) {
        self.rwset.writes.insert(key.to_string(), value);
    }

    pub fn get_history_for_key(&self, key: &str) -> Result<HistoryIter<'l>, LedgerError> {
        self.ledger.history_of(key)
    }

    pub fn history_order(&self) -> HistoryOrder {
        self.ledger.history_order()
    }

    /// Range scan against committed state. Range reads are not recorded in
    /// the read set.
    pub fn get_state_by_range_with_pagination(
        &self,
        start: &str,
        end: &str,
        page_size: u32,
        bookmark: &Bookmark,
    ) -> Result<RangePage, LedgerError> {
        self.ledger.range_scan(start, end, page_size, bookmark)
    }

    /// Keys written so far, in key order.
    pub fn pending_writes(&self) -> impl Iterator<Item = &str> {
        self.rwset.writes.keys().map(String::as_str)
    }

    /// Validate and apply the transaction.
    pub fn commit(self) -> Result<CommitReceipt, LedgerError> {
        self.ledger.commit(&self.header, self.rwset)
    }
}
