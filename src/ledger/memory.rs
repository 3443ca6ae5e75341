//! In-process MVCC ledger.
//!
//! World state lives in a `BTreeMap` so range scans follow native key
//! order. Each key keeps its append-only history chain ordered by
//! transaction timestamp. Commit validation and application run under a
//! single write lock.

use super::{
    Clock, CommitReceipt, HistoryIter, HistoryOrder, KeyValue, Ledger, RangePage, ReadWriteSet,
    SystemClock, TxHeader, Version, VersionRecord,
};
use crate::error::LedgerError;
use crate::types::{Bookmark, Identity, Timestamp, TxId};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Memory ledger configuration.
#[derive(Clone, Debug, Default)]
pub struct MemoryLedgerConfig {
    /// Order in which `history_of` yields records.
    pub history_order: HistoryOrder,
}

/// Current value of a key.
struct Entry {
    version: Version,
    value: Vec<u8>,
}

#[derive(Default)]
struct WorldState {
    current: BTreeMap<String, Entry>,
    /// Per-key history, ascending by timestamp.
    history: HashMap<String, Vec<Arc<VersionRecord>>>,
    height: u64,
}

/// Ledger kept entirely in memory.
pub struct MemoryLedger {
    config: MemoryLedgerConfig,
    state: RwLock<WorldState>,
    clock: Box<dyn Clock>,
    /// Last timestamp handed out, to keep transaction times strictly increasing.
    last_timestamp: Mutex<Timestamp>,
    nonce: AtomicU64,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::with_config(MemoryLedgerConfig::default(), SystemClock)
    }

    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self::with_config(MemoryLedgerConfig::default(), clock)
    }

    pub fn with_config(config: MemoryLedgerConfig, clock: impl Clock + 'static) -> Self {
        Self {
            config,
            state: RwLock::new(WorldState::default()),
            clock: Box::new(clock),
            last_timestamp: Mutex::new(Timestamp(i64::MIN)),
            nonce: AtomicU64::new(1),
        }
    }

    /// Number of committed transactions that wrote at least one key.
    pub fn height(&self) -> u64 {
        self.state.read().height
    }

    pub fn key_count(&self) -> usize {
        self.state.read().current.len()
    }

    /// Number of versions recorded for a key.
    pub fn version_count(&self, key: &str) -> usize {
        self.state.read().history.get(key).map_or(0, Vec::len)
    }

    fn next_timestamp(&self) -> Timestamp {
        let mut last = self.last_timestamp.lock();
        let now = self.clock.now();
        let next = if now > *last { now } else { Timestamp(last.0 + 1) };
        *last = next;
        next
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger for MemoryLedger {
    fn begin(&self, creator: Identity) -> TxHeader {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        TxHeader {
            tx_id: TxId::derive(&creator.msp_id, nonce),
            timestamp: self.next_timestamp(),
            creator,
        }
    }

    fn read(&self, key: &str) -> Result<Option<(Version, Vec<u8>)>, LedgerError> {
        let state = self.state.read();
        Ok(state
            .current
            .get(key)
            .map(|entry| (entry.version, entry.value.clone())))
    }

    fn commit(&self, header: &TxHeader, rwset: ReadWriteSet) -> Result<CommitReceipt, LedgerError> {
        let mut state = self.state.write();

        for (key, seen) in &rwset.reads {
            let current = state.current.get(key).map(|entry| entry.version);
            if current != *seen {
                tracing::debug!(
                    tx_id = %header.tx_id,
                    key = %key,
                    "read version changed before commit"
                );
                return Err(LedgerError::MvccReadConflict {
                    key: key.clone(),
                    tx_id: header.tx_id.clone(),
                });
            }
        }

        if rwset.is_read_only() {
            return Ok(CommitReceipt {
                tx_id: header.tx_id.clone(),
                version: Version(state.height),
                keys_written: Vec::new(),
            });
        }

        state.height += 1;
        let version = Version(state.height);
        let mut keys_written = Vec::with_capacity(rwset.writes.len());

        for (key, value) in rwset.writes {
            let record = Arc::new(VersionRecord {
                tx_id: header.tx_id.clone(),
                timestamp: header.timestamp,
                is_delete: false,
                value: Some(value.clone()),
            });

            let chain = state.history.entry(key.clone()).or_default();
            // Keep the chain sorted by timestamp; equal timestamps stay in commit order.
            let at = chain.partition_point(|r| r.timestamp <= header.timestamp);
            chain.insert(at, record);

            state.current.insert(key.clone(), Entry { version, value });
            keys_written.push(key);
        }

        tracing::debug!(
            tx_id = %header.tx_id,
            height = version.0,
            keys = ?keys_written,
            "committed"
        );

        Ok(CommitReceipt {
            tx_id: header.tx_id.clone(),
            version,
            keys_written,
        })
    }

    fn history_of(&self, key: &str) -> Result<HistoryIter<'_>, LedgerError> {
        let chain: Vec<Arc<VersionRecord>> = self
            .state
            .read()
            .history
            .get(key)
            .cloned()
            .unwrap_or_default();

        let records = chain.into_iter().map(|r| Ok::<_, LedgerError>((*r).clone()));
        Ok(match self.config.history_order {
            HistoryOrder::OldestFirst | HistoryOrder::Unspecified => Box::new(records),
            HistoryOrder::NewestFirst => Box::new(records.rev()),
        })
    }

    fn history_order(&self) -> HistoryOrder {
        self.config.history_order
    }

    fn range_scan(
        &self,
        start: &str,
        end: &str,
        page_size: u32,
        bookmark: &Bookmark,
    ) -> Result<RangePage, LedgerError> {
        if page_size == 0 {
            return Err(LedgerError::InvalidPageSize(page_size));
        }

        let from = if bookmark.is_empty() {
            start.to_string()
        } else {
            let resume = decode_bookmark(bookmark)?;
            if resume.as_str() > start {
                resume
            } else {
                start.to_string()
            }
        };

        let state = self.state.read();
        let mut scan = state
            .current
            .range::<str, _>((Bound::Included(from.as_str()), Bound::Unbounded))
            .take_while(|(key, _)| end.is_empty() || key.as_str() < end);

        let mut entries = Vec::new();
        for (key, entry) in scan.by_ref().take(page_size as usize) {
            entries.push(KeyValue {
                key: key.clone(),
                value: entry.value.clone(),
            });
        }

        let bookmark = match scan.next() {
            Some((next_key, _)) => encode_bookmark(next_key),
            None => Bookmark::start(),
        };

        Ok(RangePage {
            fetched_records_count: entries.len() as u32,
            entries,
            bookmark,
        })
    }
}

/// Bookmark format: hex of the next key, a dot, and the CRC32 of that key.
fn encode_bookmark(next_key: &str) -> Bookmark {
    let checksum = crc32fast::hash(next_key.as_bytes());
    Bookmark(format!("{}.{:08x}", hex::encode(next_key), checksum))
}

fn decode_bookmark(bookmark: &Bookmark) -> Result<String, LedgerError> {
    let invalid = || LedgerError::InvalidBookmark(bookmark.as_str().to_string());

    let (key_hex, checksum_hex) = bookmark.as_str().split_once('.').ok_or_else(invalid)?;
    let key_bytes = hex::decode(key_hex).map_err(|_| invalid())?;
    let checksum = u32::from_str_radix(checksum_hex, 16).map_err(|_| invalid())?;
    if crc32fast::hash(&key_bytes) != checksum {
        return Err(invalid());
    }
    String::from_utf8(key_bytes).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{ManualClock, TxStub};

    fn org1() -> Identity {
        Identity::new("Org1MSP", "user1")
    }

    fn put(ledger: &MemoryLedger, key: &str, value: &[u8]) {
        let mut stub = TxStub::begin(ledger, org1());
        stub.put_state(key, value.to_vec());
        stub.commit().unwrap();
    }

    #[test]
    fn test_commit_and_read() {
        let ledger = MemoryLedger::new();
        put(&ledger, "a", b"1");

        assert_eq!(ledger.get("a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(ledger.get("b").unwrap(), None);
        assert_eq!(ledger.height(), 1);
    }

    #[test]
    fn test_read_your_writes() {
        let ledger = MemoryLedger::new();
        let mut stub = TxStub::begin(&ledger, org1());
        stub.put_state("a", b"pending".to_vec());
        assert_eq!(stub.get_state("a").unwrap(), Some(b"pending".to_vec()));
        drop(stub);

        assert_eq!(ledger.get("a").unwrap(), None);
    }

    #[test]
    fn test_stale_read_conflicts() {
        let ledger = MemoryLedger::new();
        put(&ledger, "a", b"0");

        let mut first = TxStub::begin(&ledger, org1());
        let mut second = TxStub::begin(&ledger, org1());
        first.get_state("a").unwrap();
        second.get_state("a").unwrap();
        first.put_state("a", b"1".to_vec());
        second.put_state("a", b"2".to_vec());

        first.commit().unwrap();
        let err = second.commit().unwrap_err();
        assert!(matches!(err, LedgerError::MvccReadConflict { ref key, .. } if key == "a"));
        assert_eq!(ledger.get("a").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn test_absent_read_conflicts_with_insert() {
        let ledger = MemoryLedger::new();

        let mut first = TxStub::begin(&ledger, org1());
        let mut second = TxStub::begin(&ledger, org1());
        assert_eq!(first.get_state("new").unwrap(), None);
        assert_eq!(second.get_state("new").unwrap(), None);
        first.put_state("new", b"1".to_vec());
        second.put_state("new", b"2".to_vec());

        first.commit().unwrap();
        assert!(second.commit().unwrap_err().is_write_conflict());
    }

    #[test]
    fn test_different_keys_do_not_conflict() {
        let ledger = MemoryLedger::new();
        put(&ledger, "a", b"0");
        put(&ledger, "b", b"0");

        let mut first = TxStub::begin(&ledger, org1());
        let mut second = TxStub::begin(&ledger, org1());
        first.get_state("a").unwrap();
        second.get_state("b").unwrap();
        first.put_state("a", b"1".to_vec());
        second.put_state("b", b"1".to_vec());

        first.commit().unwrap();
        second.commit().unwrap();
    }

    #[test]
    fn test_timestamps_strictly_increase() {
        let clock = Arc::new(ManualClock::new(Timestamp(1_000)));
        let ledger = MemoryLedger::with_clock(Arc::clone(&clock));

        let a = ledger.begin(org1()).timestamp;
        let b = ledger.begin(org1()).timestamp;
        clock.advance(500);
        let c = ledger.begin(org1()).timestamp;

        assert_eq!(a, Timestamp(1_000));
        assert_eq!(b, Timestamp(1_001));
        assert_eq!(c, Timestamp(1_500));
    }

    #[test]
    fn test_history_orders() {
        let newest = MemoryLedger::new();
        let oldest = MemoryLedger::with_config(
            MemoryLedgerConfig {
                history_order: HistoryOrder::OldestFirst,
            },
            SystemClock,
        );
        for ledger in [&newest, &oldest] {
            put(ledger, "k", b"1");
            put(ledger, "k", b"2");
            put(ledger, "k", b"3");
        }

        let values = |ledger: &MemoryLedger| -> Vec<Vec<u8>> {
            ledger
                .history_of("k")
                .unwrap()
                .map(|r| r.unwrap().value.unwrap())
                .collect()
        };
        assert_eq!(values(&newest), vec![b"3".to_vec(), b"2".to_vec(), b"1".to_vec()]);
        assert_eq!(values(&oldest), vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]);
        assert_eq!(newest.version_count("k"), 3);
        assert_eq!(newest.history_of("missing").unwrap().count(), 0);
    }

    #[test]
    fn test_range_scan_pages() {
        let ledger = MemoryLedger::new();
        for key in ["a", "b", "c", "d", "e"] {
            put(&ledger, key, key.as_bytes());
        }

        let page = ledger.range_scan("", "", 2, &Bookmark::start()).unwrap();
        let keys: Vec<_> = page.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(page.fetched_records_count, 2);
        assert!(!page.bookmark.is_empty());

        let page = ledger.range_scan("", "", 2, &page.bookmark).unwrap();
        let keys: Vec<_> = page.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["c", "d"]);

        let page = ledger.range_scan("", "", 2, &page.bookmark).unwrap();
        let keys: Vec<_> = page.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["e"]);
        assert!(page.bookmark.is_empty());
    }

    #[test]
    fn test_range_scan_bounds() {
        let ledger = MemoryLedger::new();
        for key in ["a", "b", "c", "d"] {
            put(&ledger, key, b"x");
        }

        let page = ledger.range_scan("b", "d", 10, &Bookmark::start()).unwrap();
        let keys: Vec<_> = page.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "c"]);
        assert!(page.bookmark.is_empty());
    }

    #[test]
    fn test_invalid_bookmark_and_page_size() {
        let ledger = MemoryLedger::new();
        put(&ledger, "a", b"x");

        assert!(matches!(
            ledger.range_scan("", "", 0, &Bookmark::start()),
            Err(LedgerError::InvalidPageSize(0))
        ));
        assert!(matches!(
            ledger.range_scan("", "", 1, &Bookmark::from("not-a-bookmark")),
            Err(LedgerError::InvalidBookmark(_))
        ));

        // Tampered key with the original checksum.
        let good = encode_bookmark("b");
        let (_, checksum) = good.as_str().split_once('.').unwrap();
        let forged = Bookmark(format!("{}.{}", hex::encode("c"), checksum));
        assert!(matches!(
            ledger.range_scan("", "", 1, &forged),
            Err(LedgerError::InvalidBookmark(_))
        ));
    }
}
