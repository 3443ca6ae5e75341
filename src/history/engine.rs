//! Raw version log to newest-first diffed changelog.

use super::diff::{generate_diff, Diff};
use crate::error::{ContractError, LedgerError, Result};
use crate::ledger::{HistoryIter, HistoryOrder, VersionRecord};
use crate::types::{Timestamp, TxId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A version record with its value decoded and the fields it changed
/// relative to the next older version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedHistoryRecord {
    pub tx_id: TxId,
    pub timestamp: Timestamp,
    pub is_delete: bool,
    pub value: Option<Value>,
    pub diff: Diff,
}

/// Builds enhanced history from a key's version log.
#[derive(Clone, Copy, Debug, Default)]
pub struct HistoryDiffEngine;

impl HistoryDiffEngine {
    pub fn new() -> Self {
        HistoryDiffEngine
    }

    /// Enhance `records` as yielded by a ledger whose history comes in
    /// `order`.
    ///
    /// Newest-first input is processed lazily, one record ahead, and a record
    /// newer than its predecessor ends the stream with an error. Any other
    /// order is buffered and stable-sorted by descending timestamp first; a
    /// log that fails to read part way then yields only that error.
    pub fn enhance<'a>(&self, records: HistoryIter<'a>, order: HistoryOrder) -> EnhancedHistory<'a> {
        let decoded = records.map(|r| r.map(Decoded::from_record).map_err(ContractError::from));
        match order {
            HistoryOrder::NewestFirst => EnhancedHistory::new(Box::new(decoded)),
            HistoryOrder::OldestFirst | HistoryOrder::Unspecified => match collect_sorted(decoded) {
                Ok(sorted) => EnhancedHistory::new(Box::new(sorted.into_iter().map(Ok::<_, ContractError>))),
                Err(e) => EnhancedHistory::new(Box::new(std::iter::once(Err(e)))),
            },
        }
    }

    /// Enhance records in no particular order.
    pub fn enhance_records(&self, records: Vec<VersionRecord>) -> EnhancedHistory<'static> {
        self.enhance(Box::new(records.into_iter().map(Ok::<_, LedgerError>)), HistoryOrder::Unspecified)
    }
}

/// Buffer the log and order it newest first, keeping input order among
/// equal timestamps.
fn collect_sorted(decoded: impl Iterator<Item = Result<Decoded>>) -> Result<Vec<Decoded>> {
    let mut items = decoded.collect::<Result<Vec<_>>>()?;
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(items)
}

/// One version with its value parsed.
struct Decoded {
    tx_id: TxId,
    timestamp: Timestamp,
    is_delete: bool,
    /// The value and its top-level fields, or why it is unusable.
    parsed: Result<(Option<Value>, Map<String, Value>)>,
}

impl Decoded {
    fn from_record(record: VersionRecord) -> Self {
        let parsed = match &record.value {
            Some(bytes) if !record.is_delete => parse_state(bytes, &record.tx_id),
            _ => Ok((None, Map::new())),
        };
        Decoded {
            tx_id: record.tx_id,
            timestamp: record.timestamp,
            is_delete: record.is_delete,
            parsed,
        }
    }
}

fn parse_state(bytes: &[u8], tx_id: &TxId) -> Result<(Option<Value>, Map<String, Value>)> {
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Object(state) => Ok((Some(Value::Object(state.clone())), state)),
        _ => Err(ContractError::Serialization(format!(
            "history value written by {} is not an object",
            tx_id
        ))),
    }
}

/// Iterator over enhanced history, newest first.
///
/// If the source yields a version newer than the one before it, that item
/// is a [`ContractError::Ledger`] and the iterator ends.
pub struct EnhancedHistory<'a> {
    source: Box<dyn Iterator<Item = Result<Decoded>> + Send + 'a>,
    lookahead: Option<Result<Decoded>>,
    done: bool,
}

impl<'a> EnhancedHistory<'a> {
    fn new(source: Box<dyn Iterator<Item = Result<Decoded>> + Send + 'a>) -> Self {
        Self {
            source,
            lookahead: None,
            done: false,
        }
    }
}

impl Iterator for EnhancedHistory<'_> {
    type Item = Result<EnhancedHistoryRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let current = match self.lookahead.take() {
            Some(item) => item,
            None => self.source.next()?,
        };
        self.lookahead = self.source.next();

        let current = match current {
            Ok(d) => d,
            Err(e) => return Some(Err(e)),
        };
        let misordered = match &self.lookahead {
            Some(Ok(older)) if older.timestamp > current.timestamp => Some(format!(
                "history out of order: {} at {} precedes newer {} at {}",
                current.tx_id, current.timestamp.0, older.tx_id, older.timestamp.0
            )),
            _ => None,
        };
        if let Some(message) = misordered {
            tracing::warn!(tx_id = %current.tx_id, "history not newest first");
            self.done = true;
            self.lookahead = None;
            return Some(Err(ContractError::Ledger(message)));
        }

        let (value, state) = match current.parsed {
            Ok(parsed) => parsed,
            Err(e) => return Some(Err(e)),
        };

        // An unreadable older version diffs as an empty state.
        let empty = Map::new();
        let older = match &self.lookahead {
            Some(Ok(Decoded {
                parsed: Ok((_, older)),
                ..
            })) => older,
            _ => &empty,
        };

        Some(Ok(EnhancedHistoryRecord {
            diff: generate_diff(older, &state),
            tx_id: current.tx_id,
            timestamp: current.timestamp,
            is_delete: current.is_delete,
            value,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn record(ts: i64, value: Value) -> VersionRecord {
        VersionRecord {
            tx_id: TxId(format!("tx{}", ts)),
            timestamp: Timestamp(ts),
            is_delete: false,
            value: Some(serde_json::to_vec(&value).unwrap()),
        }
    }

    fn order_at(ts: i64, status: &str) -> VersionRecord {
        record(
            ts,
            json!({"objectType": "ORDER", "id": "O1", "status": status, "updateTime": ts}),
        )
    }

    fn stream(log: Vec<VersionRecord>) -> HistoryIter<'static> {
        Box::new(log.into_iter().map(Ok::<_, LedgerError>))
    }

    fn collect(history: EnhancedHistory<'_>) -> Vec<EnhancedHistoryRecord> {
        history.collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn test_newest_first_stream() {
        let log = vec![order_at(3, "SHIPPED"), order_at(2, "ACCEPTED"), order_at(1, "CREATED")];
        let history = collect(HistoryDiffEngine::new().enhance(stream(log), HistoryOrder::NewestFirst));

        assert_eq!(history.len(), 3);
        assert_eq!(history[0].timestamp, Timestamp(3));
        assert_eq!(history[0].diff["status"].old, Some(json!("ACCEPTED")));
        assert_eq!(history[0].diff["status"].new, Some(json!("SHIPPED")));
        // oldest diffs against nothing
        assert_eq!(history[2].diff.len(), 3);
        assert_eq!(history[2].diff["id"].old, None);
    }

    #[test]
    fn test_unordered_input_is_sorted_newest_first() {
        let log = vec![order_at(1, "CREATED"), order_at(3, "SHIPPED"), order_at(2, "ACCEPTED")];
        let history = collect(HistoryDiffEngine::new().enhance_records(log));

        let stamps: Vec<i64> = history.iter().map(|h| h.timestamp.0).collect();
        assert_eq!(stamps, vec![3, 2, 1]);
        assert_eq!(history[1].diff["status"].old, Some(json!("CREATED")));
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let log = vec![order_at(5, "A"), order_at(5, "B"), order_at(1, "C")];
        let history = collect(HistoryDiffEngine::new().enhance_records(log));
        let statuses: Vec<_> = history.iter().map(|h| h.value.as_ref().unwrap()["status"].clone()).collect();
        assert_eq!(statuses, vec![json!("A"), json!("B"), json!("C")]);
    }

    #[test]
    fn test_delete_diffs_as_empty_state() {
        let delete = VersionRecord {
            tx_id: TxId("tx2".into()),
            timestamp: Timestamp(2),
            is_delete: true,
            value: None,
        };
        let log = vec![delete, order_at(1, "CREATED")];
        let history = collect(HistoryDiffEngine::new().enhance(stream(log), HistoryOrder::NewestFirst));

        assert!(history[0].is_delete);
        assert_eq!(history[0].value, None);
        assert_eq!(history[0].diff["status"].new, None);
        assert_eq!(history[0].diff["status"].old, Some(json!("CREATED")));
    }

    #[test]
    fn test_non_object_value_fails_that_item() {
        let log = vec![order_at(3, "SHIPPED"), record(2, json!([1, 2])), order_at(1, "CREATED")];
        let items: Vec<_> = HistoryDiffEngine::new()
            .enhance(stream(log), HistoryOrder::NewestFirst)
            .collect();

        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert_eq!(items[1].as_ref().unwrap_err().kind(), ErrorKind::Serialization);
        assert!(items[2].is_ok());
    }

    #[test]
    fn test_misordered_stream_is_an_error() {
        let log = vec![order_at(1, "CREATED"), order_at(3, "SHIPPED"), order_at(2, "ACCEPTED")];
        let items: Vec<_> = HistoryDiffEngine::new()
            .enhance(stream(log), HistoryOrder::NewestFirst)
            .collect();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap_err().kind(), ErrorKind::Ledger);
    }

    #[test]
    fn test_misordered_tail_stops_after_good_prefix() {
        let log = vec![order_at(5, "READY"), order_at(2, "ACCEPTED"), order_at(4, "PRODUCED")];
        let items: Vec<_> = HistoryDiffEngine::new()
            .enhance(stream(log), HistoryOrder::NewestFirst)
            .collect();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().timestamp, Timestamp(5));
        assert_eq!(items[1].as_ref().unwrap_err().kind(), ErrorKind::Ledger);
    }

    #[test]
    fn test_equal_timestamps_stream_in_order() {
        let log = vec![order_at(2, "B"), order_at(2, "A"), order_at(1, "C")];
        let history = collect(HistoryDiffEngine::new().enhance(stream(log), HistoryOrder::NewestFirst));
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_serialized_shape() {
        let history = collect(HistoryDiffEngine::new().enhance_records(vec![order_at(1, "CREATED")]));
        let json = serde_json::to_value(&history[0]).unwrap();
        assert_eq!(json["txId"], "tx1");
        assert_eq!(json["isDelete"], false);
        assert_eq!(json["diff"]["status"], json!({"old": null, "new": "CREATED"}));
        assert!(json["diff"].get("objectType").is_none());
    }
}
