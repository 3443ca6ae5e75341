//! Property tests for diffs, history ordering and pagination.

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use supply_ledger::history::{apply_diff, generate_diff, OBJECT_TYPE_FIELD};
use supply_ledger::{
    HistoryDiffEngine, Identity, MemoryLedger, PageRequest, Pages, QueryPager, Timestamp, TxId,
    TxStub, VersionRecord,
};

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::from),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(2, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            prop::collection::btree_map("[a-c]", inner, 0..3)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn state() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-e]{1,2}", value(), 0..6).prop_map(|m| m.into_iter().collect())
}

fn shuffled_timestamps() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::btree_set(0i64..100_000, 1..20)
        .prop_map(|set| set.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_diff_of_identical_states_is_empty(a in state()) {
        prop_assert!(generate_diff(&a, &a).is_empty());
    }

    #[test]
    fn prop_diff_from_empty_adds_every_field(mut a in state()) {
        a.insert(OBJECT_TYPE_FIELD.to_string(), json!("ORDER"));
        let diff = generate_diff(&Map::new(), &a);

        prop_assert_eq!(diff.len(), a.len() - 1);
        for (field, delta) in &diff {
            prop_assert!(delta.old.is_none());
            prop_assert_eq!(delta.new.as_ref(), a.get(field));
        }
    }

    #[test]
    fn prop_apply_diff_reconstructs(a in state(), b in state()) {
        let diff = generate_diff(&a, &b);
        prop_assert_eq!(apply_diff(&a, &diff), b);
    }

    #[test]
    fn prop_history_strictly_descending(stamps in shuffled_timestamps()) {
        let records: Vec<VersionRecord> = stamps
            .iter()
            .map(|&ts| VersionRecord {
                tx_id: TxId(format!("tx{}", ts)),
                timestamp: Timestamp(ts),
                is_delete: false,
                value: Some(serde_json::to_vec(&json!({"objectType": "ORDER", "seq": ts})).unwrap()),
            })
            .collect();

        let history = HistoryDiffEngine::new()
            .enhance_records(records)
            .collect::<supply_ledger::Result<Vec<_>>>()
            .unwrap();

        prop_assert_eq!(history.len(), stamps.len());
        for pair in history.windows(2) {
            prop_assert!(pair[0].timestamp > pair[1].timestamp);
            let older = pair[1].value.as_ref().and_then(Value::as_object).cloned().unwrap_or_default();
            let newer = pair[0].value.as_ref().and_then(Value::as_object).cloned().unwrap_or_default();
            let mut rebuilt = apply_diff(&older, &pair[0].diff);
            rebuilt.insert(OBJECT_TYPE_FIELD.to_string(), json!("ORDER"));
            prop_assert_eq!(rebuilt, newer);
        }
    }

    #[test]
    fn prop_pages_yield_every_key_once(
        keys in prop::collection::btree_set("[a-z0-9]{1,8}", 0..40),
        page_size in 1u32..10,
    ) {
        let ledger = MemoryLedger::new();
        if !keys.is_empty() {
            let mut stub = TxStub::begin(&ledger, Identity::new("Org1MSP", "seed"));
            for key in &keys {
                stub.put_state(key, b"{}".to_vec());
            }
            stub.commit().unwrap();
        }

        let pager = QueryPager::default();
        let mut seen = Vec::new();
        for page in Pages::new(page_size, |request: &PageRequest| {
            let stub = TxStub::begin(&ledger, Identity::new("Org1MSP", "reader"));
            pager.page(&stub, request, |entry| Ok(Some(entry.key)))
        }) {
            let page = page.unwrap();
            prop_assert!(page.records.len() <= page_size as usize);
            seen.extend(page.records);
        }

        let expected: Vec<String> = keys.into_iter().collect();
        prop_assert_eq!(&seen, &expected);
        let unique: BTreeSet<&String> = seen.iter().collect();
        prop_assert_eq!(unique.len(), seen.len());
    }
}
