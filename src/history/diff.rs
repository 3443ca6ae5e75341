//! Field-level diff between two record states.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Field excluded from every diff.
pub const OBJECT_TYPE_FIELD: &str = "objectType";

/// Change to one top-level field. `None` means the field is absent on that
/// side and serializes as `null`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDelta {
    pub old: Option<Value>,
    pub new: Option<Value>,
}

/// Per-field changes, keyed and ordered by field name.
pub type Diff = BTreeMap<String, FieldDelta>;

/// Diff `old` against `new` over the union of their field names.
pub fn generate_diff(old: &Map<String, Value>, new: &Map<String, Value>) -> Diff {
    let mut diff = Diff::new();

    for (field, new_value) in new {
        if field == OBJECT_TYPE_FIELD {
            continue;
        }
        match old.get(field) {
            Some(old_value) if structurally_equal(old_value, new_value) => {}
            old_value => {
                diff.insert(
                    field.clone(),
                    FieldDelta {
                        old: old_value.cloned(),
                        new: Some(new_value.clone()),
                    },
                );
            }
        }
    }

    for (field, old_value) in old {
        if field == OBJECT_TYPE_FIELD || new.contains_key(field) {
            continue;
        }
        diff.insert(
            field.clone(),
            FieldDelta {
                old: Some(old_value.clone()),
                new: None,
            },
        );
    }

    diff
}

/// Rebuild the newer state from the older one and their diff.
pub fn apply_diff(old: &Map<String, Value>, diff: &Diff) -> Map<String, Value> {
    let mut state = old.clone();
    for (field, delta) in diff {
        match &delta.new {
            Some(value) => {
                state.insert(field.clone(), value.clone());
            }
            None => {
                state.remove(field);
            }
        }
    }
    state
}

/// Deep equality by value. Numbers compare numerically, so `50` and `50.0`
/// are equal; object key order is irrelevant.
pub fn structurally_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return x == y;
            }
            if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                return x == y;
            }
            match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| structurally_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).map_or(false, |w| structurally_equal(v, w)))
        }
        _ => false,
    }
}
