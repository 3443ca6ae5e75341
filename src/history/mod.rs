//! Auditable per-key history.
//!
//! The ledger keeps every version of a key. This module turns that raw log
//! into a newest-first changelog where each entry carries the top-level
//! fields it changed relative to the previous version.

pub mod diff;
mod engine;

pub use diff::{apply_diff, generate_diff, structurally_equal, Diff, FieldDelta, OBJECT_TYPE_FIELD};
pub use engine::{EnhancedHistory, EnhancedHistoryRecord, HistoryDiffEngine};
