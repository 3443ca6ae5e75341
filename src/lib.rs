//! # Supply Ledger
//!
//! Multi-party supply-chain order tracking on a versioned key-value ledger
//! with optimistic concurrency control.
//!
//! ## Core Concepts
//!
//! - **Ledger**: MVCC key-value store; every write appends a version to the
//!   key's history
//! - **Contract**: role-checked order and shipment lifecycle operations
//!   executed inside one transaction
//! - **Submitter**: resubmits writes that lost a write-write race
//! - **History**: newest-first changelog with per-field diffs
//! - **Pager**: bookmark-based pagination over range scans
//!
//! ## Example
//!
//! ```ignore
//! use supply_ledger::{MemoryLedger, OrderItem, ServiceConfig, SupplyChainService};
//! use std::sync::Arc;
//!
//! let service = SupplyChainService::new(Arc::new(MemoryLedger::new()), ServiceConfig::default())?;
//!
//! service.create_order("O1", "MFG1", vec![OrderItem::new("part", 10, 5.0)])?;
//! service.accept_order("O1")?;
//!
//! for entry in service.order_history("O1")? {
//!     println!("{} {:?}", entry.tx_id, entry.diff);
//! }
//! ```

pub mod auth;
pub mod config;
pub mod contract;
pub mod error;
pub mod gateway;
pub mod history;
pub mod invocation;
pub mod ledger;
pub mod model;
pub mod query;
pub mod state;
pub mod submit;
pub mod types;

// Re-exports
pub use auth::{Actor, AuthorizationGuard, Role, RoleMap};
pub use config::{ContractConfig, ServiceConfig};
pub use contract::SupplyChainContract;
pub use error::{ConfigError, ContractError, ErrorKind, LedgerError, Result};
pub use gateway::{SupplyChainService, Wallet};
pub use history::{EnhancedHistoryRecord, FieldDelta, HistoryDiffEngine};
pub use invocation::Invocation;
pub use ledger::{
    HistoryOrder, Ledger, ManualClock, MemoryLedger, MemoryLedgerConfig, TxStub, VersionRecord,
};
pub use model::{Order, OrderItem, OrderStatus, Shipment};
pub use query::{LedgerEntry, PageRequest, Pages, QueryPager, QueryResponse, RawHistoryRecord};
pub use state::ProductionStatusMode;
pub use submit::{RetryConfig, RetryingSubmitter, Sleeper};
pub use types::*;
