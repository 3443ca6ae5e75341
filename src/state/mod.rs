//! Order and shipment lifecycle state machines.
//!
//! These are pure functions from (current record, command, actor) to the
//! next record or a rejection. They never touch the ledger; the contract
//! reads the current record, calls in here, and writes the result.

pub mod order;
pub mod shipment;

pub use order::{NewOrder, OrderCommand, OrderOutcome};
pub use shipment::ShipmentCommand;

use crate::model::{DEFAULT_PICKUP_LOCATION, IN_TRANSIT_STATUS};
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

/// How `UpdateProductionStatus` treats the requested target status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionStatusMode {
    /// Accept any known status without checking the current one.
    #[default]
    Lenient,
    /// Only `ACCEPTED -> PRODUCING -> PRODUCED -> READY`, one step at a time.
    Strict,
}

/// Inputs a transition needs besides the record itself.
#[derive(Clone, Copy, Debug)]
pub struct TransitionContext<'a> {
    /// Transaction timestamp; becomes `updateTime` (and `createTime`).
    pub now: Timestamp,
    pub production_status: ProductionStatusMode,
    pub pickup_location: &'a str,
    pub in_transit_status: &'a str,
}

impl TransitionContext<'static> {
    /// Context with default rules at `now`.
    pub fn at(now: Timestamp) -> Self {
        Self {
            now,
            production_status: ProductionStatusMode::default(),
            pickup_location: DEFAULT_PICKUP_LOCATION,
            in_transit_status: IN_TRANSIT_STATUS,
        }
    }
}
