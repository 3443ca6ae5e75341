//! Shipments, created when a carrier picks up an order.

use super::LedgerRecord;
use crate::types::{MspId, ObjectType, Timestamp};
use serde::{Deserialize, Serialize};

/// Location recorded at pickup until the carrier reports one.
pub const DEFAULT_PICKUP_LOCATION: &str = "零部件仓库";

/// Shipment status text set at pickup ("in transit").
pub const IN_TRANSIT_STATUS: &str = "运输中";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub id: String,
    pub object_type: ObjectType,
    pub order_id: String,
    pub carrier_id: MspId,
    pub location: String,
    pub status: String,
    pub update_time: Timestamp,
}

impl LedgerRecord for Shipment {
    const OBJECT_TYPE: ObjectType = ObjectType::Shipment;

    fn key(&self) -> &str {
        &self.id
    }
}
