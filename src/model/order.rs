//! Purchase orders.

use super::LedgerRecord;
use crate::error::{ContractError, Result};
use crate::types::{MspId, ObjectType, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Published by the OEM.
    Created,
    /// Accepted by the manufacturer.
    Accepted,
    Producing,
    Produced,
    /// Waiting for carrier pickup.
    Ready,
    /// In transit.
    Shipped,
    Delivered,
    /// Receipt confirmed by the OEM. Terminal.
    Received,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Created,
        OrderStatus::Accepted,
        OrderStatus::Producing,
        OrderStatus::Produced,
        OrderStatus::Ready,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Received,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::Producing => "PRODUCING",
            OrderStatus::Produced => "PRODUCED",
            OrderStatus::Ready => "READY",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Received => "RECEIVED",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == OrderStatus::Received
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self> {
        OrderStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ContractError::Serialization(format!("unknown order status {:?}", s)))
    }
}

/// One line of an order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub quantity: i64,
    pub price: f64,
}

impl OrderItem {
    pub fn new(name: impl Into<String>, quantity: i64, price: f64) -> Self {
        Self {
            name: name.into(),
            quantity,
            price,
        }
    }

    /// Check `quantity > 0` and `price >= 0` (finite).
    pub fn validate(&self) -> Result<()> {
        if self.quantity <= 0 {
            return Err(ContractError::Serialization(format!(
                "item {:?}: quantity must be positive, got {}",
                self.name, self.quantity
            )));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ContractError::Serialization(format!(
                "item {:?}: price must be a non-negative number, got {}",
                self.name, self.price
            )));
        }
        Ok(())
    }

    pub fn line_total(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}

/// Parse and validate an items payload (a JSON array of items).
pub fn parse_items(json: &str) -> Result<Vec<OrderItem>> {
    let items: Vec<OrderItem> = serde_json::from_str(json)
        .map_err(|e| ContractError::Serialization(format!("failed to parse items: {}", e)))?;
    validate_items(&items)?;
    Ok(items)
}

pub(crate) fn validate_items(items: &[OrderItem]) -> Result<()> {
    if items.is_empty() {
        return Err(ContractError::Serialization("order has no items".into()));
    }
    items.iter().try_for_each(OrderItem::validate)?;
    let total = Order::compute_total(items);
    if !total.is_finite() {
        return Err(ContractError::Serialization(format!(
            "order total must be a finite number, got {}",
            total
        )));
    }
    Ok(())
}

/// A purchase order as stored on the ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub object_type: ObjectType,
    /// Credential of the OEM that published the order.
    pub oem_id: MspId,
    pub manufacturer_id: String,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    /// Fixed at creation.
    pub total_price: f64,
    #[serde(default, with = "super::empty_as_none")]
    pub shipment_id: Option<String>,
    pub create_time: Timestamp,
    pub update_time: Timestamp,
}

impl Order {
    pub fn compute_total(items: &[OrderItem]) -> f64 {
        items.iter().map(OrderItem::line_total).sum()
    }
}

impl LedgerRecord for Order {
    const OBJECT_TYPE: ObjectType = ObjectType::Order;

    fn key(&self) -> &str {
        &self.id
    }
}
