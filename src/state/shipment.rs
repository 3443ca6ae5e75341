//! Shipment transitions.
//!
//! A shipment is opened by the carrier's pickup of an order and afterwards
//! only its location and status text change.

use super::TransitionContext;
use crate::auth::{Actor, Role};
use crate::error::{ContractError, Result};
use crate::model::{Order, Shipment};
use crate::types::{ObjectType, Operation};

#[derive(Clone, Debug, PartialEq)]
pub enum ShipmentCommand {
    UpdateLocation { location: String },
}

impl ShipmentCommand {
    pub fn operation(&self) -> Operation {
        match self {
            ShipmentCommand::UpdateLocation { .. } => Operation::UpdateLocation,
        }
    }

    pub fn required_role(&self) -> Role {
        match self {
            ShipmentCommand::UpdateLocation { .. } => Role::Carrier,
        }
    }
}

/// Shipment created at pickup. The carrier is the picking-up actor.
pub(crate) fn open(order: &Order, shipment_id: &str, actor: &Actor, ctx: &TransitionContext<'_>) -> Shipment {
    Shipment {
        id: shipment_id.to_string(),
        object_type: ObjectType::Shipment,
        order_id: order.id.clone(),
        carrier_id: actor.msp_id.clone(),
        location: ctx.pickup_location.to_string(),
        status: ctx.in_transit_status.to_string(),
        update_time: ctx.now,
    }
}

/// Apply a command to the current shipment.
pub fn apply(
    current: &Shipment,
    command: &ShipmentCommand,
    actor: &Actor,
    ctx: &TransitionContext<'_>,
) -> Result<Shipment> {
    actor.require(command.required_role(), command.operation())?;

    let mut next = current.clone();
    next.update_time = ctx.now;
    match command {
        ShipmentCommand::UpdateLocation { location } => {
            if location.trim().is_empty() {
                return Err(ContractError::InvalidArgument(
                    "location must not be empty".to_string(),
                ));
            }
            next.location = location.clone();
        }
    }
    Ok(next)
}
