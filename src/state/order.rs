//! Order transitions.
//!
//! | Command | Role | Requires | Result |
//! |---|---|---|---|
//! | create | OEM | new key | `CREATED` |
//! | `Accept` | Manufacturer | `CREATED` | `ACCEPTED` |
//! | `SetProductionStatus` | Manufacturer | see [`ProductionStatusMode`] | target |
//! | `Pickup` | Carrier | no shipment yet | `SHIPPED` + new shipment |
//! | `Deliver` | Carrier | `SHIPPED` | `DELIVERED` |
//! | `ConfirmReceipt` | OEM | `DELIVERED` | `RECEIVED` |

use super::{shipment, ProductionStatusMode, TransitionContext};
use crate::auth::{Actor, Role};
use crate::error::{ContractError, Result};
use crate::model::{validate_items, Order, OrderItem, OrderStatus, Shipment};
use crate::types::{ObjectType, Operation};

/// Payload of `CreateOrder`.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOrder {
    pub id: String,
    pub manufacturer_id: String,
    pub items: Vec<OrderItem>,
}

/// A change to an existing order.
#[derive(Clone, Debug, PartialEq)]
pub enum OrderCommand {
    Accept,
    SetProductionStatus(OrderStatus),
    Pickup { shipment_id: String },
    Deliver,
    ConfirmReceipt,
}

impl OrderCommand {
    pub fn operation(&self) -> Operation {
        match self {
            OrderCommand::Accept => Operation::AcceptOrder,
            OrderCommand::SetProductionStatus(_) => Operation::UpdateProductionStatus,
            OrderCommand::Pickup { .. } => Operation::PickupGoods,
            OrderCommand::Deliver => Operation::DeliverGoods,
            OrderCommand::ConfirmReceipt => Operation::ConfirmReceipt,
        }
    }

    pub fn required_role(&self) -> Role {
        match self {
            OrderCommand::Accept | OrderCommand::SetProductionStatus(_) => Role::Manufacturer,
            OrderCommand::Pickup { .. } | OrderCommand::Deliver => Role::Carrier,
            OrderCommand::ConfirmReceipt => Role::Oem,
        }
    }

    /// Status the order must be in, if the command checks one.
    pub fn required_status(&self) -> Option<OrderStatus> {
        match self {
            OrderCommand::Accept => Some(OrderStatus::Created),
            OrderCommand::Deliver => Some(OrderStatus::Shipped),
            OrderCommand::ConfirmReceipt => Some(OrderStatus::Delivered),
            OrderCommand::SetProductionStatus(_) | OrderCommand::Pickup { .. } => None,
        }
    }
}

/// Records produced by a transition.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderOutcome {
    pub order: Order,
    /// Set only by `Pickup`.
    pub shipment: Option<Shipment>,
}

/// Build a new order. `oemId` is the creating actor's credential.
pub fn create(new: NewOrder, actor: &Actor, ctx: &TransitionContext<'_>) -> Result<Order> {
    actor.require(Role::Oem, Operation::CreateOrder)?;
    validate_items(&new.items)?;

    let total_price = Order::compute_total(&new.items);
    Ok(Order {
        id: new.id,
        object_type: ObjectType::Order,
        oem_id: actor.msp_id.clone(),
        manufacturer_id: new.manufacturer_id,
        items: new.items,
        status: OrderStatus::Created,
        total_price,
        shipment_id: None,
        create_time: ctx.now,
        update_time: ctx.now,
    })
}

/// Apply a command to the current order.
pub fn apply(
    current: &Order,
    command: &OrderCommand,
    actor: &Actor,
    ctx: &TransitionContext<'_>,
) -> Result<OrderOutcome> {
    let operation = command.operation();
    actor.require(command.required_role(), operation)?;

    if let Some(required) = command.required_status() {
        if current.status != required {
            return Err(reject(
                current,
                operation,
                format!("requires status {}, order is {}", required, current.status),
            ));
        }
    }

    let mut next = current.clone();
    next.update_time = ctx.now;

    let shipment = match command {
        OrderCommand::Accept => {
            next.status = OrderStatus::Accepted;
            None
        }
        OrderCommand::SetProductionStatus(target) => {
            if ctx.production_status == ProductionStatusMode::Strict
                && strict_predecessor(*target) != Some(current.status)
            {
                return Err(reject(
                    current,
                    operation,
                    format!("cannot move from {} to {} in strict mode", current.status, target),
                ));
            }
            next.status = *target;
            None
        }
        OrderCommand::Pickup { shipment_id } => {
            if let Some(existing) = &current.shipment_id {
                return Err(reject(
                    current,
                    operation,
                    format!("order already has shipment {}", existing),
                ));
            }
            next.status = OrderStatus::Shipped;
            next.shipment_id = Some(shipment_id.clone());
            Some(shipment::open(current, shipment_id, actor, ctx))
        }
        OrderCommand::Deliver => {
            next.status = OrderStatus::Delivered;
            None
        }
        OrderCommand::ConfirmReceipt => {
            next.status = OrderStatus::Received;
            None
        }
    };

    Ok(OrderOutcome {
        order: next,
        shipment,
    })
}

/// The only status a production target may be reached from in strict mode.
fn strict_predecessor(target: OrderStatus) -> Option<OrderStatus> {
    match target {
        OrderStatus::Producing => Some(OrderStatus::Accepted),
        OrderStatus::Produced => Some(OrderStatus::Producing),
        OrderStatus::Ready => Some(OrderStatus::Produced),
        _ => None,
    }
}

fn reject(current: &Order, operation: Operation, reason: String) -> ContractError {
    tracing::debug!(key = %current.id, operation = %operation, %reason, "transition rejected");
    ContractError::invalid_transition(&current.id, operation, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{DEFAULT_PICKUP_LOCATION, IN_TRANSIT_STATUS};
    use crate::types::{MspId, Timestamp};

    fn oem() -> Actor {
        Actor::new(MspId::new("Org1MSP"), [Role::Oem])
    }

    fn manufacturer() -> Actor {
        Actor::new(MspId::new("Org2MSP"), [Role::Manufacturer])
    }

    fn carrier() -> Actor {
        Actor::new(MspId::new("Org3MSP"), [Role::Carrier, Role::PlatformAuditor])
    }

    fn actor_for(role: Role) -> Actor {
        match role {
            Role::Oem => oem(),
            Role::Manufacturer => manufacturer(),
            Role::Carrier | Role::PlatformAuditor => carrier(),
        }
    }

    fn ctx() -> TransitionContext<'static> {
        TransitionContext::at(Timestamp(2_000))
    }

    fn order_in(status: OrderStatus) -> Order {
        let mut order = create(
            NewOrder {
                id: "O1".into(),
                manufacturer_id: "MFG1".into(),
                items: vec![OrderItem::new("part", 10, 5.0)],
            },
            &oem(),
            &TransitionContext::at(Timestamp(1_000)),
        )
        .unwrap();
        order.status = status;
        order
    }

    #[test]
    fn test_create_computes_total_and_owner() {
        let order = order_in(OrderStatus::Created);
        assert_eq!(order.total_price, 50.0);
        assert_eq!(order.oem_id, MspId::new("Org1MSP"));
        assert_eq!(order.create_time, Timestamp(1_000));
        assert_eq!(order.update_time, Timestamp(1_000));
        assert_eq!(order.shipment_id, None);
    }

    #[test]
    fn test_create_requires_oem() {
        let err = create(
            NewOrder {
                id: "O1".into(),
                manufacturer_id: "MFG1".into(),
                items: vec![OrderItem::new("part", 1, 1.0)],
            },
            &manufacturer(),
            &ctx(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn test_create_rejects_bad_items() {
        let err = create(
            NewOrder {
                id: "O1".into(),
                manufacturer_id: "MFG1".into(),
                items: vec![OrderItem::new("part", -1, 1.0)],
            },
            &oem(),
            &ctx(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }

    #[test]
    fn test_create_rejects_overflowing_total() {
        let err = create(
            NewOrder {
                id: "O1".into(),
                manufacturer_id: "MFG1".into(),
                items: vec![OrderItem::new("part", 10, 1e308)],
            },
            &oem(),
            &ctx(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);

        let err = create(
            NewOrder {
                id: "O1".into(),
                manufacturer_id: "MFG1".into(),
                items: vec![OrderItem::new("a", 1, f64::MAX), OrderItem::new("b", 1, f64::MAX)],
            },
            &oem(),
            &ctx(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }

    #[test]
    fn test_valid_transitions_table() {
        let cases = [
            (OrderStatus::Created, OrderCommand::Accept, OrderStatus::Accepted),
            (
                OrderStatus::Accepted,
                OrderCommand::SetProductionStatus(OrderStatus::Producing),
                OrderStatus::Producing,
            ),
            (
                OrderStatus::Producing,
                OrderCommand::SetProductionStatus(OrderStatus::Produced),
                OrderStatus::Produced,
            ),
            (
                OrderStatus::Produced,
                OrderCommand::SetProductionStatus(OrderStatus::Ready),
                OrderStatus::Ready,
            ),
            (
                OrderStatus::Ready,
                OrderCommand::Pickup {
                    shipment_id: "S1".into(),
                },
                OrderStatus::Shipped,
            ),
            (OrderStatus::Shipped, OrderCommand::Deliver, OrderStatus::Delivered),
            (OrderStatus::Delivered, OrderCommand::ConfirmReceipt, OrderStatus::Received),
        ];

        for (from, command, to) in cases {
            let current = order_in(from);
            let actor = actor_for(command.required_role());
            let outcome = apply(&current, &command, &actor, &ctx()).unwrap();
            assert_eq!(outcome.order.status, to, "{:?} from {}", command, from);
            assert_eq!(outcome.order.update_time, Timestamp(2_000));
            assert_eq!(outcome.order.create_time, current.create_time);
            assert_eq!(outcome.order.total_price, current.total_price);
        }
    }

    #[test]
    fn test_wrong_role_is_unauthorized() {
        let commands = [
            OrderCommand::Accept,
            OrderCommand::SetProductionStatus(OrderStatus::Producing),
            OrderCommand::Pickup {
                shipment_id: "S1".into(),
            },
            OrderCommand::Deliver,
            OrderCommand::ConfirmReceipt,
        ];

        for command in commands {
            let current = order_in(command.required_status().unwrap_or(OrderStatus::Ready));
            for role in Role::ALL {
                let actor = actor_for(role);
                if actor.has(command.required_role()) {
                    continue;
                }
                let err = apply(&current, &command, &actor, &ctx()).unwrap_err();
                assert_eq!(err.kind(), ErrorKind::Unauthorized, "{:?} as {}", command, role);
            }
        }
    }

    #[test]
    fn test_accept_twice_is_invalid() {
        let accepted = apply(&order_in(OrderStatus::Created), &OrderCommand::Accept, &manufacturer(), &ctx())
            .unwrap()
            .order;
        let err = apply(&accepted, &OrderCommand::Accept, &manufacturer(), &ctx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    #[test]
    fn test_confirm_receipt_requires_delivered() {
        for status in OrderStatus::ALL {
            if status == OrderStatus::Delivered {
                continue;
            }
            let err = apply(&order_in(status), &OrderCommand::ConfirmReceipt, &oem(), &ctx()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidTransition, "from {}", status);
        }
    }

    #[test]
    fn test_lenient_production_status_skips_checks() {
        let outcome = apply(
            &order_in(OrderStatus::Created),
            &OrderCommand::SetProductionStatus(OrderStatus::Ready),
            &manufacturer(),
            &ctx(),
        )
        .unwrap();
        assert_eq!(outcome.order.status, OrderStatus::Ready);
    }

    #[test]
    fn test_strict_production_status() {
        let strict = TransitionContext {
            production_status: ProductionStatusMode::Strict,
            ..ctx()
        };

        let err = apply(
            &order_in(OrderStatus::Created),
            &OrderCommand::SetProductionStatus(OrderStatus::Ready),
            &manufacturer(),
            &strict,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);

        let err = apply(
            &order_in(OrderStatus::Accepted),
            &OrderCommand::SetProductionStatus(OrderStatus::Shipped),
            &manufacturer(),
            &strict,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);

        let outcome = apply(
            &order_in(OrderStatus::Accepted),
            &OrderCommand::SetProductionStatus(OrderStatus::Producing),
            &manufacturer(),
            &strict,
        )
        .unwrap();
        assert_eq!(outcome.order.status, OrderStatus::Producing);
    }

    #[test]
    fn test_pickup_opens_shipment() {
        let outcome = apply(
            &order_in(OrderStatus::Ready),
            &OrderCommand::Pickup {
                shipment_id: "S1".into(),
            },
            &carrier(),
            &ctx(),
        )
        .unwrap();

        assert_eq!(outcome.order.shipment_id.as_deref(), Some("S1"));
        let shipment = outcome.shipment.unwrap();
        assert_eq!(shipment.id, "S1");
        assert_eq!(shipment.order_id, "O1");
        assert_eq!(shipment.carrier_id, MspId::new("Org3MSP"));
        assert_eq!(shipment.location, DEFAULT_PICKUP_LOCATION);
        assert_eq!(shipment.status, IN_TRANSIT_STATUS);
        assert_eq!(shipment.update_time, Timestamp(2_000));
    }

    #[test]
    fn test_pickup_sets_shipment_once() {
        let mut order = order_in(OrderStatus::Ready);
        order.shipment_id = Some("S1".into());

        let err = apply(
            &order,
            &OrderCommand::Pickup {
                shipment_id: "S2".into(),
            },
            &carrier(),
            &ctx(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }
}
