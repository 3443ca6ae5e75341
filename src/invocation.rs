//! Typed contract calls decoded from a function name and string arguments.

use crate::error::{ContractError, Result};
use crate::model::{parse_items, OrderItem, OrderStatus};
use crate::query::PageRequest;
use crate::types::{Bookmark, Operation};

/// One contract call with its arguments validated.
#[derive(Clone, Debug, PartialEq)]
pub enum Invocation {
    CreateOrder {
        id: String,
        manufacturer_id: String,
        items: Vec<OrderItem>,
    },
    AcceptOrder {
        id: String,
    },
    UpdateProductionStatus {
        id: String,
        status: OrderStatus,
    },
    PickupGoods {
        order_id: String,
        shipment_id: String,
    },
    UpdateLocation {
        shipment_id: String,
        location: String,
    },
    DeliverGoods {
        id: String,
    },
    ConfirmReceipt {
        id: String,
    },
    QueryOrder {
        id: String,
    },
    QueryShipment {
        id: String,
    },
    QueryOrderList(PageRequest),
    QueryAllLedgerData(PageRequest),
    QueryOrderHistory {
        id: String,
    },
    QueryShipmentHistory {
        id: String,
    },
}

impl Invocation {
    pub fn operation(&self) -> Operation {
        match self {
            Invocation::CreateOrder { .. } => Operation::CreateOrder,
            Invocation::AcceptOrder { .. } => Operation::AcceptOrder,
            Invocation::UpdateProductionStatus { .. } => Operation::UpdateProductionStatus,
            Invocation::PickupGoods { .. } => Operation::PickupGoods,
            Invocation::UpdateLocation { .. } => Operation::UpdateLocation,
            Invocation::DeliverGoods { .. } => Operation::DeliverGoods,
            Invocation::ConfirmReceipt { .. } => Operation::ConfirmReceipt,
            Invocation::QueryOrder { .. } => Operation::QueryOrder,
            Invocation::QueryShipment { .. } => Operation::QueryShipment,
            Invocation::QueryOrderList(_) => Operation::QueryOrderList,
            Invocation::QueryAllLedgerData(_) => Operation::QueryAllLedgerData,
            Invocation::QueryOrderHistory { .. } => Operation::QueryOrderHistory,
            Invocation::QueryShipmentHistory { .. } => Operation::QueryShipmentHistory,
        }
    }

    pub fn is_write(&self) -> bool {
        self.operation().is_write()
    }

    /// Decode `function(args...)`.
    ///
    /// `CreateOrder` takes its items as a JSON array; list queries take a
    /// decimal page size and an optional bookmark. An unknown function or a
    /// wrong argument count is [`ContractError::InvalidArgument`]; malformed
    /// items or an unknown status label are [`ContractError::Serialization`].
    pub fn from_args<S: AsRef<str>>(function: &str, args: &[S]) -> Result<Self> {
        let operation = Operation::from_name(function)
            .ok_or_else(|| ContractError::InvalidArgument(format!("unknown function {}", function)))?;
        let args: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
        let arg = |i: usize| args[i].to_string();

        let call = match operation {
            Operation::CreateOrder => {
                arity(operation, &args, 3)?;
                Invocation::CreateOrder {
                    id: arg(0),
                    manufacturer_id: arg(1),
                    items: parse_items(args[2])?,
                }
            }
            Operation::AcceptOrder => {
                arity(operation, &args, 1)?;
                Invocation::AcceptOrder { id: arg(0) }
            }
            Operation::UpdateProductionStatus => {
                arity(operation, &args, 2)?;
                Invocation::UpdateProductionStatus {
                    id: arg(0),
                    status: args[1].parse()?,
                }
            }
            Operation::PickupGoods => {
                arity(operation, &args, 2)?;
                Invocation::PickupGoods {
                    order_id: arg(0),
                    shipment_id: arg(1),
                }
            }
            Operation::UpdateLocation => {
                arity(operation, &args, 2)?;
                Invocation::UpdateLocation {
                    shipment_id: arg(0),
                    location: arg(1),
                }
            }
            Operation::DeliverGoods => {
                arity(operation, &args, 1)?;
                Invocation::DeliverGoods { id: arg(0) }
            }
            Operation::ConfirmReceipt => {
                arity(operation, &args, 1)?;
                Invocation::ConfirmReceipt { id: arg(0) }
            }
            Operation::QueryOrder => {
                arity(operation, &args, 1)?;
                Invocation::QueryOrder { id: arg(0) }
            }
            Operation::QueryShipment => {
                arity(operation, &args, 1)?;
                Invocation::QueryShipment { id: arg(0) }
            }
            Operation::QueryOrderList => Invocation::QueryOrderList(page_request(operation, &args)?),
            Operation::QueryAllLedgerData => Invocation::QueryAllLedgerData(page_request(operation, &args)?),
            Operation::QueryOrderHistory => {
                arity(operation, &args, 1)?;
                Invocation::QueryOrderHistory { id: arg(0) }
            }
            Operation::QueryShipmentHistory => {
                arity(operation, &args, 1)?;
                Invocation::QueryShipmentHistory { id: arg(0) }
            }
        };
        Ok(call)
    }
}

fn arity(operation: Operation, args: &[&str], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(ContractError::InvalidArgument(format!(
            "{} takes {} argument(s), got {}",
            operation,
            expected,
            args.len()
        )));
    }
    Ok(())
}

fn page_request(operation: Operation, args: &[&str]) -> Result<PageRequest> {
    if args.is_empty() || args.len() > 2 {
        return Err(ContractError::InvalidArgument(format!(
            "{} takes a page size and an optional bookmark",
            operation
        )));
    }
    let page_size = args[0]
        .trim()
        .parse::<u32>()
        .map_err(|_| ContractError::InvalidArgument(format!("invalid page size {:?}", args[0])))?;
    let bookmark = args.get(1).map(|b| Bookmark::from(*b)).unwrap_or_default();
    Ok(PageRequest::after(page_size, bookmark))
}
