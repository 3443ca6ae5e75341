//! The supply-chain contract.
//!
//! Every operation runs inside one [`TxStub`]: it checks the caller's role,
//! reads the records it needs, computes the next state with the pure
//! machines in [`crate::state`], and buffers the writes. Nothing reaches
//! the ledger unless the caller commits the stub, so a rejected operation
//! leaves the ledger untouched.

use crate::auth::{AuthorizationGuard, Role, RoleMap};
use crate::config::ContractConfig;
use crate::error::{ContractError, Result};
use crate::invocation::Invocation;
use crate::ledger::{HistoryOrder, TxStub};
use crate::model::{LedgerRecord, Order, OrderItem, OrderStatus, Shipment};
use crate::query::{LedgerEntry, PageRequest, QueryPager, QueryResponse, RawHistoryRecord};
use crate::state::order::{self, NewOrder, OrderCommand, OrderOutcome};
use crate::state::shipment::{self, ShipmentCommand};
use crate::state::TransitionContext;
use crate::types::Operation;
use serde_json::Value;

#[derive(Clone, Debug, Default)]
pub struct SupplyChainContract {
    guard: AuthorizationGuard,
    config: ContractConfig,
}

impl SupplyChainContract {
    pub fn new(roles: RoleMap, config: ContractConfig) -> Self {
        Self {
            guard: AuthorizationGuard::new(roles),
            config,
        }
    }

    pub fn guard(&self) -> &AuthorizationGuard {
        &self.guard
    }

    pub fn config(&self) -> &ContractConfig {
        &self.config
    }

    fn pager(&self) -> QueryPager {
        QueryPager::new(self.config.max_page_size)
    }

    fn context(&self, stub: &TxStub<'_>) -> TransitionContext<'_> {
        TransitionContext {
            now: stub.tx_timestamp(),
            production_status: self.config.production_status,
            pickup_location: &self.config.pickup_location,
            in_transit_status: &self.config.in_transit_status,
        }
    }

    /// Run a decoded call. Writes return `null`; reads return their result
    /// as JSON.
    pub fn invoke(&self, stub: &mut TxStub<'_>, call: &Invocation) -> Result<Value> {
        match call {
            Invocation::CreateOrder {
                id,
                manufacturer_id,
                items,
            } => self.create_order(stub, id, manufacturer_id, items.clone()).map(|_| Value::Null),
            Invocation::AcceptOrder { id } => self.accept_order(stub, id).map(|_| Value::Null),
            Invocation::UpdateProductionStatus { id, status } => {
                self.update_production_status(stub, id, *status).map(|_| Value::Null)
            }
            Invocation::PickupGoods { order_id, shipment_id } => {
                self.pickup_goods(stub, order_id, shipment_id).map(|_| Value::Null)
            }
            Invocation::UpdateLocation { shipment_id, location } => {
                self.update_location(stub, shipment_id, location).map(|_| Value::Null)
            }
            Invocation::DeliverGoods { id } => self.deliver_goods(stub, id).map(|_| Value::Null),
            Invocation::ConfirmReceipt { id } => self.confirm_receipt(stub, id).map(|_| Value::Null),
            Invocation::QueryOrder { id } => to_json(&self.query_order(stub, id)?),
            Invocation::QueryShipment { id } => to_json(&self.query_shipment(stub, id)?),
            Invocation::QueryOrderList(request) => to_json(&self.query_order_list(stub, request)?),
            Invocation::QueryAllLedgerData(request) => to_json(&self.query_all_ledger_data(stub, request)?),
            Invocation::QueryOrderHistory { id } => to_json(&self.query_order_history(stub, id)?),
            Invocation::QueryShipmentHistory { id } => to_json(&self.query_shipment_history(stub, id)?),
        }
    }

    // ---- writes ----

    /// Publish a new order. The caller becomes its OEM.
    pub fn create_order(
        &self,
        stub: &mut TxStub<'_>,
        id: &str,
        manufacturer_id: &str,
        items: Vec<OrderItem>,
    ) -> Result<()> {
        require_key("order id", id)?;
        let actor = self
            .guard
            .require_role(stub.creator(), Role::Oem, Operation::CreateOrder)?;

        let order = order::create(
            NewOrder {
                id: id.to_string(),
                manufacturer_id: manufacturer_id.to_string(),
                items,
            },
            &actor,
            &self.context(stub),
        )?;

        if stub.get_state(id)?.is_some() {
            return Err(ContractError::invalid_transition(
                id,
                Operation::CreateOrder,
                "key already exists",
            ));
        }

        put(stub, &order)?;
        tracing::info!(key = id, tx_id = %stub.tx_id(), total_price = order.total_price, "order created");
        Ok(())
    }

    pub fn accept_order(&self, stub: &mut TxStub<'_>, id: &str) -> Result<()> {
        self.apply_order(stub, id, OrderCommand::Accept).map(drop)
    }

    pub fn update_production_status(&self, stub: &mut TxStub<'_>, id: &str, status: OrderStatus) -> Result<()> {
        self.apply_order(stub, id, OrderCommand::SetProductionStatus(status))
            .map(drop)
    }

    /// Carrier picks up an order, opening shipment `shipment_id`.
    pub fn pickup_goods(&self, stub: &mut TxStub<'_>, order_id: &str, shipment_id: &str) -> Result<()> {
        require_key("shipment id", shipment_id)?;
        self.apply_order(
            stub,
            order_id,
            OrderCommand::Pickup {
                shipment_id: shipment_id.to_string(),
            },
        )
        .map(drop)
    }

    pub fn update_location(&self, stub: &mut TxStub<'_>, shipment_id: &str, location: &str) -> Result<()> {
        require_key("shipment id", shipment_id)?;
        let command = ShipmentCommand::UpdateLocation {
            location: location.to_string(),
        };
        let actor = self
            .guard
            .require_role(stub.creator(), command.required_role(), command.operation())?;

        let current: Shipment = load(stub, shipment_id)?;
        let next = shipment::apply(&current, &command, &actor, &self.context(stub))?;
        put(stub, &next)?;

        tracing::info!(key = shipment_id, tx_id = %stub.tx_id(), location, "shipment location updated");
        Ok(())
    }

    pub fn deliver_goods(&self, stub: &mut TxStub<'_>, id: &str) -> Result<()> {
        self.apply_order(stub, id, OrderCommand::Deliver).map(drop)
    }

    pub fn confirm_receipt(&self, stub: &mut TxStub<'_>, id: &str) -> Result<()> {
        self.apply_order(stub, id, OrderCommand::ConfirmReceipt).map(drop)
    }

    fn apply_order(&self, stub: &mut TxStub<'_>, id: &str, command: OrderCommand) -> Result<OrderOutcome> {
        require_key("order id", id)?;
        let operation = command.operation();
        let actor = self
            .guard
            .require_role(stub.creator(), command.required_role(), operation)?;

        let current: Order = load(stub, id)?;
        let outcome = order::apply(&current, &command, &actor, &self.context(stub))?;

        if let Some(shipment) = &outcome.shipment {
            if stub.get_state(&shipment.id)?.is_some() {
                return Err(ContractError::invalid_transition(
                    id,
                    operation,
                    format!("shipment key {} already exists", shipment.id),
                ));
            }
            put(stub, shipment)?;
        }
        put(stub, &outcome.order)?;

        tracing::info!(
            key = id,
            tx_id = %stub.tx_id(),
            operation = %operation,
            from = %current.status,
            to = %outcome.order.status,
            "order updated"
        );
        Ok(outcome)
    }

    // ---- reads ----

    pub fn query_order(&self, stub: &mut TxStub<'_>, id: &str) -> Result<Order> {
        require_key("order id", id)?;
        load(stub, id)
    }

    pub fn query_shipment(&self, stub: &mut TxStub<'_>, id: &str) -> Result<Shipment> {
        require_key("shipment id", id)?;
        load(stub, id)
    }

    /// One page of orders in key order. Shipments and undecodable values in
    /// the scanned range are skipped but still counted as fetched.
    pub fn query_order_list(&self, stub: &TxStub<'_>, request: &PageRequest) -> Result<QueryResponse<Order>> {
        self.pager()
            .page(stub, request, |entry| Ok(Order::try_from_bytes(&entry.value)))
    }

    /// Platform audit: one page of keys with their current value and full
    /// history, newest first. Keys whose value or history cannot be read are
    /// skipped.
    pub fn query_all_ledger_data(
        &self,
        stub: &TxStub<'_>,
        request: &PageRequest,
    ) -> Result<QueryResponse<LedgerEntry>> {
        self.guard
            .require_role(stub.creator(), Role::PlatformAuditor, Operation::QueryAllLedgerData)?;

        let order = stub.history_order();
        self.pager().page(stub, request, |entry| {
            let current: Value = match serde_json::from_slice(&entry.value) {
                Ok(value) => value,
                Err(e) => {
                    tracing::debug!(key = %entry.key, error = %e, "skipping undecodable value");
                    return Ok(None);
                }
            };
            let mut history = match stub.get_history_for_key(&entry.key) {
                Ok(records) => records
                    .map_while(|r| r.ok())
                    .map(RawHistoryRecord::from)
                    .collect::<Vec<_>>(),
                Err(e) => {
                    tracing::debug!(key = %entry.key, error = %e, "skipping key without history");
                    return Ok(None);
                }
            };
            if order != HistoryOrder::NewestFirst {
                history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            }
            Ok(Some(LedgerEntry {
                key: entry.key,
                current,
                history,
            }))
        })
    }

    /// Raw version log of an order key, in the ledger's order. An unknown key
    /// has an empty history.
    pub fn query_order_history(&self, stub: &TxStub<'_>, id: &str) -> Result<Vec<RawHistoryRecord>> {
        require_key("order id", id)?;
        raw_history(stub, id)
    }

    pub fn query_shipment_history(&self, stub: &TxStub<'_>, id: &str) -> Result<Vec<RawHistoryRecord>> {
        require_key("shipment id", id)?;
        raw_history(stub, id)
    }
}

fn raw_history(stub: &TxStub<'_>, key: &str) -> Result<Vec<RawHistoryRecord>> {
    let mut history = Vec::new();
    for record in stub.get_history_for_key(key)? {
        history.push(RawHistoryRecord::from(record?));
    }
    Ok(history)
}

fn require_key(what: &str, key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(ContractError::InvalidArgument(format!("{} must not be empty", what)));
    }
    Ok(())
}

fn load<R: LedgerRecord>(stub: &mut TxStub<'_>, key: &str) -> Result<R> {
    let bytes = stub
        .get_state(key)?
        .ok_or_else(|| ContractError::not_found(R::OBJECT_TYPE, key))?;
    R::from_bytes(key, &bytes)
}

fn put<R: LedgerRecord>(stub: &mut TxStub<'_>, record: &R) -> Result<()> {
    let bytes = record.to_bytes()?;
    stub.put_state(record.key(), bytes);
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}
