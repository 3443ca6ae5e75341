//! Client gateway over a shared ledger.
//!
//! Writes are submitted: each attempt begins a fresh transaction, runs the
//! contract, and commits, with write conflicts resubmitted by the
//! [`RetryingSubmitter`]. Reads are evaluated: the contract runs against a
//! transaction that is never committed, and nothing is retried.

use crate::auth::{Role, MANUFACTURER_MSPID, OEM_MSPID, PLATFORM_MSPID};
use crate::config::ServiceConfig;
use crate::contract::SupplyChainContract;
use crate::error::{ConfigError, ContractError, Result};
use crate::history::{EnhancedHistory, EnhancedHistoryRecord, HistoryDiffEngine};
use crate::invocation::Invocation;
use crate::ledger::{Ledger, TxStub};
use crate::model::{Order, OrderItem, OrderStatus, Shipment};
use crate::query::{LedgerEntry, PageRequest, Pages, QueryResponse};
use crate::submit::RetryingSubmitter;
use crate::types::{Bookmark, Identity};
use serde_json::Value;
use std::sync::Arc;

/// The identity each organization submits under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Wallet {
    pub oem: Identity,
    pub manufacturer: Identity,
    pub carrier: Identity,
    pub platform: Identity,
}

impl Wallet {
    pub fn identity(&self, role: Role) -> &Identity {
        match role {
            Role::Oem => &self.oem,
            Role::Manufacturer => &self.manufacturer,
            Role::Carrier => &self.carrier,
            Role::PlatformAuditor => &self.platform,
        }
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self {
            oem: Identity::new(OEM_MSPID, "oem-admin"),
            manufacturer: Identity::new(MANUFACTURER_MSPID, "manufacturer-admin"),
            carrier: Identity::new(PLATFORM_MSPID, "carrier-admin"),
            platform: Identity::new(PLATFORM_MSPID, "platform-admin"),
        }
    }
}

pub struct SupplyChainService<L: Ledger> {
    ledger: Arc<L>,
    contract: SupplyChainContract,
    submitter: RetryingSubmitter,
    wallet: Wallet,
    history: HistoryDiffEngine,
}

impl<L: Ledger> SupplyChainService<L> {
    pub fn new(ledger: Arc<L>, config: ServiceConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            ledger,
            contract: SupplyChainContract::new(config.roles, config.contract),
            submitter: RetryingSubmitter::new(config.retry),
            wallet: Wallet::default(),
            history: HistoryDiffEngine::new(),
        })
    }

    pub fn with_submitter(mut self, submitter: RetryingSubmitter) -> Self {
        self.submitter = submitter;
        self
    }

    pub fn with_wallet(mut self, wallet: Wallet) -> Self {
        self.wallet = wallet;
        self
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn contract(&self) -> &SupplyChainContract {
        &self.contract
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// Submit a write call as `caller`.
    pub fn submit(&self, caller: &Identity, call: &Invocation) -> Result<Value> {
        if !call.is_write() {
            return Err(ContractError::InvalidArgument(format!(
                "{} is a query; evaluate it instead",
                call.operation()
            )));
        }
        self.write(caller, call.operation().name(), |contract, stub| contract.invoke(stub, call))
    }

    /// Evaluate a read call as `caller`.
    pub fn evaluate(&self, caller: &Identity, call: &Invocation) -> Result<Value> {
        if call.is_write() {
            return Err(ContractError::InvalidArgument(format!(
                "{} writes to the ledger; submit it instead",
                call.operation()
            )));
        }
        self.read(caller, |contract, stub| contract.invoke(stub, call))
    }

    fn write<T, F>(&self, caller: &Identity, operation: &str, mut f: F) -> Result<T>
    where
        F: FnMut(&SupplyChainContract, &mut TxStub<'_>) -> Result<T>,
    {
        self.submitter.submit(operation, |attempt| -> Result<T> {
            let mut stub = TxStub::begin(self.ledger.as_ref(), caller.clone());
            let out = f(&self.contract, &mut stub)?;
            let receipt = stub.commit()?;
            tracing::debug!(
                operation,
                attempt,
                tx_id = %receipt.tx_id,
                keys = receipt.keys_written.len(),
                "transaction committed"
            );
            Ok(out)
        })
    }

    fn read<T, F>(&self, caller: &Identity, f: F) -> Result<T>
    where
        F: FnOnce(&SupplyChainContract, &mut TxStub<'_>) -> Result<T>,
    {
        let mut stub = TxStub::begin(self.ledger.as_ref(), caller.clone());
        f(&self.contract, &mut stub)
    }

    // ---- organization calls ----

    pub fn create_order(&self, id: &str, manufacturer_id: &str, items: Vec<OrderItem>) -> Result<()> {
        self.write(&self.wallet.oem, "CreateOrder", |contract, stub| {
            contract.create_order(stub, id, manufacturer_id, items.clone())
        })
    }

    pub fn accept_order(&self, id: &str) -> Result<()> {
        self.write(&self.wallet.manufacturer, "AcceptOrder", |contract, stub| {
            contract.accept_order(stub, id)
        })
    }

    pub fn update_production_status(&self, id: &str, status: OrderStatus) -> Result<()> {
        self.write(&self.wallet.manufacturer, "UpdateProductionStatus", |contract, stub| {
            contract.update_production_status(stub, id, status)
        })
    }

    pub fn pickup_goods(&self, order_id: &str, shipment_id: &str) -> Result<()> {
        self.write(&self.wallet.carrier, "PickupGoods", |contract, stub| {
            contract.pickup_goods(stub, order_id, shipment_id)
        })
    }

    pub fn update_location(&self, shipment_id: &str, location: &str) -> Result<()> {
        self.write(&self.wallet.carrier, "UpdateLocation", |contract, stub| {
            contract.update_location(stub, shipment_id, location)
        })
    }

    pub fn deliver_goods(&self, id: &str) -> Result<()> {
        self.write(&self.wallet.carrier, "DeliverGoods", |contract, stub| {
            contract.deliver_goods(stub, id)
        })
    }

    pub fn confirm_receipt(&self, id: &str) -> Result<()> {
        self.write(&self.wallet.oem, "ConfirmReceipt", |contract, stub| {
            contract.confirm_receipt(stub, id)
        })
    }

    pub fn query_order(&self, id: &str) -> Result<Order> {
        self.read(&self.wallet.oem, |contract, stub| contract.query_order(stub, id))
    }

    pub fn query_shipment(&self, id: &str) -> Result<Shipment> {
        self.read(&self.wallet.carrier, |contract, stub| contract.query_shipment(stub, id))
    }

    pub fn query_order_list(&self, page_size: u32, bookmark: &Bookmark) -> Result<QueryResponse<Order>> {
        let request = PageRequest::after(page_size, bookmark.clone());
        self.read(&self.wallet.oem, |contract, stub| contract.query_order_list(stub, &request))
    }

    pub fn query_all_ledger_data(&self, page_size: u32, bookmark: &Bookmark) -> Result<QueryResponse<LedgerEntry>> {
        let request = PageRequest::after(page_size, bookmark.clone());
        self.read(&self.wallet.platform, |contract, stub| {
            contract.query_all_ledger_data(stub, &request)
        })
    }

    /// Every order, walking pages of `page_size` from the first key.
    pub fn iter_orders(&self, page_size: u32) -> impl Iterator<Item = Result<Order>> + '_ {
        Pages::new(page_size, move |request: &PageRequest| {
            self.read(&self.wallet.oem, |contract, stub| contract.query_order_list(stub, request))
        })
        .flat_map(|page| -> Vec<Result<Order>> {
            match page {
                Ok(page) => page.records.into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            }
        })
    }

    /// Order history, newest first, each entry diffed against the one before.
    pub fn order_history(&self, id: &str) -> Result<Vec<EnhancedHistoryRecord>> {
        self.order_history_iter(id)?.collect()
    }

    pub fn shipment_history(&self, id: &str) -> Result<Vec<EnhancedHistoryRecord>> {
        self.shipment_history_iter(id)?.collect()
    }

    /// Lazy form of [`order_history`](Self::order_history).
    pub fn order_history_iter(&self, id: &str) -> Result<EnhancedHistory<'_>> {
        self.history_stream(&self.wallet.oem, id)
    }

    pub fn shipment_history_iter(&self, id: &str) -> Result<EnhancedHistory<'_>> {
        self.history_stream(&self.wallet.carrier, id)
    }

    fn history_stream(&self, caller: &Identity, key: &str) -> Result<EnhancedHistory<'_>> {
        if key.trim().is_empty() {
            return Err(ContractError::InvalidArgument("history key must not be empty".into()));
        }
        let stub = TxStub::begin(self.ledger.as_ref(), caller.clone());
        let records = stub.get_history_for_key(key)?;
        Ok(self.history.enhance(records, stub.history_order()))
    }
}
