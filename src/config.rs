//! Service and contract configuration.

use crate::auth::RoleMap;
use crate::error::ConfigError;
use crate::model::{DEFAULT_PICKUP_LOCATION, IN_TRANSIT_STATUS};
use crate::query::DEFAULT_MAX_PAGE_SIZE;
use crate::state::ProductionStatusMode;
use crate::submit::RetryConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Rules the contract applies to every transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    /// How `UpdateProductionStatus` checks the requested status.
    pub production_status: ProductionStatusMode,

    /// Shipment location recorded at pickup.
    pub pickup_location: String,

    /// Shipment status text recorded at pickup.
    pub in_transit_status: String,

    /// Upper bound for range query page sizes.
    pub max_page_size: u32,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            production_status: ProductionStatusMode::Lenient,
            pickup_location: DEFAULT_PICKUP_LOCATION.to_string(),
            in_transit_status: IN_TRANSIT_STATUS.to_string(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl ContractConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_page_size == 0 {
            return Err(ConfigError::Invalid("contract.max_page_size must be at least 1".into()));
        }
        if self.pickup_location.trim().is_empty() {
            return Err(ConfigError::Invalid("contract.pickup_location must not be empty".into()));
        }
        Ok(())
    }
}

/// Full configuration of a [`SupplyChainService`](crate::gateway::SupplyChainService).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Logical role to accepted credentials.
    pub roles: RoleMap,

    /// Write resubmission policy.
    pub retry: RetryConfig,

    pub contract: ContractConfig,
}

impl ServiceConfig {
    /// Load and validate a JSON configuration file. Missing fields take
    /// their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded service config");
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.roles.validate()?;
        self.retry.validate()?;
        self.contract.validate()
    }
}
