//! Organization-based authorization.
//!
//! Callers are identified by the MSP id the ledger attached to their
//! transaction. Logical roles map onto one or more credentials, and a
//! credential may hold several roles (the carrier and the platform auditor
//! share one organization in the default deployment).

mod guard;
mod roles;

pub use guard::{Actor, AuthorizationGuard};
pub use roles::{Role, RoleMap, MANUFACTURER_MSPID, OEM_MSPID, PLATFORM_MSPID};
