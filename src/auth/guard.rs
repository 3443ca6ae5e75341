//! Role checks against the transaction creator.

use super::{Role, RoleMap};
use crate::error::{ContractError, Result};
use crate::types::{Identity, MspId, Operation};
use std::collections::BTreeSet;

/// A caller with the logical roles its credential holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub msp_id: MspId,
    pub roles: BTreeSet<Role>,
}

impl Actor {
    pub fn new(msp_id: MspId, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            msp_id,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn has(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Fail with [`ContractError::Unauthorized`] unless this actor holds `role`.
    pub fn require(&self, role: Role, operation: Operation) -> Result<()> {
        if self.has(role) {
            return Ok(());
        }
        tracing::warn!(
            operation = %operation,
            required = %role,
            caller = %self.msp_id,
            "authorization denied"
        );
        Err(ContractError::Unauthorized {
            operation,
            required: role,
            caller: self.msp_id.clone(),
        })
    }
}

/// Resolves callers to actors and enforces required roles.
#[derive(Clone, Debug, Default)]
pub struct AuthorizationGuard {
    roles: RoleMap,
}

impl AuthorizationGuard {
    pub fn new(roles: RoleMap) -> Self {
        Self { roles }
    }

    pub fn roles(&self) -> &RoleMap {
        &self.roles
    }

    pub fn resolve(&self, caller: &Identity) -> Actor {
        Actor {
            msp_id: caller.msp_id.clone(),
            roles: self.roles.roles_of(&caller.msp_id),
        }
    }

    /// Check that `caller` holds `required` for `operation`.
    pub fn require_role(&self, caller: &Identity, required: Role, operation: Operation) -> Result<Actor> {
        let actor = self.resolve(caller);
        actor.require(required, operation)?;
        Ok(actor)
    }
}
