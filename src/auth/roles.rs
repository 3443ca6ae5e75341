//! Logical roles and their credential bindings.

use crate::error::ConfigError;
use crate::types::MspId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Default credential of the OEM (vehicle manufacturer).
pub const OEM_MSPID: &str = "Org1MSP";
/// Default credential of the parts manufacturer.
pub const MANUFACTURER_MSPID: &str = "Org2MSP";
/// Default credential shared by the carrier and the platform.
pub const PLATFORM_MSPID: &str = "Org3MSP";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Oem,
    Manufacturer,
    Carrier,
    PlatformAuditor,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Oem, Role::Manufacturer, Role::Carrier, Role::PlatformAuditor];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Oem => "OEM",
            Role::Manufacturer => "Manufacturer",
            Role::Carrier => "Carrier",
            Role::PlatformAuditor => "PlatformAuditor",
        };
        f.write_str(name)
    }
}

/// Mapping from logical role to the credentials accepted for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleMap {
    bindings: BTreeMap<Role, BTreeSet<MspId>>,
}

impl RoleMap {
    /// A map with no bindings.
    pub fn empty() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }

    /// Add a binding (builder form).
    pub fn bind(mut self, role: Role, msp_id: impl Into<String>) -> Self {
        self.grant(role, MspId::new(msp_id));
        self
    }

    pub fn grant(&mut self, role: Role, msp_id: MspId) {
        self.bindings.entry(role).or_default().insert(msp_id);
    }

    pub fn revoke(&mut self, role: Role, msp_id: &MspId) {
        if let Some(ids) = self.bindings.get_mut(&role) {
            ids.remove(msp_id);
        }
    }

    pub fn credentials(&self, role: Role) -> impl Iterator<Item = &MspId> {
        self.bindings.get(&role).into_iter().flatten()
    }

    pub fn allows(&self, role: Role, msp_id: &MspId) -> bool {
        self.bindings
            .get(&role)
            .map_or(false, |ids| ids.contains(msp_id))
    }

    /// Every role a credential holds.
    pub fn roles_of(&self, msp_id: &MspId) -> BTreeSet<Role> {
        self.bindings
            .iter()
            .filter(|(_, ids)| ids.contains(msp_id))
            .map(|(role, _)| *role)
            .collect()
    }

    /// Every role must be bound to at least one credential.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for role in Role::ALL {
            if self.credentials(role).next().is_none() {
                return Err(ConfigError::Invalid(format!("role {} has no credential", role)));
            }
        }
        Ok(())
    }
}

impl Default for RoleMap {
    fn default() -> Self {
        RoleMap::empty()
            .bind(Role::Oem, OEM_MSPID)
            .bind(Role::Manufacturer, MANUFACTURER_MSPID)
            .bind(Role::Carrier, PLATFORM_MSPID)
            .bind(Role::PlatformAuditor, PLATFORM_MSPID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shares_platform_credential() {
        let roles = RoleMap::default();
        let org3 = MspId::new(PLATFORM_MSPID);

        let held = roles.roles_of(&org3);
        assert!(held.contains(&Role::Carrier));
        assert!(held.contains(&Role::PlatformAuditor));
        assert_eq!(held.len(), 2);
        assert!(!roles.allows(Role::Oem, &org3));
        roles.validate().unwrap();
    }

    #[test]
    fn test_role_with_several_credentials() {
        let roles = RoleMap::default().bind(Role::Carrier, "Org4MSP");
        assert!(roles.allows(Role::Carrier, &MspId::new("Org4MSP")));
        assert!(roles.allows(Role::Carrier, &MspId::new(PLATFORM_MSPID)));
        assert_eq!(roles.credentials(Role::Carrier).count(), 2);
    }

    #[test]
    fn test_validate_rejects_unbound_role() {
        let mut roles = RoleMap::default();
        roles.revoke(Role::Manufacturer, &MspId::new(MANUFACTURER_MSPID));
        assert!(roles.validate().is_err());
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(RoleMap::default()).unwrap();
        assert_eq!(json["oem"][0], "Org1MSP");
        assert_eq!(json["platform_auditor"][0], "Org3MSP");

        let parsed: RoleMap =
            serde_json::from_str(r#"{"carrier":["Org5MSP"],"oem":["Org1MSP"]}"#).unwrap();
        assert!(parsed.allows(Role::Carrier, &MspId::new("Org5MSP")));
        assert!(!parsed.allows(Role::Manufacturer, &MspId::new(MANUFACTURER_MSPID)));
    }
}
