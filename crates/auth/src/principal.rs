use std::collections::BTreeSet;

use labstock_core::{RoomCode, UserId};

use crate::{Capability, JwtClaims, Role};

/// A fully resolved principal for authorization decisions.
///
/// Built once per request from validated claims; capabilities are computed
/// up front so operations never look at role names again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    user_id: UserId,
    roles: Vec<Role>,
    capabilities: BTreeSet<Capability>,
}

impl Principal {
    pub fn new(user_id: UserId, roles: Vec<Role>) -> Self {
        let capabilities = roles.iter().flat_map(Capability::granted_by).collect();
        Self {
            user_id,
            roles,
            capabilities,
        }
    }

    pub fn from_claims(claims: &JwtClaims) -> Self {
        Self::new(claims.sub, claims.roles.clone())
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.iter()
    }

    pub fn is_admin(&self) -> bool {
        self.capabilities.contains(&Capability::Administer)
    }

    pub fn has(&self, capability: &Capability) -> bool {
        self.is_admin() || self.capabilities.contains(capability)
    }

    /// Rooms this principal operates directly (admins are not listed here).
    pub fn operated_rooms(&self) -> Vec<&RoomCode> {
        self.capabilities
            .iter()
            .filter_map(|c| match c {
                Capability::OperateRoom { room } => Some(room),
                _ => None,
            })
            .collect()
    }
}
