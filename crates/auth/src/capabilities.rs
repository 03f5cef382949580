use serde::{Deserialize, Serialize};

use labstock_core::RoomCode;

use crate::Role;

/// What a principal may do. Closed; derived from roles by [`Capability::granted_by`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Capability {
    /// Act as the operator of one room.
    OperateRoom { room: RoomCode },
    /// Record a logistics dispatch against a procurement request.
    DispatchProcurement,
    /// Read stock and ledger records.
    ReadLedger,
    /// Satisfies every other capability.
    Administer,
}

impl Capability {
    pub fn operate_room(room: &RoomCode) -> Self {
        Self::OperateRoom { room: room.clone() }
    }

    /// Role → capability table.
    pub fn granted_by(role: &Role) -> Vec<Capability> {
        match role {
            Role::RoomOperator { room } => vec![
                Capability::OperateRoom { room: room.clone() },
                Capability::ReadLedger,
            ],
            Role::LogisticsOperator => vec![Capability::DispatchProcurement, Capability::ReadLedger],
            Role::SystemAdmin => vec![Capability::Administer],
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Capability::OperateRoom { room } => write!(f, "operate room {room}"),
            Capability::DispatchProcurement => f.write_str("dispatch procurement"),
            Capability::ReadLedger => f.write_str("read ledger"),
            Capability::Administer => f.write_str("administer"),
        }
    }
}
