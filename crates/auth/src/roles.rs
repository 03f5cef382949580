use serde::{Deserialize, Serialize};

use labstock_core::RoomCode;

/// Closed set of roles known to the ledger.
///
/// Role strings are parsed exactly once, when claims are decoded; after that
/// the rest of the system only ever matches on this enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Role {
    /// Operates one specific room: raises transfers out of it, approves
    /// transfers into it, requests procurement for it, counts its stock.
    RoomOperator { room: RoomCode },
    /// Central logistics: dispatches procurement requests.
    LogisticsOperator,
    /// Full access, including acting on behalf of any room.
    SystemAdmin,
}

impl Role {
    pub fn room_operator(room: RoomCode) -> Self {
        Self::RoomOperator { room }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Role::RoomOperator { .. } => "room_operator",
            Role::LogisticsOperator => "logistics_operator",
            Role::SystemAdmin => "system_admin",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Role::RoomOperator { room } => write!(f, "room_operator({room})"),
            other => f.write_str(other.name()),
        }
    }
}
