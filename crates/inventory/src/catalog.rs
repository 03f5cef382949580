use serde::{Deserialize, Serialize};

use labstock_core::{ItemCode, RoomCode};

/// Item of equipment or material as served by master data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub code: ItemCode,
    pub name: String,
    pub unit: String,
    pub category: String,
    #[serde(default = "active_by_default")]
    pub active: bool,
}

/// Room (laboratory or storage location) as served by master data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub code: RoomCode,
    pub department: String,
    #[serde(default = "active_by_default")]
    pub active: bool,
}

fn active_by_default() -> bool {
    true
}
