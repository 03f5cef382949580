use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labstock_core::{AggregateId, ItemCode, RoomCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockFactKind {
    /// Physical count; replaces the baseline rather than adding to it.
    OpnameCount,
    TransferIn,
    TransferOut,
    Receipt,
    Consumption,
}

/// One normalized stock movement for a (room, item).
///
/// `quantity` is always the magnitude as recorded; the sign is implied by
/// `kind`. `position` is the global position of the event it came from and
/// orders facts in commit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockFact {
    pub position: u64,
    pub room: RoomCode,
    pub item: ItemCode,
    pub kind: StockFactKind,
    pub quantity: i64,
    pub record_id: AggregateId,
    /// The other room of a transfer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterpart: Option<RoomCode>,
    pub occurred_at: DateTime<Utc>,
}

impl StockFact {
    pub fn touches(&self, room: &RoomCode, item: &ItemCode) -> bool {
        &self.room == room && &self.item == item
    }
}
