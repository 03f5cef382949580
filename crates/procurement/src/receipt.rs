use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use labstock_core::{AggregateId, ItemCode, RoomCode};

use crate::request::RequestId;

/// Receipt identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptId(pub AggregateId);

impl ReceiptId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub item: ItemCode,
    pub qty: i64,
}

/// Goods received by a room, written once when its procurement request closes.
///
/// Counted as stock-in for `room` by the stock view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    pub receipt_id: ReceiptId,
    pub room: RoomCode,
    pub date: NaiveDate,
    pub request_id: RequestId,
    pub lines: Vec<ReceiptLine>,
}

impl ReceiptRecord {
    /// `None` when the sum does not fit in an `i64`.
    pub fn total_qty(&self) -> Option<i64> {
        self.lines.iter().try_fold(0i64, |total, l| total.checked_add(l.qty))
    }
}
