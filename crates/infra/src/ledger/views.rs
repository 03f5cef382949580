//! Read shapes returned by the ledger service.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use labstock_core::{AggregateId, AggregateRoot, RoomCode, UserId};
use labstock_inventory::{ConsumptionLine, ConsumptionRecord};
use labstock_opname::{OpnameLine, OpnameRecord};
use labstock_procurement::{ProcurementLine, ProcurementRequest, ReceiptRecord, RequestStatus};
use labstock_transfers::{LineOutcome, Transfer, TransferLine, TransferStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLineView {
    #[serde(flatten)]
    pub line: TransferLine,
    pub outcome: LineOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferView {
    pub id: AggregateId,
    pub source_room: RoomCode,
    pub dest_room: RoomCode,
    pub date: NaiveDate,
    pub status: TransferStatus,
    pub lines: Vec<TransferLineView>,
    pub requested_by: UserId,
    pub decided_by: Option<UserId>,
    pub version: u64,
}

impl TransferView {
    /// `None` for a transfer that was never created or has been deleted.
    pub fn from_aggregate(transfer: &Transfer) -> Option<Self> {
        if !transfer.exists() {
            return None;
        }
        Some(Self {
            id: transfer.id_typed().0,
            source_room: transfer.source_room()?.clone(),
            dest_room: transfer.dest_room()?.clone(),
            date: transfer.date()?,
            status: transfer.status(),
            lines: transfer
                .lines()
                .iter()
                .map(|l| TransferLineView {
                    line: l.clone(),
                    outcome: l.outcome(),
                })
                .collect(),
            requested_by: transfer.requested_by()?,
            decided_by: transfer.decided_by(),
            version: transfer.version(),
        })
    }

    pub fn involves(&self, room: &RoomCode) -> bool {
        &self.source_room == room || &self.dest_room == room
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcurementView {
    pub id: AggregateId,
    pub room: RoomCode,
    pub date: NaiveDate,
    pub status: RequestStatus,
    pub lines: Vec<ProcurementLine>,
    pub requested_by: UserId,
    pub receipt: Option<ReceiptRecord>,
    pub version: u64,
}

impl ProcurementView {
    /// `None` for a request that was never created or has been deleted.
    pub fn from_aggregate(request: &ProcurementRequest) -> Option<Self> {
        if !request.exists() {
            return None;
        }
        Some(Self {
            id: request.id_typed().0,
            room: request.room()?.clone(),
            date: request.date()?,
            status: request.status(),
            lines: request.lines().to_vec(),
            requested_by: request.requested_by()?,
            receipt: request.receipt().cloned(),
            version: request.version(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpnameView {
    pub id: AggregateId,
    pub room: RoomCode,
    pub date: NaiveDate,
    pub submitted_at: DateTime<Utc>,
    pub submitted_by: UserId,
    pub lines: Vec<OpnameLine>,
}

impl OpnameView {
    pub fn from_aggregate(record: &OpnameRecord) -> Option<Self> {
        if !record.exists() {
            return None;
        }
        Some(Self {
            id: record.id().0,
            room: record.room()?.clone(),
            date: record.date()?,
            submitted_at: record.submitted_at()?,
            submitted_by: record.submitted_by()?,
            lines: record.lines().to_vec(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionView {
    pub id: AggregateId,
    pub room: RoomCode,
    pub date: NaiveDate,
    pub recorded_by: UserId,
    pub lines: Vec<ConsumptionLine>,
}

impl ConsumptionView {
    pub fn from_aggregate(record: &ConsumptionRecord) -> Option<Self> {
        if !record.exists() {
            return None;
        }
        Some(Self {
            id: record.id().0,
            room: record.room()?.clone(),
            date: record.date()?,
            recorded_by: record.recorded_by()?,
            lines: record.lines().to_vec(),
        })
    }
}
