//! Request DTOs and their mapping into ledger inputs.
//!
//! Codes, ids and dates arrive as strings and are parsed here, so a malformed
//! value becomes a 400 before the ledger is touched.

use serde::Deserialize;

use labstock_infra::{
    ConsumptionEntry, NewProcurementRequest, NewTransfer, OpnameSubmission, PhysicalCount,
};
use labstock_inventory::ConsumptionLine;
use labstock_procurement::{QuantityLine, RequestedItem};
use labstock_transfers::{ApprovalLine, RequestedLine};

use crate::app::errors::{parse_date, parse_item, parse_room};

type Mapped<T> = Result<T, axum::response::Response>;

// -------------------------
// Transfers
// -------------------------

#[derive(Debug, Deserialize)]
pub struct TransferLineRequest {
    pub item: String,
    pub requested_qty: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    pub source_room: String,
    pub dest_room: String,
    pub date: String,
    pub lines: Vec<TransferLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct EditTransferRequest {
    pub lines: Vec<TransferLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ApprovalLineRequest {
    pub item: String,
    pub approved_qty: i64,
}

#[derive(Debug, Deserialize)]
pub struct ApproveTransferRequest {
    pub lines: Vec<ApprovalLineRequest>,
}

pub fn requested_lines(lines: Vec<TransferLineRequest>) -> Mapped<Vec<RequestedLine>> {
    lines
        .into_iter()
        .map(|l| {
            Ok(RequestedLine {
                item: parse_item(&l.item)?,
                requested_qty: l.requested_qty,
            })
        })
        .collect()
}

impl CreateTransferRequest {
    pub fn into_input(self) -> Mapped<NewTransfer> {
        Ok(NewTransfer {
            source_room: parse_room(&self.source_room)?,
            dest_room: parse_room(&self.dest_room)?,
            date: parse_date(&self.date)?,
            lines: requested_lines(self.lines)?,
        })
    }
}

impl ApproveTransferRequest {
    pub fn into_lines(self) -> Mapped<Vec<ApprovalLine>> {
        self.lines
            .into_iter()
            .map(|l| {
                Ok(ApprovalLine {
                    item: parse_item(&l.item)?,
                    approved_qty: l.approved_qty,
                })
            })
            .collect()
    }
}

// -------------------------
// Procurement
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ProcurementLineRequest {
    pub item: String,
    pub qty_requested: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateProcurementRequest {
    pub room: String,
    pub date: String,
    pub lines: Vec<ProcurementLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct EditProcurementRequest {
    pub lines: Vec<ProcurementLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct QuantityLineRequest {
    pub item: String,
    pub qty: i64,
}

/// Body of both dispatch and acknowledge.
#[derive(Debug, Deserialize)]
pub struct QuantityLinesRequest {
    #[serde(default)]
    pub lines: Vec<QuantityLineRequest>,
}

pub fn requested_items(lines: Vec<ProcurementLineRequest>) -> Mapped<Vec<RequestedItem>> {
    lines
        .into_iter()
        .map(|l| {
            Ok(RequestedItem {
                item: parse_item(&l.item)?,
                qty_requested: l.qty_requested,
            })
        })
        .collect()
}

impl CreateProcurementRequest {
    pub fn into_input(self) -> Mapped<NewProcurementRequest> {
        Ok(NewProcurementRequest {
            room: parse_room(&self.room)?,
            date: parse_date(&self.date)?,
            lines: requested_items(self.lines)?,
        })
    }
}

impl QuantityLinesRequest {
    pub fn into_lines(self) -> Mapped<Vec<QuantityLine>> {
        self.lines
            .into_iter()
            .map(|l| {
                Ok(QuantityLine {
                    item: parse_item(&l.item)?,
                    qty: l.qty,
                })
            })
            .collect()
    }
}

// -------------------------
// Opname and consumption
// -------------------------

#[derive(Debug, Deserialize)]
pub struct PhysicalCountRequest {
    pub item: String,
    pub physical_qty: i64,
}

#[derive(Debug, Deserialize)]
pub struct SubmitOpnameRequest {
    pub date: String,
    pub lines: Vec<PhysicalCountRequest>,
}

impl SubmitOpnameRequest {
    pub fn into_input(self) -> Mapped<OpnameSubmission> {
        Ok(OpnameSubmission {
            date: parse_date(&self.date)?,
            lines: self
                .lines
                .into_iter()
                .map(|l| {
                    Ok(PhysicalCount {
                        item: parse_item(&l.item)?,
                        physical_qty: l.physical_qty,
                    })
                })
                .collect::<Mapped<_>>()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ConsumptionLineRequest {
    pub item: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct RecordConsumptionRequest {
    pub date: String,
    pub lines: Vec<ConsumptionLineRequest>,
}

impl RecordConsumptionRequest {
    pub fn into_input(self) -> Mapped<ConsumptionEntry> {
        Ok(ConsumptionEntry {
            date: parse_date(&self.date)?,
            lines: self
                .lines
                .into_iter()
                .map(|l| {
                    Ok(ConsumptionLine {
                        item: parse_item(&l.item)?,
                        quantity: l.quantity,
                    })
                })
                .collect::<Mapped<_>>()?,
        })
    }
}

// -------------------------
// Queries
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct RoomQuery {
    pub room: Option<String>,
}

impl RoomQuery {
    pub fn room(&self) -> Mapped<Option<labstock_core::RoomCode>> {
        self.room.as_deref().map(parse_room).transpose()
    }
}
