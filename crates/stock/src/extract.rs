//! Stock facts carried by committed domain events.
//!
//! Only four events move stock: an approved transfer, an acknowledged
//! procurement request, a submitted opname and recorded consumption. Every
//! other event yields nothing.

use labstock_inventory::ConsumptionEvent;
use labstock_opname::OpnameEvent;
use labstock_procurement::ProcurementEvent;
use labstock_transfers::TransferEvent;

use crate::fact::{StockFact, StockFactKind};

/// `-approved` at the source and `+approved` at the destination, from one event.
pub fn transfer_facts(event: &TransferEvent, position: u64) -> Vec<StockFact> {
    let TransferEvent::TransferApproved(e) = event else {
        return Vec::new();
    };

    let mut facts = Vec::with_capacity(e.lines.len() * 2);
    for line in &e.lines {
        let qty = line.approved_qty.unwrap_or(0);
        if qty == 0 {
            continue;
        }
        facts.push(StockFact {
            position,
            room: e.source_room.clone(),
            item: line.item.clone(),
            kind: StockFactKind::TransferOut,
            quantity: qty,
            record_id: e.transfer_id.0,
            counterpart: Some(e.dest_room.clone()),
            occurred_at: e.occurred_at,
        });
        facts.push(StockFact {
            position,
            room: e.dest_room.clone(),
            item: line.item.clone(),
            kind: StockFactKind::TransferIn,
            quantity: qty,
            record_id: e.transfer_id.0,
            counterpart: Some(e.source_room.clone()),
            occurred_at: e.occurred_at,
        });
    }
    facts
}

/// Receipt lines become stock-in for the requesting room.
pub fn procurement_facts(event: &ProcurementEvent, position: u64) -> Vec<StockFact> {
    let ProcurementEvent::ProcurementAcknowledged(e) = event else {
        return Vec::new();
    };

    e.receipt
        .lines
        .iter()
        .filter(|l| l.qty != 0)
        .map(|l| StockFact {
            position,
            room: e.receipt.room.clone(),
            item: l.item.clone(),
            kind: StockFactKind::Receipt,
            quantity: l.qty,
            record_id: e.receipt.receipt_id.0,
            counterpart: None,
            occurred_at: e.occurred_at,
        })
        .collect()
}

/// Every counted line is a baseline, zero included.
pub fn opname_facts(event: &OpnameEvent, position: u64) -> Vec<StockFact> {
    let OpnameEvent::OpnameSubmitted(e) = event;

    e.lines
        .iter()
        .map(|l| StockFact {
            position,
            room: e.room.clone(),
            item: l.item.clone(),
            kind: StockFactKind::OpnameCount,
            quantity: l.physical_qty,
            record_id: e.record_id.0,
            counterpart: None,
            occurred_at: e.occurred_at,
        })
        .collect()
}

pub fn consumption_facts(event: &ConsumptionEvent, position: u64) -> Vec<StockFact> {
    let ConsumptionEvent::ConsumptionRecorded(e) = event;

    e.lines
        .iter()
        .map(|l| StockFact {
            position,
            room: e.room.clone(),
            item: l.item.clone(),
            kind: StockFactKind::Consumption,
            quantity: l.quantity,
            record_id: e.record_id.0,
            counterpart: None,
            occurred_at: e.occurred_at,
        })
        .collect()
}
