//! Loads stock facts from the event store and hands them to the composer.
//!
//! Nothing is cached: every call re-reads the committed log, so the result is
//! always derivable from the store alone.

use labstock_core::{ItemCode, RoomCode};
use labstock_inventory::ConsumptionEvent;
use labstock_opname::OpnameEvent;
use labstock_procurement::ProcurementEvent;
use labstock_stock::{
    BaselinePolicy, StockFact, StockLevel, StockOverflow, compose_stock, consumption_facts, opname_facts,
    procurement_facts, room_movements, transfer_facts,
};
use labstock_transfers::TransferEvent;

use crate::command_dispatcher::DispatchError;
use crate::event_store::{EventStore, StoredEvent};
use crate::streams::{self, decode};

/// Extract every stock fact from a globally ordered event log.
pub fn stock_facts(log: &[StoredEvent]) -> Result<Vec<StockFact>, DispatchError> {
    let mut facts = Vec::new();
    for stored in log {
        let position = stored.global_position;
        match stored.aggregate_type.as_str() {
            streams::TRANSFER => {
                facts.extend(transfer_facts(&decode::<TransferEvent>(stored)?, position))
            }
            streams::PROCUREMENT_REQUEST => {
                facts.extend(procurement_facts(&decode::<ProcurementEvent>(stored)?, position))
            }
            streams::OPNAME_RECORD => {
                facts.extend(opname_facts(&decode::<OpnameEvent>(stored)?, position))
            }
            streams::CONSUMPTION_RECORD => {
                facts.extend(consumption_facts(&decode::<ConsumptionEvent>(stored)?, position))
            }
            _ => {}
        }
    }
    Ok(facts)
}

/// Read snapshot of derived stock.
#[derive(Debug, Clone)]
pub struct StockSnapshot {
    facts: Vec<StockFact>,
    policy: BaselinePolicy,
}

impl StockSnapshot {
    pub fn load<S: EventStore + ?Sized>(store: &S, policy: BaselinePolicy) -> Result<Self, DispatchError> {
        let log = store.load_all()?;
        Ok(Self {
            facts: stock_facts(&log)?,
            policy,
        })
    }

    pub fn level(&self, room: &RoomCode, item: &ItemCode) -> Result<StockLevel, StockOverflow> {
        compose_stock(&self.facts, room, item, self.policy)
    }

    pub fn movements(&self, room: &RoomCode) -> Vec<StockFact> {
        room_movements(&self.facts, room)
    }
}
