//! Inventory domain module: master-data reference records and consumption.
//!
//! Items and rooms are owned by the master-data collaborator; this crate only
//! defines the shape the ledger resolves them into. Consumption records are
//! event-sourced like every other ledger record (no IO, no storage here).

pub mod catalog;
pub mod consumption;

pub use catalog::{Item, Room};
pub use consumption::{
    ConsumptionCommand, ConsumptionEvent, ConsumptionId, ConsumptionLine, ConsumptionRecord,
    ConsumptionRecorded, RecordConsumption,
};
