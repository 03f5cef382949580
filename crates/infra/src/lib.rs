//! Infrastructure layer: event store, dispatch pipeline, catalog, and the
//! ledger service that ties the record types together.

pub mod catalog;
pub mod command_dispatcher;
pub mod config;
pub mod event_store;
pub mod ledger;
pub mod stock_view;
pub mod streams;

pub use catalog::{Catalog, CatalogError, CatalogSeed, InMemoryCatalog};
pub use config::LedgerConfig;
pub use ledger::{
    ConsumptionEntry, LedgerError, LedgerResult, LedgerService, NewProcurementRequest,
    NewTransfer, OpnameSubmission, PhysicalCount,
};

#[cfg(test)]
mod integration_tests;
