//! Stock view: the current quantity of an item in a room, derived on read.
//!
//! Input is a slice of [`StockFact`]s extracted from committed ledger events;
//! there is no running balance anywhere. Everything here is a pure function.

pub mod composer;
pub mod extract;
pub mod fact;
pub mod policy;

pub use composer::{StockBreakdown, StockLevel, StockOverflow, compose_stock, room_movements};
pub use extract::{
    consumption_facts, opname_facts, procurement_facts, transfer_facts,
};
pub use fact::{StockFact, StockFactKind};
pub use policy::{BaselinePolicy, UnknownBaselinePolicy};
