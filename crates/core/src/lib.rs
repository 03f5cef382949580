//! `labstock-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, room/item codes, aggregate traits and the domain error model.

pub mod aggregate;
pub mod code;
pub mod error;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use code::{
    ItemCode, MAX_LINE_QUANTITY, RoomCode, ensure_distinct_items, ensure_quantity_ceiling,
};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, UserId};
