//! Opname reconciliation: physical counts submitted against the system quantity.
//!
//! The system quantity of each line is resolved by the caller (the stock view)
//! at submission time and frozen into the record together with its variance.

pub mod record;
pub mod variance;

pub use record::{
    OpnameCommand, OpnameCount, OpnameEvent, OpnameId, OpnameLine, OpnameRecord, OpnameSubmitted,
    SubmitOpname,
};
pub use variance::VarianceKind;
