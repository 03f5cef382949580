//! Procurement workflow: a room asks logistics for items, logistics dispatches,
//! the room acknowledges what arrived.
//!
//! Acknowledgement closes the request and produces the [`ReceiptRecord`] in the
//! same event, so a closed request always has exactly one receipt.

pub mod receipt;
pub mod request;
pub mod status;

pub use receipt::{ReceiptId, ReceiptLine, ReceiptRecord};
pub use request::{
    AcknowledgeRequest, CreateRequest, DeleteRequest, DispatchRequest, EditRequestLines,
    ProcurementAcknowledged, ProcurementCommand, ProcurementDispatched, ProcurementEvent,
    ProcurementLine, ProcurementRequest, ProcurementRequestCreated, ProcurementRequestDeleted,
    ProcurementRequestLinesEdited, QuantityLine, RequestId, RequestedItem,
};
pub use status::RequestStatus;
