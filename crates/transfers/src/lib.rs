//! Transfer workflow: moving quantity between rooms, subject to approval by the
//! destination room.
//!
//! Pure domain logic only. Approval is recorded by a single event carrying
//! both rooms and the approved quantities, which is what the stock view reads.

pub mod status;
pub mod transfer;

pub use status::{LineOutcome, TransferStatus};
pub use transfer::{
    ApprovalLine, ApproveTransfer, CreateTransfer, DeleteTransfer, EditTransferLines,
    RejectTransfer, RequestedLine, Transfer, TransferApproved, TransferCommand, TransferCreated,
    TransferDeleted, TransferEvent, TransferId, TransferLine, TransferLinesEdited,
    TransferRejected,
};
