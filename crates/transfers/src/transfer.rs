use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use labstock_core::{
    Aggregate, AggregateId, AggregateRoot, DomainError, ItemCode, RoomCode, UserId,
    ensure_distinct_items, ensure_quantity_ceiling,
};
use labstock_events::Event;

use crate::status::{LineOutcome, TransferStatus};

/// Transfer record identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(pub AggregateId);

impl TransferId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for TransferId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Line as requested by the source room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedLine {
    pub item: ItemCode,
    pub requested_qty: i64,
}

/// Line as decided by the destination room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalLine {
    pub item: ItemCode,
    pub approved_qty: i64,
}

/// Transfer line. `approved_qty` stays `None` until the transfer is decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLine {
    pub item: ItemCode,
    pub requested_qty: i64,
    pub approved_qty: Option<i64>,
}

impl TransferLine {
    pub fn outcome(&self) -> LineOutcome {
        LineOutcome::of(self.requested_qty, self.approved_qty)
    }
}

/// Aggregate root: Transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    id: TransferId,
    source_room: Option<RoomCode>,
    dest_room: Option<RoomCode>,
    date: Option<NaiveDate>,
    status: TransferStatus,
    lines: Vec<TransferLine>,
    requested_by: Option<UserId>,
    decided_by: Option<UserId>,
    version: u64,
    created: bool,
    deleted: bool,
}

impl Transfer {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: TransferId) -> Self {
        Self {
            id,
            source_room: None,
            dest_room: None,
            date: None,
            status: TransferStatus::Pending,
            lines: Vec::new(),
            requested_by: None,
            decided_by: None,
            version: 0,
            created: false,
            deleted: false,
        }
    }

    pub fn id_typed(&self) -> TransferId {
        self.id
    }

    pub fn source_room(&self) -> Option<&RoomCode> {
        self.source_room.as_ref()
    }

    pub fn dest_room(&self) -> Option<&RoomCode> {
        self.dest_room.as_ref()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn status(&self) -> TransferStatus {
        self.status
    }

    pub fn lines(&self) -> &[TransferLine] {
        &self.lines
    }

    pub fn requested_by(&self) -> Option<UserId> {
        self.requested_by
    }

    pub fn decided_by(&self) -> Option<UserId> {
        self.decided_by
    }

    /// Created and not deleted.
    pub fn exists(&self) -> bool {
        self.created && !self.deleted
    }
}

impl AggregateRoot for Transfer {
    type Id = TransferId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateTransfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTransfer {
    pub transfer_id: TransferId,
    pub source_room: RoomCode,
    pub dest_room: RoomCode,
    pub date: NaiveDate,
    pub lines: Vec<RequestedLine>,
    pub requested_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: EditTransferLines (only while pending).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditTransferLines {
    pub transfer_id: TransferId,
    pub lines: Vec<RequestedLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteTransfer (only while pending).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteTransfer {
    pub transfer_id: TransferId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveTransfer. Must cover every line exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveTransfer {
    pub transfer_id: TransferId,
    pub lines: Vec<ApprovalLine>,
    pub approved_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectTransfer. Equivalent to approving every line with zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectTransfer {
    pub transfer_id: TransferId,
    pub rejected_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferCommand {
    CreateTransfer(CreateTransfer),
    EditTransferLines(EditTransferLines),
    DeleteTransfer(DeleteTransfer),
    ApproveTransfer(ApproveTransfer),
    RejectTransfer(RejectTransfer),
}

/// Event: TransferCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCreated {
    pub transfer_id: TransferId,
    pub source_room: RoomCode,
    pub dest_room: RoomCode,
    pub date: NaiveDate,
    pub lines: Vec<RequestedLine>,
    pub requested_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransferLinesEdited. Replaces the whole line list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLinesEdited {
    pub transfer_id: TransferId,
    pub lines: Vec<RequestedLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransferDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDeleted {
    pub transfer_id: TransferId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransferApproved.
///
/// Carries both rooms and the finalized lines so stock can be derived from
/// this one event: `-approved_qty` at the source, `+approved_qty` at the
/// destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferApproved {
    pub transfer_id: TransferId,
    pub source_room: RoomCode,
    pub dest_room: RoomCode,
    pub lines: Vec<TransferLine>,
    pub status: TransferStatus,
    pub approved_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransferRejected. Moves no stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRejected {
    pub transfer_id: TransferId,
    pub source_room: RoomCode,
    pub dest_room: RoomCode,
    pub rejected_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferEvent {
    TransferCreated(TransferCreated),
    TransferLinesEdited(TransferLinesEdited),
    TransferDeleted(TransferDeleted),
    TransferApproved(TransferApproved),
    TransferRejected(TransferRejected),
}

impl Event for TransferEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TransferEvent::TransferCreated(_) => "transfers.transfer.created",
            TransferEvent::TransferLinesEdited(_) => "transfers.transfer.lines_edited",
            TransferEvent::TransferDeleted(_) => "transfers.transfer.deleted",
            TransferEvent::TransferApproved(_) => "transfers.transfer.approved",
            TransferEvent::TransferRejected(_) => "transfers.transfer.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TransferEvent::TransferCreated(e) => e.occurred_at,
            TransferEvent::TransferLinesEdited(e) => e.occurred_at,
            TransferEvent::TransferDeleted(e) => e.occurred_at,
            TransferEvent::TransferApproved(e) => e.occurred_at,
            TransferEvent::TransferRejected(e) => e.occurred_at,
        }
    }
}

fn pending_lines(lines: &[RequestedLine]) -> Vec<TransferLine> {
    lines
        .iter()
        .map(|l| TransferLine {
            item: l.item.clone(),
            requested_qty: l.requested_qty,
            approved_qty: None,
        })
        .collect()
}

impl Aggregate for Transfer {
    type Command = TransferCommand;
    type Event = TransferEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TransferEvent::TransferCreated(e) => {
                self.id = e.transfer_id;
                self.source_room = Some(e.source_room.clone());
                self.dest_room = Some(e.dest_room.clone());
                self.date = Some(e.date);
                self.status = TransferStatus::Pending;
                self.lines = pending_lines(&e.lines);
                self.requested_by = Some(e.requested_by);
                self.created = true;
            }
            TransferEvent::TransferLinesEdited(e) => {
                self.lines = pending_lines(&e.lines);
            }
            TransferEvent::TransferDeleted(_) => {
                self.deleted = true;
            }
            TransferEvent::TransferApproved(e) => {
                self.lines = e.lines.clone();
                self.status = e.status;
                self.decided_by = Some(e.approved_by);
            }
            TransferEvent::TransferRejected(e) => {
                for line in &mut self.lines {
                    line.approved_qty = Some(0);
                }
                self.status = TransferStatus::Rejected;
                self.decided_by = Some(e.rejected_by);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TransferCommand::CreateTransfer(cmd) => self.handle_create(cmd),
            TransferCommand::EditTransferLines(cmd) => self.handle_edit(cmd),
            TransferCommand::DeleteTransfer(cmd) => self.handle_delete(cmd),
            TransferCommand::ApproveTransfer(cmd) => self.handle_approve(cmd),
            TransferCommand::RejectTransfer(cmd) => self.handle_reject(cmd),
        }
    }
}

/// Line rules shared by create and edit.
fn validate_requested_lines(lines: &[RequestedLine]) -> Result<(), DomainError> {
    if lines.is_empty() {
        return Err(DomainError::validation("transfer needs at least one line"));
    }
    ensure_distinct_items(lines.iter().map(|l| &l.item))?;
    if let Some(line) = lines.iter().find(|l| l.requested_qty <= 0) {
        return Err(DomainError::validation(format!(
            "requested quantity for {} must be positive",
            line.item
        )));
    }
    for line in lines {
        ensure_quantity_ceiling(&line.item, line.requested_qty)?;
    }
    Ok(())
}

impl Transfer {
    fn ensure_transfer_id(&self, transfer_id: TransferId) -> Result<(), DomainError> {
        if self.id != transfer_id {
            return Err(DomainError::invariant("transfer_id mismatch"));
        }
        Ok(())
    }

    fn ensure_pending(&self, transfer_id: TransferId, action: &str) -> Result<(), DomainError> {
        if !self.exists() {
            return Err(DomainError::not_found());
        }
        self.ensure_transfer_id(transfer_id)?;
        if self.status != TransferStatus::Pending {
            return Err(DomainError::conflict(format!(
                "cannot {action} a transfer that is already {}",
                self.status
            )));
        }
        Ok(())
    }

    fn rooms(&self) -> Result<(RoomCode, RoomCode), DomainError> {
        match (&self.source_room, &self.dest_room) {
            (Some(source), Some(dest)) => Ok((source.clone(), dest.clone())),
            _ => Err(DomainError::invariant("transfer rooms must be set")),
        }
    }

    fn handle_create(&self, cmd: &CreateTransfer) -> Result<Vec<TransferEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("transfer already exists"));
        }
        if cmd.source_room == cmd.dest_room {
            return Err(DomainError::validation(
                "source and destination room must differ",
            ));
        }
        validate_requested_lines(&cmd.lines)?;

        Ok(vec![TransferEvent::TransferCreated(TransferCreated {
            transfer_id: cmd.transfer_id,
            source_room: cmd.source_room.clone(),
            dest_room: cmd.dest_room.clone(),
            date: cmd.date,
            lines: cmd.lines.clone(),
            requested_by: cmd.requested_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_edit(&self, cmd: &EditTransferLines) -> Result<Vec<TransferEvent>, DomainError> {
        self.ensure_pending(cmd.transfer_id, "edit")?;
        validate_requested_lines(&cmd.lines)?;

        Ok(vec![TransferEvent::TransferLinesEdited(TransferLinesEdited {
            transfer_id: cmd.transfer_id,
            lines: cmd.lines.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteTransfer) -> Result<Vec<TransferEvent>, DomainError> {
        self.ensure_pending(cmd.transfer_id, "delete")?;

        Ok(vec![TransferEvent::TransferDeleted(TransferDeleted {
            transfer_id: cmd.transfer_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveTransfer) -> Result<Vec<TransferEvent>, DomainError> {
        self.ensure_pending(cmd.transfer_id, "approve")?;
        let (source_room, dest_room) = self.rooms()?;

        ensure_distinct_items(cmd.lines.iter().map(|l| &l.item))?;
        let decided: HashMap<&ItemCode, i64> = cmd
            .lines
            .iter()
            .map(|l| (&l.item, l.approved_qty))
            .collect();

        if let Some(stray) = cmd
            .lines
            .iter()
            .find(|l| !self.lines.iter().any(|t| t.item == l.item))
        {
            return Err(DomainError::validation(format!(
                "item {} is not part of this transfer",
                stray.item
            )));
        }

        let mut lines = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            let Some(&approved) = decided.get(&line.item) else {
                return Err(DomainError::validation(format!(
                    "approval must cover item {}",
                    line.item
                )));
            };
            if approved < 0 || approved > line.requested_qty {
                return Err(DomainError::validation(format!(
                    "approved quantity for {} must be between 0 and {}",
                    line.item, line.requested_qty
                )));
            }
            lines.push(TransferLine {
                item: line.item.clone(),
                requested_qty: line.requested_qty,
                approved_qty: Some(approved),
            });
        }

        let status = TransferStatus::from_quantities(
            lines
                .iter()
                .map(|l| (l.requested_qty, l.approved_qty.unwrap_or(0))),
        );
        if !self.status.can_transition_to(status) {
            return Err(DomainError::conflict(format!(
                "transfer cannot move from {} to {status}",
                self.status
            )));
        }

        Ok(vec![TransferEvent::TransferApproved(TransferApproved {
            transfer_id: cmd.transfer_id,
            source_room,
            dest_room,
            lines,
            status,
            approved_by: cmd.approved_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectTransfer) -> Result<Vec<TransferEvent>, DomainError> {
        self.ensure_pending(cmd.transfer_id, "reject")?;
        let (source_room, dest_room) = self.rooms()?;

        Ok(vec![TransferEvent::TransferRejected(TransferRejected {
            transfer_id: cmd.transfer_id,
            source_room,
            dest_room,
            rejected_by: cmd.rejected_by,
            occurred_at: cmd.occurred_at,
        })])
    }
}
