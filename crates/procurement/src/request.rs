use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use labstock_core::{
    Aggregate, AggregateId, AggregateRoot, DomainError, ItemCode, RoomCode, UserId,
    ensure_distinct_items, ensure_quantity_ceiling,
};
use labstock_events::Event;

use crate::receipt::{ReceiptId, ReceiptLine, ReceiptRecord};
use crate::status::RequestStatus;

/// Procurement request identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub AggregateId);

impl RequestId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for RequestId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Item and quantity asked for by the requesting room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedItem {
    pub item: ItemCode,
    pub qty_requested: i64,
}

/// Item and quantity reported at dispatch or acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityLine {
    pub item: ItemCode,
    pub qty: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcurementLine {
    pub item: ItemCode,
    pub qty_requested: i64,
    pub qty_dispatched: Option<i64>,
    pub qty_received: Option<i64>,
}

/// Aggregate root: ProcurementRequest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcurementRequest {
    id: RequestId,
    room: Option<RoomCode>,
    date: Option<NaiveDate>,
    status: RequestStatus,
    lines: Vec<ProcurementLine>,
    requested_by: Option<UserId>,
    receipt: Option<ReceiptRecord>,
    version: u64,
    created: bool,
    deleted: bool,
}

impl ProcurementRequest {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: RequestId) -> Self {
        Self {
            id,
            room: None,
            date: None,
            status: RequestStatus::AwaitingDispatch,
            lines: Vec::new(),
            requested_by: None,
            receipt: None,
            version: 0,
            created: false,
            deleted: false,
        }
    }

    pub fn id_typed(&self) -> RequestId {
        self.id
    }

    pub fn room(&self) -> Option<&RoomCode> {
        self.room.as_ref()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn lines(&self) -> &[ProcurementLine] {
        &self.lines
    }

    pub fn requested_by(&self) -> Option<UserId> {
        self.requested_by
    }

    /// The receipt written on acknowledgement, once closed.
    pub fn receipt(&self) -> Option<&ReceiptRecord> {
        self.receipt.as_ref()
    }

    /// Created and not deleted.
    pub fn exists(&self) -> bool {
        self.created && !self.deleted
    }
}

impl AggregateRoot for ProcurementRequest {
    type Id = RequestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub request_id: RequestId,
    pub room: RoomCode,
    pub date: NaiveDate,
    pub lines: Vec<RequestedItem>,
    pub requested_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: EditRequestLines (only while awaiting dispatch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRequestLines {
    pub request_id: RequestId,
    pub lines: Vec<RequestedItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteRequest (only while awaiting dispatch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub request_id: RequestId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DispatchRequest. Request items left out are dispatched as 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub request_id: RequestId,
    pub lines: Vec<QuantityLine>,
    pub dispatched_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AcknowledgeRequest. Request items left out are received as 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcknowledgeRequest {
    pub request_id: RequestId,
    pub receipt_id: ReceiptId,
    pub date: NaiveDate,
    pub lines: Vec<QuantityLine>,
    pub acknowledged_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcurementCommand {
    CreateRequest(CreateRequest),
    EditRequestLines(EditRequestLines),
    DeleteRequest(DeleteRequest),
    DispatchRequest(DispatchRequest),
    AcknowledgeRequest(AcknowledgeRequest),
}

/// Event: ProcurementRequestCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcurementRequestCreated {
    pub request_id: RequestId,
    pub room: RoomCode,
    pub date: NaiveDate,
    pub lines: Vec<RequestedItem>,
    pub requested_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProcurementRequestLinesEdited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcurementRequestLinesEdited {
    pub request_id: RequestId,
    pub lines: Vec<RequestedItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProcurementRequestDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcurementRequestDeleted {
    pub request_id: RequestId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProcurementDispatched. `lines` covers every request item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcurementDispatched {
    pub request_id: RequestId,
    pub room: RoomCode,
    pub lines: Vec<QuantityLine>,
    pub dispatched_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProcurementAcknowledged.
///
/// Closes the request and carries the receipt; the stock view counts the
/// receipt lines as stock-in for the requesting room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcurementAcknowledged {
    pub request_id: RequestId,
    pub receipt: ReceiptRecord,
    pub acknowledged_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcurementEvent {
    ProcurementRequestCreated(ProcurementRequestCreated),
    ProcurementRequestLinesEdited(ProcurementRequestLinesEdited),
    ProcurementRequestDeleted(ProcurementRequestDeleted),
    ProcurementDispatched(ProcurementDispatched),
    ProcurementAcknowledged(ProcurementAcknowledged),
}

impl Event for ProcurementEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProcurementEvent::ProcurementRequestCreated(_) => "procurement.request.created",
            ProcurementEvent::ProcurementRequestLinesEdited(_) => {
                "procurement.request.lines_edited"
            }
            ProcurementEvent::ProcurementRequestDeleted(_) => "procurement.request.deleted",
            ProcurementEvent::ProcurementDispatched(_) => "procurement.request.dispatched",
            ProcurementEvent::ProcurementAcknowledged(_) => "procurement.request.acknowledged",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProcurementEvent::ProcurementRequestCreated(e) => e.occurred_at,
            ProcurementEvent::ProcurementRequestLinesEdited(e) => e.occurred_at,
            ProcurementEvent::ProcurementRequestDeleted(e) => e.occurred_at,
            ProcurementEvent::ProcurementDispatched(e) => e.occurred_at,
            ProcurementEvent::ProcurementAcknowledged(e) => e.occurred_at,
        }
    }
}

fn open_lines(lines: &[RequestedItem]) -> Vec<ProcurementLine> {
    lines
        .iter()
        .map(|l| ProcurementLine {
            item: l.item.clone(),
            qty_requested: l.qty_requested,
            qty_dispatched: None,
            qty_received: None,
        })
        .collect()
}

impl Aggregate for ProcurementRequest {
    type Command = ProcurementCommand;
    type Event = ProcurementEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProcurementEvent::ProcurementRequestCreated(e) => {
                self.id = e.request_id;
                self.room = Some(e.room.clone());
                self.date = Some(e.date);
                self.status = RequestStatus::AwaitingDispatch;
                self.lines = open_lines(&e.lines);
                self.requested_by = Some(e.requested_by);
                self.created = true;
            }
            ProcurementEvent::ProcurementRequestLinesEdited(e) => {
                self.lines = open_lines(&e.lines);
            }
            ProcurementEvent::ProcurementRequestDeleted(_) => {
                self.deleted = true;
            }
            ProcurementEvent::ProcurementDispatched(e) => {
                for line in &mut self.lines {
                    line.qty_dispatched = e
                        .lines
                        .iter()
                        .find(|d| d.item == line.item)
                        .map(|d| d.qty)
                        .or(Some(0));
                }
                self.status = RequestStatus::Dispatched;
            }
            ProcurementEvent::ProcurementAcknowledged(e) => {
                for line in &mut self.lines {
                    line.qty_received = e
                        .receipt
                        .lines
                        .iter()
                        .find(|r| r.item == line.item)
                        .map(|r| r.qty)
                        .or(Some(0));
                }
                self.receipt = Some(e.receipt.clone());
                self.status = RequestStatus::Closed;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProcurementCommand::CreateRequest(cmd) => self.handle_create(cmd),
            ProcurementCommand::EditRequestLines(cmd) => self.handle_edit(cmd),
            ProcurementCommand::DeleteRequest(cmd) => self.handle_delete(cmd),
            ProcurementCommand::DispatchRequest(cmd) => self.handle_dispatch(cmd),
            ProcurementCommand::AcknowledgeRequest(cmd) => self.handle_acknowledge(cmd),
        }
    }
}

fn validate_requested_items(lines: &[RequestedItem]) -> Result<(), DomainError> {
    if lines.is_empty() {
        return Err(DomainError::validation(
            "procurement request needs at least one line",
        ));
    }
    ensure_distinct_items(lines.iter().map(|l| &l.item))?;
    if let Some(line) = lines.iter().find(|l| l.qty_requested <= 0) {
        return Err(DomainError::validation(format!(
            "requested quantity for {} must be positive",
            line.item
        )));
    }
    for line in lines {
        ensure_quantity_ceiling(&line.item, line.qty_requested)?;
    }
    Ok(())
}

impl ProcurementRequest {
    fn ensure_request_id(&self, request_id: RequestId) -> Result<(), DomainError> {
        if self.id != request_id {
            return Err(DomainError::invariant("request_id mismatch"));
        }
        Ok(())
    }

    fn ensure_status(
        &self,
        request_id: RequestId,
        required: RequestStatus,
        action: &str,
    ) -> Result<(), DomainError> {
        if !self.exists() {
            return Err(DomainError::not_found());
        }
        self.ensure_request_id(request_id)?;
        if self.status != required {
            return Err(DomainError::conflict(format!(
                "cannot {action} a request that is {}",
                self.status
            )));
        }
        Ok(())
    }

    fn ensure_transition(&self, next: RequestStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::conflict(format!(
                "request cannot move from {} to {next}",
                self.status
            )));
        }
        Ok(())
    }

    fn room_code(&self) -> Result<RoomCode, DomainError> {
        self.room
            .clone()
            .ok_or_else(|| DomainError::invariant("request room must be set"))
    }

    /// Expand reported lines to one line per request item, in request order.
    ///
    /// Every reported item must belong to the request, appear at most once and
    /// carry a non-negative quantity; unreported items count as 0.
    fn cover_request_items(&self, reported: &[QuantityLine]) -> Result<Vec<QuantityLine>, DomainError> {
        ensure_distinct_items(reported.iter().map(|l| &l.item))?;
        if let Some(stray) = reported
            .iter()
            .find(|r| !self.lines.iter().any(|l| l.item == r.item))
        {
            return Err(DomainError::validation(format!(
                "item {} is not part of this request",
                stray.item
            )));
        }
        if let Some(negative) = reported.iter().find(|r| r.qty < 0) {
            return Err(DomainError::validation(format!(
                "quantity for {} cannot be negative",
                negative.item
            )));
        }
        for line in reported {
            ensure_quantity_ceiling(&line.item, line.qty)?;
        }

        let by_item: HashMap<&ItemCode, i64> =
            reported.iter().map(|r| (&r.item, r.qty)).collect();
        Ok(self
            .lines
            .iter()
            .map(|l| QuantityLine {
                item: l.item.clone(),
                qty: by_item.get(&l.item).copied().unwrap_or(0),
            })
            .collect())
    }

    fn handle_create(&self, cmd: &CreateRequest) -> Result<Vec<ProcurementEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("procurement request already exists"));
        }
        validate_requested_items(&cmd.lines)?;

        Ok(vec![ProcurementEvent::ProcurementRequestCreated(
            ProcurementRequestCreated {
                request_id: cmd.request_id,
                room: cmd.room.clone(),
                date: cmd.date,
                lines: cmd.lines.clone(),
                requested_by: cmd.requested_by,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_edit(&self, cmd: &EditRequestLines) -> Result<Vec<ProcurementEvent>, DomainError> {
        self.ensure_status(cmd.request_id, RequestStatus::AwaitingDispatch, "edit")?;
        validate_requested_items(&cmd.lines)?;

        Ok(vec![ProcurementEvent::ProcurementRequestLinesEdited(
            ProcurementRequestLinesEdited {
                request_id: cmd.request_id,
                lines: cmd.lines.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_delete(&self, cmd: &DeleteRequest) -> Result<Vec<ProcurementEvent>, DomainError> {
        self.ensure_status(cmd.request_id, RequestStatus::AwaitingDispatch, "delete")?;

        Ok(vec![ProcurementEvent::ProcurementRequestDeleted(
            ProcurementRequestDeleted {
                request_id: cmd.request_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_dispatch(
        &self,
        cmd: &DispatchRequest,
    ) -> Result<Vec<ProcurementEvent>, DomainError> {
        self.ensure_status(cmd.request_id, RequestStatus::AwaitingDispatch, "dispatch")?;
        self.ensure_transition(RequestStatus::Dispatched)?;
        let lines = self.cover_request_items(&cmd.lines)?;

        Ok(vec![ProcurementEvent::ProcurementDispatched(
            ProcurementDispatched {
                request_id: cmd.request_id,
                room: self.room_code()?,
                lines,
                dispatched_by: cmd.dispatched_by,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_acknowledge(
        &self,
        cmd: &AcknowledgeRequest,
    ) -> Result<Vec<ProcurementEvent>, DomainError> {
        self.ensure_status(cmd.request_id, RequestStatus::Dispatched, "acknowledge")?;
        self.ensure_transition(RequestStatus::Closed)?;
        let lines = self.cover_request_items(&cmd.lines)?;

        let receipt = ReceiptRecord {
            receipt_id: cmd.receipt_id,
            room: self.room_code()?,
            date: cmd.date,
            request_id: cmd.request_id,
            lines: lines
                .into_iter()
                .map(|l| ReceiptLine {
                    item: l.item,
                    qty: l.qty,
                })
                .collect(),
        };

        Ok(vec![ProcurementEvent::ProcurementAcknowledged(
            ProcurementAcknowledged {
                request_id: cmd.request_id,
                receipt,
                acknowledged_by: cmd.acknowledged_by,
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}
