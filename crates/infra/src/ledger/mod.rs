//! Ledger operations behind the authorization boundary.
//!
//! Every operation takes the request's resolved [`Principal`], checks the
//! capability it needs, resolves room/item references through the catalog, and
//! only then dispatches a command. Reads recompute stock from the store.

mod error;
mod views;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::Value as JsonValue;

use labstock_auth::{Capability, Principal};
use labstock_core::{AggregateId, ItemCode, RoomCode};
use labstock_events::{EventBus, EventEnvelope};
use labstock_inventory::{
    ConsumptionCommand, ConsumptionId, ConsumptionLine, ConsumptionRecord, RecordConsumption,
};
use labstock_opname::{OpnameCommand, OpnameCount, OpnameId, OpnameRecord, SubmitOpname};
use labstock_procurement::{
    AcknowledgeRequest, CreateRequest, DeleteRequest, DispatchRequest, EditRequestLines,
    ProcurementCommand, ProcurementEvent, ProcurementRequest, QuantityLine, ReceiptId,
    ReceiptRecord, RequestId, RequestedItem,
};
use labstock_stock::{StockFact, StockLevel};
use labstock_transfers::{
    ApprovalLine, ApproveTransfer, CreateTransfer, DeleteTransfer, EditTransferLines,
    RejectTransfer, RequestedLine, Transfer, TransferCommand, TransferId,
};

use crate::catalog::Catalog;
use crate::command_dispatcher::CommandDispatcher;
use crate::config::LedgerConfig;
use crate::event_store::EventStore;
use crate::stock_view::StockSnapshot;
use crate::streams::{self, decode, rehydrate_all};

pub use error::LedgerError;
pub use views::{ConsumptionView, OpnameView, ProcurementView, TransferLineView, TransferView};

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Input of `create_transfer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransfer {
    pub source_room: RoomCode,
    pub dest_room: RoomCode,
    pub date: NaiveDate,
    pub lines: Vec<RequestedLine>,
}

/// Input of `create_procurement_request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProcurementRequest {
    pub room: RoomCode,
    pub date: NaiveDate,
    pub lines: Vec<RequestedItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalCount {
    pub item: ItemCode,
    pub physical_qty: i64,
}

/// Input of `submit_opname`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpnameSubmission {
    pub date: NaiveDate,
    pub lines: Vec<PhysicalCount>,
}

/// Input of `record_consumption`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumptionEntry {
    pub date: NaiveDate,
    pub lines: Vec<ConsumptionLine>,
}

pub struct LedgerService<S, B> {
    dispatcher: CommandDispatcher<S, B>,
    catalog: Arc<dyn Catalog>,
    config: LedgerConfig,
}

impl<S, B> LedgerService<S, B> {
    pub fn new(store: S, bus: B, catalog: Arc<dyn Catalog>, config: LedgerConfig) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            catalog,
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<S, B> {
        &self.dispatcher
    }
}

fn make_transfer(id: AggregateId) -> Transfer {
    Transfer::empty(TransferId::new(id))
}

fn make_request(id: AggregateId) -> ProcurementRequest {
    ProcurementRequest::empty(RequestId::new(id))
}

fn make_opname(id: AggregateId) -> OpnameRecord {
    OpnameRecord::empty(OpnameId::new(id))
}

fn make_consumption(id: AggregateId) -> ConsumptionRecord {
    ConsumptionRecord::empty(ConsumptionId::new(id))
}

impl<S, B> LedgerService<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    // -------------------------
    // References and preconditions
    // -------------------------

    fn resolve_room(&self, room: &RoomCode) -> LedgerResult<()> {
        match self.catalog.room(room) {
            None => Err(LedgerError::Referential(format!("unknown room {room}"))),
            Some(r) if !r.active => Err(LedgerError::Referential(format!("room {room} is inactive"))),
            Some(_) => Ok(()),
        }
    }

    fn resolve_items<'a>(&self, items: impl IntoIterator<Item = &'a ItemCode>) -> LedgerResult<()> {
        for item in items {
            match self.catalog.item(item) {
                None => return Err(LedgerError::Referential(format!("unknown item {item}"))),
                Some(i) if !i.active => {
                    return Err(LedgerError::Referential(format!("item {item} is inactive")));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Reads accept deactivated master data; only codes the catalog never knew are missing.
    fn ensure_known_room(&self, room: &RoomCode) -> LedgerResult<()> {
        match self.catalog.room(room) {
            Some(_) => Ok(()),
            None => Err(LedgerError::NotFound),
        }
    }

    fn ensure_known_item(&self, item: &ItemCode) -> LedgerResult<()> {
        match self.catalog.item(item) {
            Some(_) => Ok(()),
            None => Err(LedgerError::NotFound),
        }
    }

    fn snapshot(&self) -> LedgerResult<StockSnapshot> {
        Ok(StockSnapshot::load(
            self.dispatcher.store(),
            self.config.baseline_policy,
        )?)
    }

    fn ensure_available(&self, source: &RoomCode, lines: &[RequestedLine]) -> LedgerResult<()> {
        if !self.config.enforce_available_stock {
            return Ok(());
        }
        let snapshot = self.snapshot()?;
        for line in lines {
            let available = snapshot.level(source, &line.item)?.quantity;
            if line.requested_qty > available {
                return Err(LedgerError::Validation(format!(
                    "requested {} of {} but only {available} available in {source}",
                    line.requested_qty, line.item
                )));
            }
        }
        Ok(())
    }

    fn load_transfer(&self, id: AggregateId) -> LedgerResult<Transfer> {
        let transfer = self.dispatcher.load(id, make_transfer)?;
        if !transfer.exists() {
            return Err(LedgerError::NotFound);
        }
        Ok(transfer)
    }

    fn load_request(&self, id: AggregateId) -> LedgerResult<ProcurementRequest> {
        let request = self.dispatcher.load(id, make_request)?;
        if !request.exists() {
            return Err(LedgerError::NotFound);
        }
        Ok(request)
    }

    // -------------------------
    // Stock view
    // -------------------------

    #[tracing::instrument(skip_all, fields(user_id = %principal.user_id(), room = %room, item = %item), err)]
    pub fn compute_stock(
        &self,
        principal: &Principal,
        room: &RoomCode,
        item: &ItemCode,
    ) -> LedgerResult<StockLevel> {
        principal.require(&Capability::ReadLedger)?;
        self.ensure_known_room(room)?;
        self.ensure_known_item(item)?;
        Ok(self.snapshot()?.level(room, item)?)
    }

    #[tracing::instrument(skip_all, fields(user_id = %principal.user_id(), room = %room), err)]
    pub fn list_stock_events(
        &self,
        principal: &Principal,
        room: &RoomCode,
    ) -> LedgerResult<Vec<StockFact>> {
        principal.require(&Capability::ReadLedger)?;
        self.ensure_known_room(room)?;
        Ok(self.snapshot()?.movements(room))
    }

    // -------------------------
    // Transfers
    // -------------------------

    #[tracing::instrument(
        skip_all,
        fields(user_id = %principal.user_id(), source = %input.source_room, dest = %input.dest_room),
        err
    )]
    pub fn create_transfer(
        &self,
        principal: &Principal,
        input: NewTransfer,
    ) -> LedgerResult<TransferView> {
        principal.require(&Capability::operate_room(&input.source_room))?;
        self.resolve_room(&input.source_room)?;
        self.resolve_room(&input.dest_room)?;
        self.resolve_items(input.lines.iter().map(|l| &l.item))?;
        self.ensure_available(&input.source_room, &input.lines)?;

        let id = AggregateId::new();
        let cmd = TransferCommand::CreateTransfer(CreateTransfer {
            transfer_id: TransferId::new(id),
            source_room: input.source_room,
            dest_room: input.dest_room,
            date: input.date,
            lines: input.lines,
            requested_by: principal.user_id(),
            occurred_at: Utc::now(),
        });
        let committed = self
            .dispatcher
            .dispatch(id, streams::TRANSFER, cmd, make_transfer)?;

        tracing::info!(transfer_id = %id, "transfer created");
        TransferView::from_aggregate(&committed.aggregate).ok_or(LedgerError::NotFound)
    }

    #[tracing::instrument(skip_all, fields(user_id = %principal.user_id(), transfer_id = %id), err)]
    pub fn edit_transfer(
        &self,
        principal: &Principal,
        id: AggregateId,
        lines: Vec<RequestedLine>,
    ) -> LedgerResult<TransferView> {
        let current = self.load_transfer(id)?;
        let source = current
            .source_room()
            .cloned()
            .ok_or(LedgerError::NotFound)?;
        principal.require(&Capability::operate_room(&source))?;
        self.resolve_items(lines.iter().map(|l| &l.item))?;
        if current.status().is_terminal() {
            return Err(LedgerError::StateConflict(format!(
                "cannot edit a transfer that is already {}",
                current.status()
            )));
        }
        self.ensure_available(&source, &lines)?;

        let cmd = TransferCommand::EditTransferLines(EditTransferLines {
            transfer_id: TransferId::new(id),
            lines,
            occurred_at: Utc::now(),
        });
        let committed = self
            .dispatcher
            .dispatch(id, streams::TRANSFER, cmd, make_transfer)?;

        tracing::info!(transfer_id = %id, "transfer lines edited");
        TransferView::from_aggregate(&committed.aggregate).ok_or(LedgerError::NotFound)
    }

    #[tracing::instrument(skip_all, fields(user_id = %principal.user_id(), transfer_id = %id), err)]
    pub fn delete_transfer(&self, principal: &Principal, id: AggregateId) -> LedgerResult<()> {
        let current = self.load_transfer(id)?;
        let source = current.source_room().ok_or(LedgerError::NotFound)?;
        principal.require(&Capability::operate_room(source))?;

        let cmd = TransferCommand::DeleteTransfer(DeleteTransfer {
            transfer_id: TransferId::new(id),
            occurred_at: Utc::now(),
        });
        self.dispatcher
            .dispatch(id, streams::TRANSFER, cmd, make_transfer)?;

        tracing::info!(transfer_id = %id, "transfer deleted");
        Ok(())
    }

    /// Decide a pending transfer. Only the destination room may approve.
    #[tracing::instrument(skip_all, fields(user_id = %principal.user_id(), transfer_id = %id), err)]
    pub fn approve_transfer(
        &self,
        principal: &Principal,
        id: AggregateId,
        lines: Vec<ApprovalLine>,
    ) -> LedgerResult<TransferView> {
        let current = self.load_transfer(id)?;
        let dest = current.dest_room().ok_or(LedgerError::NotFound)?;
        principal.require(&Capability::operate_room(dest))?;

        let cmd = TransferCommand::ApproveTransfer(ApproveTransfer {
            transfer_id: TransferId::new(id),
            lines,
            approved_by: principal.user_id(),
            occurred_at: Utc::now(),
        });
        let committed = self
            .dispatcher
            .dispatch(id, streams::TRANSFER, cmd, make_transfer)?;

        tracing::info!(
            transfer_id = %id,
            status = %committed.aggregate.status(),
            "transfer decided"
        );
        TransferView::from_aggregate(&committed.aggregate).ok_or(LedgerError::NotFound)
    }

    #[tracing::instrument(skip_all, fields(user_id = %principal.user_id(), transfer_id = %id), err)]
    pub fn reject_transfer(
        &self,
        principal: &Principal,
        id: AggregateId,
    ) -> LedgerResult<TransferView> {
        let current = self.load_transfer(id)?;
        let dest = current.dest_room().ok_or(LedgerError::NotFound)?;
        principal.require(&Capability::operate_room(dest))?;

        let cmd = TransferCommand::RejectTransfer(RejectTransfer {
            transfer_id: TransferId::new(id),
            rejected_by: principal.user_id(),
            occurred_at: Utc::now(),
        });
        let committed = self
            .dispatcher
            .dispatch(id, streams::TRANSFER, cmd, make_transfer)?;

        tracing::info!(transfer_id = %id, "transfer rejected");
        TransferView::from_aggregate(&committed.aggregate).ok_or(LedgerError::NotFound)
    }

    pub fn get_transfer(&self, principal: &Principal, id: AggregateId) -> LedgerResult<TransferView> {
        principal.require(&Capability::ReadLedger)?;
        let transfer = self.load_transfer(id)?;
        TransferView::from_aggregate(&transfer).ok_or(LedgerError::NotFound)
    }

    /// Transfers in creation order, optionally only those touching `room`.
    pub fn list_transfers(
        &self,
        principal: &Principal,
        room: Option<&RoomCode>,
    ) -> LedgerResult<Vec<TransferView>> {
        principal.require(&Capability::ReadLedger)?;
        let log = self.dispatcher.store().load_all()?;
        let transfers = rehydrate_all(&log, streams::TRANSFER, make_transfer)?;

        Ok(transfers
            .iter()
            .filter_map(TransferView::from_aggregate)
            .filter(|t| room.is_none_or(|r| t.involves(r)))
            .collect())
    }

    // -------------------------
    // Procurement
    // -------------------------

    #[tracing::instrument(skip_all, fields(user_id = %principal.user_id(), room = %input.room), err)]
    pub fn create_procurement_request(
        &self,
        principal: &Principal,
        input: NewProcurementRequest,
    ) -> LedgerResult<ProcurementView> {
        principal.require(&Capability::operate_room(&input.room))?;
        self.resolve_room(&input.room)?;
        self.resolve_items(input.lines.iter().map(|l| &l.item))?;

        let id = AggregateId::new();
        let cmd = ProcurementCommand::CreateRequest(CreateRequest {
            request_id: RequestId::new(id),
            room: input.room,
            date: input.date,
            lines: input.lines,
            requested_by: principal.user_id(),
            occurred_at: Utc::now(),
        });
        let committed =
            self.dispatcher
                .dispatch(id, streams::PROCUREMENT_REQUEST, cmd, make_request)?;

        tracing::info!(request_id = %id, "procurement request created");
        ProcurementView::from_aggregate(&committed.aggregate).ok_or(LedgerError::NotFound)
    }

    #[tracing::instrument(skip_all, fields(user_id = %principal.user_id(), request_id = %id), err)]
    pub fn edit_procurement_request(
        &self,
        principal: &Principal,
        id: AggregateId,
        lines: Vec<RequestedItem>,
    ) -> LedgerResult<ProcurementView> {
        let current = self.load_request(id)?;
        let room = current.room().ok_or(LedgerError::NotFound)?;
        principal.require(&Capability::operate_room(room))?;
        self.resolve_items(lines.iter().map(|l| &l.item))?;

        let cmd = ProcurementCommand::EditRequestLines(EditRequestLines {
            request_id: RequestId::new(id),
            lines,
            occurred_at: Utc::now(),
        });
        let committed =
            self.dispatcher
                .dispatch(id, streams::PROCUREMENT_REQUEST, cmd, make_request)?;

        tracing::info!(request_id = %id, "procurement request edited");
        ProcurementView::from_aggregate(&committed.aggregate).ok_or(LedgerError::NotFound)
    }

    #[tracing::instrument(skip_all, fields(user_id = %principal.user_id(), request_id = %id), err)]
    pub fn delete_procurement_request(
        &self,
        principal: &Principal,
        id: AggregateId,
    ) -> LedgerResult<()> {
        let current = self.load_request(id)?;
        let room = current.room().ok_or(LedgerError::NotFound)?;
        principal.require(&Capability::operate_room(room))?;

        let cmd = ProcurementCommand::DeleteRequest(DeleteRequest {
            request_id: RequestId::new(id),
            occurred_at: Utc::now(),
        });
        self.dispatcher
            .dispatch(id, streams::PROCUREMENT_REQUEST, cmd, make_request)?;

        tracing::info!(request_id = %id, "procurement request deleted");
        Ok(())
    }

    /// Logistics records what was sent. Moves no stock.
    #[tracing::instrument(skip_all, fields(user_id = %principal.user_id(), request_id = %id), err)]
    pub fn dispatch_procurement_request(
        &self,
        principal: &Principal,
        id: AggregateId,
        lines: Vec<QuantityLine>,
    ) -> LedgerResult<ProcurementView> {
        principal.require(&Capability::DispatchProcurement)?;
        self.load_request(id)?;

        let cmd = ProcurementCommand::DispatchRequest(DispatchRequest {
            request_id: RequestId::new(id),
            lines,
            dispatched_by: principal.user_id(),
            occurred_at: Utc::now(),
        });
        let committed =
            self.dispatcher
                .dispatch(id, streams::PROCUREMENT_REQUEST, cmd, make_request)?;

        tracing::info!(request_id = %id, "procurement request dispatched");
        ProcurementView::from_aggregate(&committed.aggregate).ok_or(LedgerError::NotFound)
    }

    /// The requesting room confirms receipt; closes the request and writes the receipt.
    #[tracing::instrument(skip_all, fields(user_id = %principal.user_id(), request_id = %id), err)]
    pub fn acknowledge_procurement_request(
        &self,
        principal: &Principal,
        id: AggregateId,
        lines: Vec<QuantityLine>,
    ) -> LedgerResult<ProcurementView> {
        let current = self.load_request(id)?;
        let room = current.room().ok_or(LedgerError::NotFound)?;
        principal.require(&Capability::operate_room(room))?;

        let now = Utc::now();
        let receipt_id = AggregateId::new();
        let cmd = ProcurementCommand::AcknowledgeRequest(AcknowledgeRequest {
            request_id: RequestId::new(id),
            receipt_id: ReceiptId::new(receipt_id),
            date: now.date_naive(),
            lines,
            acknowledged_by: principal.user_id(),
            occurred_at: now,
        });
        let committed =
            self.dispatcher
                .dispatch(id, streams::PROCUREMENT_REQUEST, cmd, make_request)?;

        tracing::info!(request_id = %id, receipt_id = %receipt_id, "procurement request closed");
        ProcurementView::from_aggregate(&committed.aggregate).ok_or(LedgerError::NotFound)
    }

    pub fn get_procurement_request(
        &self,
        principal: &Principal,
        id: AggregateId,
    ) -> LedgerResult<ProcurementView> {
        principal.require(&Capability::ReadLedger)?;
        let request = self.load_request(id)?;
        ProcurementView::from_aggregate(&request).ok_or(LedgerError::NotFound)
    }

    pub fn list_procurement_requests(
        &self,
        principal: &Principal,
        room: Option<&RoomCode>,
    ) -> LedgerResult<Vec<ProcurementView>> {
        principal.require(&Capability::ReadLedger)?;
        let log = self.dispatcher.store().load_all()?;
        let requests = rehydrate_all(&log, streams::PROCUREMENT_REQUEST, make_request)?;

        Ok(requests
            .iter()
            .filter_map(ProcurementView::from_aggregate)
            .filter(|r| room.is_none_or(|room| &r.room == room))
            .collect())
    }

    /// Receipts of `room` in commit order.
    pub fn list_receipts(
        &self,
        principal: &Principal,
        room: &RoomCode,
    ) -> LedgerResult<Vec<ReceiptRecord>> {
        principal.require(&Capability::ReadLedger)?;
        self.ensure_known_room(room)?;
        let log = self.dispatcher.store().load_all()?;

        let mut receipts = Vec::new();
        for stored in log
            .iter()
            .filter(|e| e.aggregate_type == streams::PROCUREMENT_REQUEST)
        {
            if let ProcurementEvent::ProcurementAcknowledged(e) = decode(stored)? {
                if &e.receipt.room == room {
                    receipts.push(e.receipt);
                }
            }
        }
        Ok(receipts)
    }

    // -------------------------
    // Opname and consumption
    // -------------------------

    /// Record a physical count. Each line's system quantity is read from the
    /// stock view at submission time and frozen into the record.
    #[tracing::instrument(skip_all, fields(user_id = %principal.user_id(), room = %room), err)]
    pub fn submit_opname(
        &self,
        principal: &Principal,
        room: &RoomCode,
        input: OpnameSubmission,
    ) -> LedgerResult<OpnameView> {
        principal.require(&Capability::operate_room(room))?;
        self.resolve_room(room)?;
        self.resolve_items(input.lines.iter().map(|l| &l.item))?;

        let snapshot = self.snapshot()?;
        let counts = input
            .lines
            .into_iter()
            .map(|l| -> LedgerResult<OpnameCount> {
                Ok(OpnameCount {
                    system_qty: snapshot.level(room, &l.item)?.quantity,
                    item: l.item,
                    physical_qty: l.physical_qty,
                })
            })
            .collect::<LedgerResult<Vec<_>>>()?;

        let id = AggregateId::new();
        let cmd = OpnameCommand::SubmitOpname(SubmitOpname {
            record_id: OpnameId::new(id),
            room: room.clone(),
            date: input.date,
            lines: counts,
            submitted_by: principal.user_id(),
            occurred_at: Utc::now(),
        });
        let committed = self
            .dispatcher
            .dispatch(id, streams::OPNAME_RECORD, cmd, make_opname)?;

        tracing::info!(record_id = %id, "opname submitted");
        OpnameView::from_aggregate(&committed.aggregate).ok_or(LedgerError::NotFound)
    }

    pub fn list_opname_records(
        &self,
        principal: &Principal,
        room: &RoomCode,
    ) -> LedgerResult<Vec<OpnameView>> {
        principal.require(&Capability::ReadLedger)?;
        self.ensure_known_room(room)?;
        let log = self.dispatcher.store().load_all()?;
        let records = rehydrate_all(&log, streams::OPNAME_RECORD, make_opname)?;

        Ok(records
            .iter()
            .filter_map(OpnameView::from_aggregate)
            .filter(|r| &r.room == room)
            .collect())
    }

    #[tracing::instrument(skip_all, fields(user_id = %principal.user_id(), room = %room), err)]
    pub fn record_consumption(
        &self,
        principal: &Principal,
        room: &RoomCode,
        input: ConsumptionEntry,
    ) -> LedgerResult<ConsumptionView> {
        principal.require(&Capability::operate_room(room))?;
        self.resolve_room(room)?;
        self.resolve_items(input.lines.iter().map(|l| &l.item))?;

        let id = AggregateId::new();
        let cmd = ConsumptionCommand::RecordConsumption(RecordConsumption {
            record_id: ConsumptionId::new(id),
            room: room.clone(),
            date: input.date,
            lines: input.lines,
            recorded_by: principal.user_id(),
            occurred_at: Utc::now(),
        });
        let committed =
            self.dispatcher
                .dispatch(id, streams::CONSUMPTION_RECORD, cmd, make_consumption)?;

        tracing::info!(record_id = %id, "consumption recorded");
        ConsumptionView::from_aggregate(&committed.aggregate).ok_or(LedgerError::NotFound)
    }
}
