use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use labstock_core::{
    Aggregate, AggregateId, AggregateRoot, DomainError, ItemCode, RoomCode, UserId,
    ensure_distinct_items, ensure_quantity_ceiling,
};
use labstock_events::Event;

/// Consumption record identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsumptionId(pub AggregateId);

impl ConsumptionId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ConsumptionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Quantity of one item used up inside a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionLine {
    pub item: ItemCode,
    pub quantity: i64,
}

/// Aggregate root: ConsumptionRecord (append-only, one event per record).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumptionRecord {
    id: ConsumptionId,
    room: Option<RoomCode>,
    date: Option<NaiveDate>,
    lines: Vec<ConsumptionLine>,
    recorded_by: Option<UserId>,
    version: u64,
    created: bool,
}

impl ConsumptionRecord {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ConsumptionId) -> Self {
        Self {
            id,
            room: None,
            date: None,
            lines: Vec::new(),
            recorded_by: None,
            version: 0,
            created: false,
        }
    }

    pub fn room(&self) -> Option<&RoomCode> {
        self.room.as_ref()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn lines(&self) -> &[ConsumptionLine] {
        &self.lines
    }

    pub fn recorded_by(&self) -> Option<UserId> {
        self.recorded_by
    }

    pub fn exists(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for ConsumptionRecord {
    type Id = ConsumptionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RecordConsumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordConsumption {
    pub record_id: ConsumptionId,
    pub room: RoomCode,
    pub date: NaiveDate,
    pub lines: Vec<ConsumptionLine>,
    pub recorded_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsumptionCommand {
    RecordConsumption(RecordConsumption),
}

/// Event: ConsumptionRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionRecorded {
    pub record_id: ConsumptionId,
    pub room: RoomCode,
    pub date: NaiveDate,
    pub lines: Vec<ConsumptionLine>,
    pub recorded_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsumptionEvent {
    ConsumptionRecorded(ConsumptionRecorded),
}

impl Event for ConsumptionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ConsumptionEvent::ConsumptionRecorded(_) => "inventory.consumption.recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ConsumptionEvent::ConsumptionRecorded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ConsumptionRecord {
    type Command = ConsumptionCommand;
    type Event = ConsumptionEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ConsumptionEvent::ConsumptionRecorded(e) => {
                self.id = e.record_id;
                self.room = Some(e.room.clone());
                self.date = Some(e.date);
                self.lines = e.lines.clone();
                self.recorded_by = Some(e.recorded_by);
                self.created = true;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ConsumptionCommand::RecordConsumption(cmd) => self.handle_record(cmd),
        }
    }
}

impl ConsumptionRecord {
    fn handle_record(&self, cmd: &RecordConsumption) -> Result<Vec<ConsumptionEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("consumption record already exists"));
        }
        if cmd.lines.is_empty() {
            return Err(DomainError::validation("consumption needs at least one line"));
        }
        ensure_distinct_items(cmd.lines.iter().map(|l| &l.item))?;
        if let Some(line) = cmd.lines.iter().find(|l| l.quantity <= 0) {
            return Err(DomainError::validation(format!(
                "consumed quantity for {} must be positive",
                line.item
            )));
        }
        for line in &cmd.lines {
            ensure_quantity_ceiling(&line.item, line.quantity)?;
        }

        Ok(vec![ConsumptionEvent::ConsumptionRecorded(ConsumptionRecorded {
            record_id: cmd.record_id,
            room: cmd.room.clone(),
            date: cmd.date,
            lines: cmd.lines.clone(),
            recorded_by: cmd.recorded_by,
            occurred_at: cmd.occurred_at,
        })])
    }
}
