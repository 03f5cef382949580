use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use labstock_core::{
    Aggregate, AggregateId, AggregateRoot, DomainError, ItemCode, RoomCode, UserId,
    ensure_distinct_items, ensure_quantity_ceiling,
};
use labstock_events::Event;

use crate::variance::VarianceKind;

/// Opname record identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpnameId(pub AggregateId);

impl OpnameId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OpnameId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A counted item with the system quantity read at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpnameCount {
    pub item: ItemCode,
    pub system_qty: i64,
    pub physical_qty: i64,
}

/// Recorded opname line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpnameLine {
    pub item: ItemCode,
    pub system_qty: i64,
    pub physical_qty: i64,
    pub variance: i64,
    pub variance_kind: VarianceKind,
}

impl OpnameLine {
    fn from_count(count: &OpnameCount) -> Result<Self, DomainError> {
        let variance = count
            .physical_qty
            .checked_sub(count.system_qty)
            .ok_or_else(|| {
                DomainError::validation(format!("variance for {} is out of range", count.item))
            })?;
        Ok(Self {
            item: count.item.clone(),
            system_qty: count.system_qty,
            physical_qty: count.physical_qty,
            variance,
            variance_kind: VarianceKind::of(variance),
        })
    }
}

/// Aggregate root: OpnameRecord. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpnameRecord {
    id: OpnameId,
    room: Option<RoomCode>,
    date: Option<NaiveDate>,
    submitted_at: Option<DateTime<Utc>>,
    submitted_by: Option<UserId>,
    lines: Vec<OpnameLine>,
    version: u64,
    created: bool,
}

impl OpnameRecord {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: OpnameId) -> Self {
        Self {
            id,
            room: None,
            date: None,
            submitted_at: None,
            submitted_by: None,
            lines: Vec::new(),
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

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn submitted_by(&self) -> Option<UserId> {
        self.submitted_by
    }

    pub fn lines(&self) -> &[OpnameLine] {
        &self.lines
    }

    pub fn exists(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for OpnameRecord {
    type Id = OpnameId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SubmitOpname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOpname {
    pub record_id: OpnameId,
    pub room: RoomCode,
    pub date: NaiveDate,
    pub lines: Vec<OpnameCount>,
    pub submitted_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpnameCommand {
    SubmitOpname(SubmitOpname),
}

/// Event: OpnameSubmitted. Each line's `physical_qty` becomes the latest
/// baseline for its (room, item).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpnameSubmitted {
    pub record_id: OpnameId,
    pub room: RoomCode,
    pub date: NaiveDate,
    pub lines: Vec<OpnameLine>,
    pub submitted_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpnameEvent {
    OpnameSubmitted(OpnameSubmitted),
}

impl Event for OpnameEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OpnameEvent::OpnameSubmitted(_) => "opname.record.submitted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OpnameEvent::OpnameSubmitted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for OpnameRecord {
    type Command = OpnameCommand;
    type Event = OpnameEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OpnameEvent::OpnameSubmitted(e) => {
                self.id = e.record_id;
                self.room = Some(e.room.clone());
                self.date = Some(e.date);
                self.submitted_at = Some(e.occurred_at);
                self.submitted_by = Some(e.submitted_by);
                self.lines = e.lines.clone();
                self.created = true;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OpnameCommand::SubmitOpname(cmd) => self.handle_submit(cmd),
        }
    }
}

impl OpnameRecord {
    fn handle_submit(&self, cmd: &SubmitOpname) -> Result<Vec<OpnameEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("opname record already exists"));
        }
        if cmd.lines.is_empty() {
            return Err(DomainError::validation("opname needs at least one line"));
        }
        ensure_distinct_items(cmd.lines.iter().map(|l| &l.item))?;
        if let Some(line) = cmd.lines.iter().find(|l| l.physical_qty < 0) {
            return Err(DomainError::validation(format!(
                "physical quantity for {} cannot be negative",
                line.item
            )));
        }
        for line in &cmd.lines {
            ensure_quantity_ceiling(&line.item, line.physical_qty)?;
        }
        let lines = cmd
            .lines
            .iter()
            .map(OpnameLine::from_count)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(vec![OpnameEvent::OpnameSubmitted(OpnameSubmitted {
            record_id: cmd.record_id,
            room: cmd.room.clone(),
            date: cmd.date,
            lines,
            submitted_by: cmd.submitted_by,
            occurred_at: cmd.occurred_at,
        })])
    }
}
