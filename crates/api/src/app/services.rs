//! Service wiring: in-memory store and bus, the ledger service, and the
//! realtime feed behind `/stream`.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use labstock_core::RoomCode;
use labstock_events::{EventBus, EventEnvelope, InMemoryEventBus};
use labstock_infra::event_store::InMemoryEventStore;
use labstock_infra::{Catalog, LedgerConfig, LedgerService};

pub type Ledger =
    LedgerService<Arc<InMemoryEventStore>, Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>>;

/// One committed event as pushed to realtime subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeMessage {
    pub topic: String,
    /// Rooms named by the event, used for `?room=` filtering.
    pub rooms: Vec<RoomCode>,
    pub payload: JsonValue,
}

impl RealtimeMessage {
    pub fn from_envelope(envelope: &EventEnvelope<JsonValue>) -> Self {
        Self {
            topic: envelope.event_type().to_string(),
            rooms: rooms_named_by(envelope.payload()),
            payload: serde_json::json!({
                "event_id": envelope.event_id().to_string(),
                "aggregate_id": envelope.aggregate_id().to_string(),
                "aggregate_type": envelope.aggregate_type(),
                "sequence_number": envelope.sequence_number(),
                "global_position": envelope.global_position(),
                "data": envelope.payload(),
            }),
        }
    }
}

/// Room codes carried by an event payload (`{"Variant": {...}}`).
fn rooms_named_by(payload: &JsonValue) -> Vec<RoomCode> {
    let Some(body) = payload.as_object().and_then(|o| o.values().next()) else {
        return Vec::new();
    };
    let receipt_room = body.get("receipt").and_then(|r| r.get("room"));

    ["room", "source_room", "dest_room"]
        .iter()
        .filter_map(|key| body.get(*key))
        .chain(receipt_room)
        .filter_map(|v| v.as_str())
        .filter_map(|s| RoomCode::new(s).ok())
        .collect()
}

pub struct AppServices {
    ledger: Ledger,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
}

pub fn build_services(catalog: Arc<dyn Catalog>, config: LedgerConfig) -> AppServices {
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Arc<InMemoryEventBus<EventEnvelope<JsonValue>>> = Arc::new(InMemoryEventBus::new());

    // Realtime channel (SSE): lossy broadcast, room-filtered in handlers.
    let (realtime_tx, _realtime_rx) = broadcast::channel::<RealtimeMessage>(256);

    // Background subscriber: bus -> realtime feed
    {
        let sub = bus.subscribe();
        let realtime_tx = realtime_tx.clone();
        std::thread::spawn(move || {
            while let Ok(envelope) = sub.recv() {
                // No receivers is fine; nobody is watching.
                let _ = realtime_tx.send(RealtimeMessage::from_envelope(&envelope));
            }
        });
    }

    tracing::info!(
        baseline_policy = %config.baseline_policy,
        enforce_available_stock = config.enforce_available_stock,
        "ledger services ready"
    );

    AppServices {
        ledger: LedgerService::new(store, bus, catalog, config),
        realtime_tx,
    }
}

impl AppServices {
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<RealtimeMessage> {
        &self.realtime_tx
    }
}

pub fn realtime_sse_stream(
    services: Arc<AppServices>,
    room: Option<RoomCode>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(m) if room.as_ref().is_none_or(|r| m.rooms.contains(r)) => {
            let data = serde_json::to_string(&m.payload).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(m.topic).data(data)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
