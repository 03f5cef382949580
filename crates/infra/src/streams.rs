//! Stream naming and whole-store replay helpers.

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use labstock_core::{Aggregate, AggregateId};

use crate::command_dispatcher::DispatchError;
use crate::event_store::StoredEvent;

pub const TRANSFER: &str = "transfers.transfer";
pub const PROCUREMENT_REQUEST: &str = "procurement.request";
pub const OPNAME_RECORD: &str = "opname.record";
pub const CONSUMPTION_RECORD: &str = "inventory.consumption";

/// Decode the payload of a stored event into a typed domain event.
pub fn decode<E: DeserializeOwned>(stored: &StoredEvent) -> Result<E, DispatchError> {
    serde_json::from_value(stored.payload.clone()).map_err(|e| {
        DispatchError::Deserialize(format!(
            "{} at position {}: {e}",
            stored.event_type, stored.global_position
        ))
    })
}

/// Rebuild every aggregate of one type from a globally ordered event log.
///
/// Aggregates come back in creation order (position of their first event).
pub fn rehydrate_all<A>(
    log: &[StoredEvent],
    aggregate_type: &str,
    make_aggregate: impl Fn(AggregateId) -> A,
) -> Result<Vec<A>, DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    let mut order: Vec<AggregateId> = Vec::new();
    let mut states: HashMap<AggregateId, A> = HashMap::new();

    for stored in log.iter().filter(|e| e.aggregate_type == aggregate_type) {
        let event: A::Event = decode(stored)?;
        let state = states.entry(stored.aggregate_id).or_insert_with(|| {
            order.push(stored.aggregate_id);
            make_aggregate(stored.aggregate_id)
        });
        state.apply(&event);
    }

    Ok(order
        .into_iter()
        .filter_map(|id| states.remove(&id))
        .collect())
}
