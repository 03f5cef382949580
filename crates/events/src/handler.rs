/// Execute an aggregate command in memory (no IO, no persistence).
///
/// Decides with `handle`, then applies every produced event to the aggregate.
/// Handy in aggregate unit tests; the persisted path goes through the
/// infrastructure command dispatcher instead.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: labstock_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
