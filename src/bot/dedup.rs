use std::collections::HashSet;

use crate::db::models::MatchEvent;

/// Events whose id has not been delivered yet, in input order.
///
/// Duplicates within `events` itself are also dropped after the first, so a
/// single cycle never posts the same id twice.
pub fn filter_new(events: Vec<MatchEvent>, delivered: &HashSet<String>) -> Vec<MatchEvent> {
    let mut seen: HashSet<String> = HashSet::new();
    events
        .into_iter()
        .filter(|ev| !delivered.contains(&ev.event_id) && seen.insert(ev.event_id.clone()))
        .collect()
}
