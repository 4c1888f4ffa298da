use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for store operations.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub collections: BTreeMap<String, CollectionCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Membership
    pub records_added: u64,
    pub records_removed: u64,

    // Index maintenance
    pub index_inserts: u64,
    pub index_removes: u64,

    // Queries
    pub queries: u64,
    pub rows_scanned: u64,
    pub rows_returned: u64,

    // Relations
    pub relinks: u64,
    pub link_resolutions: u64,

    // Change events delivered to observers
    pub notifications: u64,
}

///
/// CollectionCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CollectionCounters {
    pub records_added: u64,
    pub records_removed: u64,
    pub index_inserts: u64,
    pub index_removes: u64,
    pub queries: u64,
    pub rows_scanned: u64,
    pub rows_returned: u64,
    pub relinks: u64,
    pub link_resolutions: u64,
    pub notifications: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

///
/// EventReport
/// Counter snapshot plus per-collection averages.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    pub counters: EventState,
    pub collection_summaries: Vec<CollectionSummary>,
}

///
/// CollectionSummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CollectionSummary {
    pub name: String,
    pub records_added: u64,
    pub records_removed: u64,
    pub queries: u64,
    pub avg_rows_scanned_per_query: f64,
    pub avg_rows_returned_per_query: f64,
    pub relinks: u64,
}

#[allow(clippy::cast_precision_loss)]
fn avg(total: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

/// Build a report from the current state. Summaries are ordered by query
/// count, busiest first, then by name.
#[must_use]
pub(crate) fn report() -> EventReport {
    with_state(|state| {
        let mut collection_summaries: Vec<CollectionSummary> = state
            .collections
            .iter()
            .map(|(name, c)| CollectionSummary {
                name: name.clone(),
                records_added: c.records_added,
                records_removed: c.records_removed,
                queries: c.queries,
                avg_rows_scanned_per_query: avg(c.rows_scanned, c.queries),
                avg_rows_returned_per_query: avg(c.rows_returned, c.queries),
                relinks: c.relinks,
            })
            .collect();
        collection_summaries.sort_by(|a, b| {
            b.queries
                .cmp(&a.queries)
                .then_with(|| a.name.cmp(&b.name))
        });

        EventReport {
            counters: state.clone(),
            collection_summaries,
        }
    })
}
