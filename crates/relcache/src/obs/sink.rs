//! Metrics sink boundary.
//!
//! Store logic never touches `obs::metrics` directly; every counter update
//! flows through a `MetricsEvent` handed to `record`.

use crate::obs::metrics::{self, CollectionCounters, EventOps, EventReport};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent<'a> {
    RecordsAdded {
        collection: &'a str,
        count: u64,
    },
    RecordsRemoved {
        collection: &'a str,
        count: u64,
    },
    IndexDelta {
        collection: &'a str,
        inserts: u64,
        removes: u64,
    },
    QueryRun {
        collection: &'a str,
        scanned: u64,
        returned: u64,
    },
    Relink {
        collection: &'a str,
    },
    LinkResolved {
        collection: &'a str,
    },
    Notification {
        collection: &'a str,
    },
}

impl MetricsEvent<'_> {
    fn collection(&self) -> &str {
        match self {
            Self::RecordsAdded { collection, .. }
            | Self::RecordsRemoved { collection, .. }
            | Self::IndexDelta { collection, .. }
            | Self::QueryRun { collection, .. }
            | Self::Relink { collection }
            | Self::LinkResolved { collection }
            | Self::Notification { collection } => *collection,
        }
    }
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent<'_>);
}

/// GlobalMetricsSink
/// Default sink writing into the thread-local counters.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        metrics::with_state_mut(|m| {
            let entry = m
                .collections
                .entry(event.collection().to_string())
                .or_default();
            apply(&mut m.ops, entry, event);
        });
    }
}

fn apply(ops: &mut EventOps, entry: &mut CollectionCounters, event: MetricsEvent<'_>) {
    match event {
        MetricsEvent::RecordsAdded { count, .. } => {
            ops.records_added = ops.records_added.saturating_add(count);
            entry.records_added = entry.records_added.saturating_add(count);
        }
        MetricsEvent::RecordsRemoved { count, .. } => {
            ops.records_removed = ops.records_removed.saturating_add(count);
            entry.records_removed = entry.records_removed.saturating_add(count);
        }
        MetricsEvent::IndexDelta {
            inserts, removes, ..
        } => {
            ops.index_inserts = ops.index_inserts.saturating_add(inserts);
            ops.index_removes = ops.index_removes.saturating_add(removes);
            entry.index_inserts = entry.index_inserts.saturating_add(inserts);
            entry.index_removes = entry.index_removes.saturating_add(removes);
        }
        MetricsEvent::QueryRun {
            scanned, returned, ..
        } => {
            ops.queries = ops.queries.saturating_add(1);
            ops.rows_scanned = ops.rows_scanned.saturating_add(scanned);
            ops.rows_returned = ops.rows_returned.saturating_add(returned);
            entry.queries = entry.queries.saturating_add(1);
            entry.rows_scanned = entry.rows_scanned.saturating_add(scanned);
            entry.rows_returned = entry.rows_returned.saturating_add(returned);
        }
        MetricsEvent::Relink { .. } => {
            ops.relinks = ops.relinks.saturating_add(1);
            entry.relinks = entry.relinks.saturating_add(1);
        }
        MetricsEvent::LinkResolved { .. } => {
            ops.link_resolutions = ops.link_resolutions.saturating_add(1);
            entry.link_resolutions = entry.link_resolutions.saturating_add(1);
        }
        MetricsEvent::Notification { .. } => {
            ops.notifications = ops.notifications.saturating_add(1);
            entry.notifications = entry.notifications.saturating_add(1);
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent<'_>) {
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());
    match sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current counters.
#[must_use]
pub fn metrics_report() -> EventReport {
    metrics::report()
}

/// Reset every counter.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override. The previous sink
/// is restored on every exit, including unwinding.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

///
/// TESTS
///
