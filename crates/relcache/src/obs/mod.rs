//! Observability: runtime counters and the sink boundary they flow through.
//!
//! Diagnostic log lines go through `tracing` at the call sites; this module
//! only aggregates counters.

pub(crate) mod metrics;
pub(crate) mod sink;

pub use metrics::{CollectionCounters, CollectionSummary, EventOps, EventReport, EventState};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};
