//! Metrics for the castellan risk engine, built on the `metrics` facade.
//!
//! Metric names live in constant modules grouped by area (`evaluation`,
//! `decision`, `policy`, `stepup`, `audit`) so call sites and dashboards
//! agree on spelling. Nothing is exported unless the embedder installs a
//! recorder, normally via [`init_metrics`].
//!
//! ```rust,ignore
//! use castellan_metrics::{counter, evaluation, histogram, labels};
//!
//! counter!(evaluation::EVALUATIONS_TOTAL, labels::ACTION => "allow").increment(1);
//! histogram!(evaluation::DURATION_SECONDS).record(0.002);
//! ```
//!
//! Enable the `prometheus` feature to render exposition text from
//! [`MetricsHandle::render`].

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

// Re-export the facade macros so call sites need a single import.
pub use metrics::{counter, gauge, histogram};
