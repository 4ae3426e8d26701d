//! Audit trail for risk evaluations and step-up lifecycle operations.
//!
//! Every engine operation emits one [`AuditEvent`] through an
//! [`AuditPipeline`], which fans it out to registered [`AuditSink`]s
//! concurrently. Sink failures are logged and swallowed so the decision
//! path never stalls on observability.

pub mod events;
pub mod pipeline;
pub mod sink;

pub use {
    events::AuditEvent,
    pipeline::AuditPipeline,
    sink::{AuditSink, MemorySink, TracingSink},
};
