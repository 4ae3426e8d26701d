//! Audit sinks: where events go once the pipeline fans them out.

use std::sync::Mutex;

use {anyhow::Result, async_trait::async_trait, tracing::info};

use crate::events::AuditEvent;

/// A destination for audit events.
///
/// Implementations must tolerate concurrent calls. Errors are logged by the
/// pipeline and never reach the evaluation path.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Short name for dispatch logs.
    fn name(&self) -> &str;

    /// Record one event.
    async fn record(&self, event: &AuditEvent) -> Result<()>;
}

// ── Tracing sink ────────────────────────────────────────────────────────────

/// Mirrors every event onto the structured log, payload serialized as JSON.
#[derive(Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl AuditSink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn record(&self, event: &AuditEvent) -> Result<()> {
        let payload = serde_json::to_string(event)?;
        info!(
            target: "castellan::audit",
            event = event.kind(),
            subject_id = event.subject_id(),
            %payload,
            "audit event"
        );
        Ok(())
    }
}

// ── Memory sink ─────────────────────────────────────────────────────────────

/// Captures events in memory. Intended for tests and introspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Events of one kind, in arrival order.
    #[must_use]
    pub fn events_of_kind(&self, kind: &str) -> Vec<AuditEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.kind() == kind)
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[async_trait]
impl AuditSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn record(&self, event: &AuditEvent) -> Result<()> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
        Ok(())
    }
}
