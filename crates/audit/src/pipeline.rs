//! Fan-out of audit events to registered sinks.

use std::sync::Arc;

use {
    castellan_metrics::{audit as audit_metrics, counter, labels},
    futures::future::join_all,
    tracing::{debug, info, warn},
};

use crate::{events::AuditEvent, sink::AuditSink};

/// Dispatches each event to every registered sink concurrently.
///
/// Fire and forget: a failing sink is logged and skipped, and never delays
/// or fails the evaluation that produced the event.
#[derive(Default)]
pub struct AuditPipeline {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl AuditPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sink: Arc<dyn AuditSink>) {
        info!(sink = sink.name(), "audit sink registered");
        self.sinks.push(sink);
    }

    #[must_use]
    pub fn sink_names(&self) -> Vec<String> {
        self.sinks.iter().map(|s| s.name().to_string()).collect()
    }

    /// Record one event on every sink.
    pub async fn emit(&self, event: AuditEvent) {
        counter!(audit_metrics::EVENTS_TOTAL, labels::EVENT => event.kind()).increment(1);
        if self.sinks.is_empty() {
            return;
        }
        debug!(
            event = event.kind(),
            count = self.sinks.len(),
            "dispatching audit event"
        );

        let dispatches = self.sinks.iter().map(|sink| {
            let sink = Arc::clone(sink);
            let event = event.clone();
            async move {
                let result = sink.record(&event).await;
                (sink.name().to_string(), result)
            }
        });

        for (name, result) in join_all(dispatches).await {
            if let Err(e) = result {
                counter!(audit_metrics::SINK_ERRORS_TOTAL, labels::SINK => name.clone())
                    .increment(1);
                warn!(sink = %name, event = event.kind(), error = %e, "audit sink failed");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use {anyhow::Result, async_trait::async_trait};

    use super::*;
    use crate::sink::MemorySink;

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        async fn record(&self, _event: &AuditEvent) -> Result<()> {
            anyhow::bail!("sink unavailable")
        }
    }

    fn event() -> AuditEvent {
        AuditEvent::StepUpCancelled {
            subject_id: None,
            challenge_id: "c-1".into(),
        }
    }

    #[tokio::test]
    async fn test_emit_reaches_all_sinks() {
        let first = Arc::new(MemorySink::new());
        let second = Arc::new(MemorySink::new());
        let mut pipeline = AuditPipeline::new();
        pipeline.register(first.clone());
        pipeline.register(second.clone());

        pipeline.emit(event()).await;

        assert_eq!(first.events().len(), 1);
        assert_eq!(second.events().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_block_others() {
        let memory = Arc::new(MemorySink::new());
        let mut pipeline = AuditPipeline::new();
        pipeline.register(Arc::new(FailingSink));
        pipeline.register(memory.clone());

        pipeline.emit(event()).await;
        pipeline.emit(event()).await;

        assert_eq!(memory.events().len(), 2);
    }

    #[tokio::test]
    async fn test_emit_with_no_sinks_is_a_noop() {
        AuditPipeline::new().emit(event()).await;
    }

    #[test]
    fn test_sink_names_in_registration_order() {
        let mut pipeline = AuditPipeline::new();
        pipeline.register(Arc::new(FailingSink));
        pipeline.register(Arc::new(MemorySink::new()));
        assert_eq!(pipeline.sink_names(), vec!["failing", "memory"]);
    }
}
