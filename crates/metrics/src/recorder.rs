//! Recorder installation for the metrics facade.

use {anyhow::Result, tracing::info};

/// Handle to the installed recorder; renders the exposition text.
#[derive(Clone)]
pub struct MetricsHandle {
    #[cfg(feature = "prometheus")]
    prometheus: metrics_exporter_prometheus::PrometheusHandle,
}

impl MetricsHandle {
    /// Prometheus text exposition of everything recorded so far.
    ///
    /// Empty when the `prometheus` feature is compiled out.
    #[must_use]
    pub fn render(&self) -> String {
        #[cfg(feature = "prometheus")]
        {
            self.prometheus.render()
        }
        #[cfg(not(feature = "prometheus"))]
        {
            String::new()
        }
    }
}

/// Recorder settings, typically derived from the `[metrics]` config section.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorderConfig {
    /// Install the exporter and register metric descriptions.
    pub enabled: bool,
    /// Labels stamped onto every exported series.
    pub global_labels: Vec<(String, String)>,
}

/// Install the global recorder once at application startup.
///
/// With the `prometheus` feature this wires the exporter, histogram buckets,
/// and global labels, then registers units and help text for every metric.
/// Without the feature every sample is discarded.
///
/// # Errors
///
/// Returns an error if a recorder is already installed for this process.
pub fn init_metrics(config: MetricsRecorderConfig) -> Result<MetricsHandle> {
    if !config.enabled {
        info!("metrics collection disabled");
        return Ok(MetricsHandle {
            #[cfg(feature = "prometheus")]
            prometheus: bare_exporter()?,
        });
    }

    #[cfg(feature = "prometheus")]
    {
        let handle = configured_exporter(config)?;
        crate::describe_metrics();
        info!("prometheus metrics exporter installed");
        Ok(MetricsHandle { prometheus: handle })
    }

    #[cfg(not(feature = "prometheus"))]
    {
        crate::describe_metrics();
        info!("metrics enabled but the prometheus feature is compiled out");
        Ok(MetricsHandle {})
    }
}

#[cfg(feature = "prometheus")]
fn configured_exporter(
    config: MetricsRecorderConfig,
) -> Result<metrics_exporter_prometheus::PrometheusHandle> {
    use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

    use crate::{buckets, evaluation, stepup};

    let mut builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("_duration_seconds".to_string()),
            &buckets::EVALUATION_DURATION,
        )?
        .set_buckets_for_metric(Matcher::Full(evaluation::SCORE.to_string()), &buckets::SCORE)?
        .set_buckets_for_metric(
            Matcher::Full(stepup::TIME_TO_VERIFY_SECONDS.to_string()),
            &buckets::TIME_TO_VERIFY,
        )?;

    for (key, value) in config.global_labels {
        builder = builder.add_global_label(key, value);
    }

    // install_recorder registers the recorder globally and hands back a
    // render handle without spawning an exporter HTTP server.
    builder.install_recorder().map_err(Into::into)
}

#[cfg(feature = "prometheus")]
fn bare_exporter() -> Result<metrics_exporter_prometheus::PrometheusHandle> {
    // No buckets, labels, or descriptions; render() stays essentially empty.
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(Into::into)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_recorder_renders_nothing_meaningful() {
        let handle = init_metrics(MetricsRecorderConfig::default()).unwrap();
        let output = handle.render();
        // The exporter emits comment-only metadata lines at most.
        assert!(output.is_empty() || output.contains('#'));
    }
}
