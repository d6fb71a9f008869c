//! Prometheus-backed `CircuitMonitor` and `StatisticsReporter`.

use courier_subscriber::{CircuitMonitor, ProcessingOutcome, StatisticsReporter};
use courier_telemetry::{CircuitStateLabel, PipelineMetrics};
use std::time::Duration;

/// Mirrors circuit transitions into the state gauge and transition counter.
#[derive(Debug, Clone)]
pub struct PrometheusCircuitMonitor {
    metrics: PipelineMetrics,
}

impl PrometheusCircuitMonitor {
    pub fn new(metrics: PipelineMetrics) -> Self {
        Self { metrics }
    }
}

impl CircuitMonitor for PrometheusCircuitMonitor {
    fn on_broken(&self) {
        self.metrics.circuit_entered(CircuitStateLabel::Open);
    }

    fn on_reset(&self) {
        self.metrics.circuit_entered(CircuitStateLabel::Closed);
    }

    fn on_testing(&self) {
        self.metrics.circuit_entered(CircuitStateLabel::Testing);
    }
}

/// Records every message pipeline run.
#[derive(Debug, Clone)]
pub struct PrometheusStatistics {
    metrics: PipelineMetrics,
}

impl PrometheusStatistics {
    pub fn new(metrics: PipelineMetrics) -> Self {
        Self { metrics }
    }
}

impl StatisticsReporter for PrometheusStatistics {
    fn record(&self, message_type: &str, outcome: ProcessingOutcome, elapsed: Duration) {
        self.metrics
            .observe_message(message_type, outcome.as_str(), elapsed.as_secs_f64());
    }
}
