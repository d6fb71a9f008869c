//! Prometheus metrics for Courier subscribers.
//!
//! All metrics follow the naming convention: `courier_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: messages processed by outcome, circuit transitions
//! - **Gauge**: current circuit state
//! - **Histogram**: pipeline run duration by message type

use crate::TelemetryError;
use prometheus::{
    exponential_buckets, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

/// Circuit state as exported by the `courier_circuit_state` gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitStateLabel {
    Closed = 0,
    Open = 1,
    Testing = 2,
}

impl CircuitStateLabel {
    fn transition(self) -> &'static str {
        match self {
            Self::Closed => "reset",
            Self::Open => "broken",
            Self::Testing => "testing",
        }
    }
}

/// Collectors for one subscriber process, registered on a private registry.
#[derive(Clone)]
pub struct PipelineMetrics {
    registry: Registry,
    messages_processed: IntCounterVec,
    processing_duration: HistogramVec,
    circuit_state: IntGauge,
    circuit_transitions: IntCounterVec,
}

impl PipelineMetrics {
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let messages_processed = IntCounterVec::new(
            Opts::new(
                "courier_pipeline_messages_total",
                "Message pipeline runs by message type and outcome",
            ),
            &["message_type", "outcome"],
        )?;

        // 1ms .. ~16s
        let processing_duration = HistogramVec::new(
            HistogramOpts::new(
                "courier_pipeline_duration_seconds",
                "Time spent in the message pipeline",
            )
            .buckets(exponential_buckets(0.001, 2.0, 15)?),
            &["message_type"],
        )?;

        let circuit_state = IntGauge::new(
            "courier_circuit_state",
            "Circuit breaker state (0 closed, 1 open, 2 testing)",
        )?;

        let circuit_transitions = IntCounterVec::new(
            Opts::new(
                "courier_circuit_transitions_total",
                "Circuit breaker transitions",
            ),
            &["transition"],
        )?;

        registry.register(Box::new(messages_processed.clone()))?;
        registry.register(Box::new(processing_duration.clone()))?;
        registry.register(Box::new(circuit_state.clone()))?;
        registry.register(Box::new(circuit_transitions.clone()))?;

        Ok(Self {
            registry,
            messages_processed,
            processing_duration,
            circuit_state,
            circuit_transitions,
        })
    }

    /// Record one pipeline run.
    pub fn observe_message(&self, message_type: &str, outcome: &str, elapsed_secs: f64) {
        self.messages_processed
            .with_label_values(&[message_type, outcome])
            .inc();
        self.processing_duration
            .with_label_values(&[message_type])
            .observe(elapsed_secs);
    }

    /// Record a circuit transition into `state`.
    pub fn circuit_entered(&self, state: CircuitStateLabel) {
        self.circuit_state.set(state as i64);
        self.circuit_transitions
            .with_label_values(&[state.transition()])
            .inc();
    }

    pub fn messages_processed(&self, message_type: &str, outcome: &str) -> u64 {
        self.messages_processed
            .with_label_values(&[message_type, outcome])
            .get()
    }

    pub fn circuit_transitions(&self, state: CircuitStateLabel) -> u64 {
        self.circuit_transitions
            .with_label_values(&[state.transition()])
            .get()
    }

    pub fn circuit_state(&self) -> i64 {
        self.circuit_state.get()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, TelemetryError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Config(e.to_string()))
    }
}

impl std::fmt::Debug for PipelineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineMetrics")
            .field("circuit_state", &self.circuit_state.get())
            .finish_non_exhaustive()
    }
}
