//! Circuit monitor adapters: structured logging and fan-out.

use crate::ports::CircuitMonitor;
use std::sync::Arc;
use tracing::{info, warn};

/// Logs every circuit transition.
#[derive(Debug, Clone)]
pub struct TracingCircuitMonitor {
    subscriber: String,
}

impl TracingCircuitMonitor {
    pub fn new(subscriber: impl Into<String>) -> Self {
        Self {
            subscriber: subscriber.into(),
        }
    }
}

impl CircuitMonitor for TracingCircuitMonitor {
    fn on_broken(&self) {
        warn!(subscriber = %self.subscriber, state = "open", "Circuit broken");
    }

    fn on_reset(&self) {
        info!(subscriber = %self.subscriber, state = "closed", "Circuit reset");
    }

    fn on_testing(&self) {
        info!(subscriber = %self.subscriber, state = "testing", "Circuit testing");
    }
}

/// Forwards every notification to each inner monitor, in order.
#[derive(Clone, Default)]
pub struct CompositeMonitor {
    monitors: Vec<Arc<dyn CircuitMonitor>>,
}

impl CompositeMonitor {
    pub fn new(monitors: Vec<Arc<dyn CircuitMonitor>>) -> Self {
        Self { monitors }
    }

    #[must_use]
    pub fn with(mut self, monitor: Arc<dyn CircuitMonitor>) -> Self {
        self.monitors.push(monitor);
        self
    }
}

impl CircuitMonitor for CompositeMonitor {
    fn on_broken(&self) {
        self.monitors.iter().for_each(|m| m.on_broken());
    }

    fn on_reset(&self) {
        self.monitors.iter().for_each(|m| m.on_reset());
    }

    fn on_testing(&self) {
        self.monitors.iter().for_each(|m| m.on_testing());
    }
}
