//! Hexagonal ports
//!
//! - Outbound: transport, monitoring and statistics collaborators

pub mod outbound;

pub use outbound::{
    CircuitMonitor, MessageReceiver, MessageSource, ProcessingOutcome, StatisticsReporter,
};
