//! `Foo` event and its handler.

use super::{EXTERNAL_PROVIDER_OFFLINE, SAMPLE_PERMANENT, SAMPLE_TRANSIENT};
use async_trait::async_trait;
use courier_subscriber::{EventHandler, HandlerError};
use serde::{Deserialize, Serialize};
use shared_types::{Event, Message};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Demo event published by the runtime's publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Foo {
    pub seq: u64,
}

impl Event for Foo {
    const MESSAGE_TYPE: &'static str = "Contract.Foo";
}

impl fmt::Display for Foo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Foo #{}", self.seq)
    }
}

/// Which sequence numbers fail, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePlan {
    /// Every message succeeds.
    Never,
    /// Out of every `period` messages, the first `outage` find the provider
    /// offline.
    ProviderOffline { period: u64, outage: u64 },
    /// Multiples of 3 fail transiently, other multiples of 5 permanently.
    Mixed,
}

impl FailurePlan {
    pub fn check(&self, seq: u64) -> Result<(), HandlerError> {
        match *self {
            Self::Never => Ok(()),
            Self::ProviderOffline { period, outage } => {
                if period > 0 && seq % period < outage {
                    Err(HandlerError::new(
                        EXTERNAL_PROVIDER_OFFLINE,
                        "payment provider is not answering",
                    ))
                } else {
                    Ok(())
                }
            }
            Self::Mixed => {
                if seq % 3 == 0 {
                    Err(HandlerError::new(SAMPLE_TRANSIENT, "try again later"))
                } else if seq % 5 == 0 {
                    Err(HandlerError::new(SAMPLE_PERMANENT, "cannot ever succeed"))
                } else {
                    Ok(())
                }
            }
        }
    }
}

pub struct FooHandler {
    plan: FailurePlan,
    handled: AtomicU64,
}

impl FooHandler {
    pub fn new(plan: FailurePlan) -> Self {
        Self {
            plan,
            handled: AtomicU64::new(0),
        }
    }

    /// Calls that returned without error.
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventHandler for FooHandler {
    type Event = Foo;

    async fn handle(&self, event: Foo, message: &Message) -> Result<(), HandlerError> {
        info!(
            correlation_id = message.correlation_id_or_null(),
            delivery_count = message.delivery_count(),
            "Handling: {event}"
        );
        self.plan.check(event.seq)?;
        self.handled.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
