//! # Shared Bus - In-Memory Topic Transport
//!
//! A single-process stand-in for a hosted pub/sub service, used by the
//! runtime demos and the integration tests.
//!
//! ## Delivery Model
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐   subscribe()   ┌──────────────┐
//! │  Publisher   │ ────────────► │    Topic     │ ──────────────► │ Subscription │
//! │ (stamps type │               │  (fan-out)   │                 │  peek-lock   │
//! │  + corr. id) │               └──────────────┘                 └──────┬───────┘
//! └──────────────┘                                                       │
//!                                   complete / abandon / dead_letter ◄───┘
//! ```
//!
//! - **Peek-lock:** a received message is invisible until its lock expires
//! - **Redelivery:** an expired or abandoned message comes back with a higher
//!   delivery count and a new lock token
//! - **Dead letters:** explicit requests and messages over the delivery limit
//!   keep their original properties

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

use std::time::Duration;

pub mod publisher;
pub mod subscriber;
pub mod topic;

// Re-export main types
pub use publisher::{
    CorrelationIdProvider, EventPublisher, FixedCorrelationId, PublishError, RandomCorrelationId,
    TopicPublisher,
};
pub use subscriber::{DeadLetter, DeadLetterReason, Subscription, SubscriptionOptions};
pub use topic::InMemoryTopic;

/// Lock held on a received message before it becomes visible again.
pub const DEFAULT_LOCK_DURATION: Duration = Duration::from_secs(30);

/// Deliveries allowed before a message is dead-lettered.
pub const DEFAULT_MAX_DELIVERY_COUNT: u32 = 10;
