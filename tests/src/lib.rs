//! # Courier Test Suite
//!
//! Scenario tests that run the subscriber pipeline against the in-memory
//! transport.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs          # Events, scripted handlers, monitors, wiring
//! └── integration/
//!     ├── circuit_breaking.rs
//!     ├── rate_limiting.rs
//!     ├── poison_messages.rs
//!     ├── non_transient.rs
//!     └── shutdown.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p courier-tests
//!
//! # One scenario
//! cargo test -p courier-tests integration::circuit_breaking::
//! ```

#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
