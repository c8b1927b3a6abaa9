#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Background refresh of country records.
//!
//! [`queue::RefreshQueue`] holds the pending set and runs at most one drain
//! task that fetches countries one at a time with a fixed gap between
//! requests. [`scheduler::Scheduler`] periodically re-enqueues every country
//! the store already knows about.

pub mod queue;
pub mod scheduler;

pub use queue::{RefreshOptions, RefreshQueue};
pub use scheduler::Scheduler;

/// Errors that can occur while setting up background refresh.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The queue was built outside a Tokio runtime.
    #[error("No Tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
