//! Sluice Runner
//!
//! A local scheduling layer for operators. [`TaskRunner`] executes an
//! operator, and when the operator defers it takes over the deferral: the
//! trigger runs on its own tokio task, and once it reports an outcome the
//! runner calls the operator's named resumption point with the event.
//!
//! Progress is reported through [`ExecutionNotifier`].

mod error;
mod events;
mod queue;
mod runner;

pub use error::RunnerError;
pub use events::{ChannelNotifier, ExecutionNotifier, NoopNotifier, TaskEvent};
pub use queue::DeferralQueue;
pub use runner::{TaskRunResult, TaskRunner};
