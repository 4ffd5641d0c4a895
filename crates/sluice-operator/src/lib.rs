//! Sluice Operator
//!
//! Operators are the units of work a workflow runs against the data transfer
//! service. Each one triggers a single remote operation, obtains or awaits
//! its result, and publishes a sanitized summary into the run's exchange.
//!
//! - [`CreateTransferConfigOperator`] creates a config and publishes its id
//! - [`DeleteTransferConfigOperator`] deletes a config
//! - [`StartTransferRunsOperator`] starts manual runs and either polls them
//!   to completion or defers to a trigger
//!
//! Operators reach the outside world only through injected capabilities: a
//! [`TransferClient`](sluice_transfer::TransferClient) at construction, and
//! the exchange and [`Scheduler`] carried by the [`TaskContext`].

mod context;
mod create;
mod delete;
mod error;
mod operator;
mod sanitize;
mod start_runs;

pub use context::{Deferral, Scheduler, SchedulerError, TaskContext};
pub use create::{CreateTransferConfigOperator, TRANSFER_CONFIG_ID_KEY};
pub use delete::DeleteTransferConfigOperator;
pub use error::OperatorError;
pub use operator::{Operator, TaskOutcome};
pub use sanitize::{SENSITIVE_KEYS, strip_sensitive};
pub use start_runs::{
  DEFAULT_POLL_INTERVAL, RESUME_METHOD, RUN_ID_KEY, RunPhase, StartTransferRunsOperator,
};
