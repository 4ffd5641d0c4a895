//! Sluice Trigger
//!
//! Triggers watch a remote operation on behalf of a deferred task. The task
//! hands a trigger to the scheduling layer and releases its worker; the
//! scheduler runs the trigger, which reports a single terminal
//! [`TriggerEvent`] used to resume the task.

mod transfer_run;
mod types;

pub use transfer_run::TransferRunTrigger;
pub use types::{Trigger, TriggerDescriptor, TriggerError, TriggerEvent, TriggerStatus};
