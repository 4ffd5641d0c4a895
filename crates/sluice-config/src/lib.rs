//! Sluice Config
//!
//! Serializable task definitions for sluice. A task file names one operator
//! and its arguments, plus optional settings for the client the operator
//! talks to:
//!
//! ```json
//! {
//!   "operator": "start_transfer_runs",
//!   "task_id": "start",
//!   "project_id": "my-project",
//!   "transfer_config_id": "1a2b3c",
//!   "deferrable": true
//! }
//! ```
//!
//! [`TaskFile::from_json`] parses and validates a file, and
//! [`TaskDef::build`] turns the definition into a runnable operator.

mod call;
mod error;
mod settings;
mod task;

pub use call::{CallDef, RetryDef};
pub use error::ConfigError;
pub use settings::{ClientSettings, DEFAULT_ACCESS_TOKEN_ENV, DEFAULT_ENDPOINT};
pub use task::{CreateConfigDef, DeleteConfigDef, StartRunsDef, TaskDef, TaskFile};
