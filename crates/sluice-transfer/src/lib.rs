//! Sluice Transfer
//!
//! This crate provides the client capability for the managed data transfer
//! service: scheduled transfer configurations that load data into a warehouse
//! dataset, and the manual runs started against them.
//!
//! The [`TransferClient`] trait is the seam operators depend on. Two
//! implementations ship here:
//! - [`HttpTransferClient`] talks to the service's REST API
//! - [`InMemoryTransferClient`] records calls and returns scripted responses
//!
//! [`wait_for_terminal_run`] polls a run until it reaches a terminal state and
//! is shared by synchronous operators and deferral triggers.

mod client;
mod error;
mod http;
mod memory;
mod resource;
mod types;
mod wait;

pub use client::TransferClient;
pub use error::ClientError;
pub use http::{HttpTransferClient, disable_auto_scheduling};
pub use memory::{CallKind, InMemoryTransferClient, RecordedCall};
pub use resource::{object_id, parent, run_name, transfer_config_name};
pub use types::{
  CallOptions, CreateConfigRequest, DeleteConfigRequest, GetRunRequest, RetryConfig, RetryPolicy,
  RunStatus, ScheduleOptions, StartRunsRequest, StartRunsResponse, TimeFilter, TimeRange,
  TransferConfig, TransferRun, TransferState,
};
pub use wait::wait_for_terminal_run;
