// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Dataflow planning and the resumable scheduler (`spec.md` §4.I, §4.J).

pub mod error;
pub mod eventlog;
pub mod execution_record;
pub mod planner;
pub mod scheduler;
pub mod state;
pub mod state_store;

pub use error::{PlannerError, SchedulerError};
pub use eventlog::{EventLog, EventLogError};
pub use execution_record::{inputs_hash, ExecutionRecord, ExecutionRecordError, ExecutionRecordStore, ProcessLiveness};
pub use planner::{plan, DataflowGraph, PlannedTask};
pub use scheduler::{Scheduler, StartOptions};
pub use state::{DataflowState, StatusSummary, TaskState, WaitOutcome};
pub use state_store::{DataflowStateStore, FileDataflowStateStore, InMemoryDataflowStateStore, StateStoreError};
