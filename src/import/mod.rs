//! Import-and-link engine.
//!
//! One run turns a locally stored record into a remote test:
//!
//! 1. [`payload`] builds the bulk-create payload and submits it
//! 2. [`poller`] waits for the asynchronous job to produce the issue
//! 3. [`linker`] attaches the issue to plans, executions, sets, a folder and
//!    preconditions, concurrently and with per-link failure isolation
//! 4. [`validator`] reads the issue back and reconciles what exists remotely
//!
//! [`orchestrator::ImportOrchestrator`] drives the sequence and reports
//! progress through [`progress`].

pub mod linker;
pub mod orchestrator;
pub mod payload;
pub mod poller;
pub mod progress;
pub mod types;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_support;

pub use orchestrator::ImportOrchestrator;
pub use poller::PollOptions;
pub use progress::{NoProgress, ProgressObserver, ProgressStep, StepState};
pub use types::{
    LinkOutcome, LinkRequest, LinkTargetKind, LinkingReport, LocalTestRecord,
    OrchestrationResult, ReconciliationResult, RemoteIssueRef, TestStep,
};
