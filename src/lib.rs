pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod import;
pub mod logging;
pub mod records;
pub mod remote;

pub use config::Config;
pub use error::{CaseportError, Result};
pub use import::{
    ImportOrchestrator, LinkOutcome, LinkRequest, LinkingReport, LocalTestRecord,
    OrchestrationResult, PollOptions, ProgressObserver, ProgressStep, ReconciliationResult,
    RemoteIssueRef, StepState,
};
pub use records::{RecordSource, RecordStore};
pub use remote::{RemoteClient, TestManagementApi};
