//! Remote test-management service access.
//!
//! [`TestManagementApi`] is the seam between the import workflow and the
//! network: the orchestrator only ever talks to this trait, and
//! [`client::RemoteClient`] implements it over HTTP.

pub mod auth;
pub mod client;
pub mod error;
pub mod graphql;
pub mod types;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use auth::{Credentials, TokenManager, TokenState};
pub use client::RemoteClient;
pub use error::{ApiError, Endpoint};
pub use types::{
    BulkTestPayload, CollectionKind, CollectionSummary, IssueRelationships, MutationReport,
};

/// Operations the import workflow needs from the remote service.
#[async_trait]
pub trait TestManagementApi: Send + Sync {
    /// Submit tests for bulk creation. Returns the job id.
    async fn submit_bulk(&self, payload: &[BulkTestPayload]) -> Result<String>;

    /// Read the raw status payload of a bulk import job.
    async fn job_status(&self, job_id: &str) -> Result<Value>;

    async fn add_test_to_plan(&self, plan_id: &str, issue_id: &str) -> Result<MutationReport>;

    async fn add_test_to_execution(
        &self,
        execution_id: &str,
        issue_id: &str,
    ) -> Result<MutationReport>;

    async fn add_test_to_set(&self, set_id: &str, issue_id: &str) -> Result<MutationReport>;

    /// Place a test into the repository folder at `path`.
    async fn add_test_to_folder(
        &self,
        project_id: u64,
        path: &str,
        issue_id: &str,
    ) -> Result<MutationReport>;

    /// Attach preconditions to a test in a single call.
    async fn add_preconditions(
        &self,
        issue_id: &str,
        precondition_ids: &[String],
    ) -> Result<MutationReport>;

    /// Read back the relationships currently stored for a test.
    async fn fetch_relationships(&self, issue_id: &str) -> Result<IssueRelationships>;

    /// List collections of `kind` in a project.
    async fn list_collection(
        &self,
        kind: CollectionKind,
        project_key: &str,
        limit: u32,
    ) -> Result<Vec<CollectionSummary>>;

    /// List repository folder paths of a project, parents first.
    async fn list_folders(&self, project_id: u64) -> Result<Vec<String>>;
}
