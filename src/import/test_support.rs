//! In-memory fakes for engine tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::error::{CaseportError, Result};
use crate::records::RecordSource;
use crate::remote::{
    BulkTestPayload, CollectionKind, CollectionSummary, IssueRelationships, MutationReport,
    TestManagementApi,
};

use super::types::LocalTestRecord;

/// How the fake answers a link mutation for one target.
#[derive(Debug, Clone)]
pub enum TargetBehavior {
    Reject(String),
    Added(usize, Option<String>),
    Delay(Duration),
}

pub struct FakeApi {
    statuses: Mutex<VecDeque<Value>>,
    status_error: Option<String>,
    targets: HashMap<String, TargetBehavior>,
    relationships: std::result::Result<IssueRelationships, String>,
    last_payload: Mutex<Option<Vec<BulkTestPayload>>>,
    submissions: AtomicUsize,
    status_reads: AtomicUsize,
    link_calls: AtomicUsize,
    relationship_reads: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            statuses: Mutex::new(VecDeque::from([json!({
                "status": "successful",
                "result": {"issues": [{"id": "10100", "key": "QA-12"}]}
            })])),
            status_error: None,
            targets: HashMap::new(),
            relationships: Ok(IssueRelationships::default()),
            last_payload: Mutex::new(None),
            submissions: AtomicUsize::new(0),
            status_reads: AtomicUsize::new(0),
            link_calls: AtomicUsize::new(0),
            relationship_reads: AtomicUsize::new(0),
        }
    }

    /// Status payloads returned in order; the last one repeats.
    pub fn with_statuses(self, statuses: Vec<Value>) -> Self {
        *self.statuses.lock() = statuses.into();
        self
    }

    /// Every status read fails with an API error.
    pub fn with_status_error(mut self, message: &str) -> Self {
        self.status_error = Some(message.to_string());
        self
    }

    pub fn with_target(mut self, target: &str, behavior: TargetBehavior) -> Self {
        self.targets.insert(target.to_string(), behavior);
        self
    }

    pub fn with_relationships(mut self, relationships: IssueRelationships) -> Self {
        self.relationships = Ok(relationships);
        self
    }

    pub fn with_relationships_error(mut self, message: &str) -> Self {
        self.relationships = Err(message.to_string());
        self
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn status_reads(&self) -> usize {
        self.status_reads.load(Ordering::SeqCst)
    }

    pub fn link_calls(&self) -> usize {
        self.link_calls.load(Ordering::SeqCst)
    }

    pub fn relationship_reads(&self) -> usize {
        self.relationship_reads.load(Ordering::SeqCst)
    }

    pub fn last_payload(&self) -> Option<Vec<BulkTestPayload>> {
        self.last_payload.lock().clone()
    }

    async fn mutate(&self, targets: &[&str], default: MutationReport) -> Result<MutationReport> {
        self.link_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = targets.iter().find_map(|t| self.targets.get(*t)).cloned();
        match behavior {
            Some(TargetBehavior::Reject(message)) => Err(CaseportError::Api(message)),
            Some(TargetBehavior::Added(count, warning)) => Ok(MutationReport {
                added: Some(count),
                warnings: warning.into_iter().collect(),
            }),
            Some(TargetBehavior::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(default)
            }
            None => Ok(default),
        }
    }
}

#[async_trait]
impl TestManagementApi for FakeApi {
    async fn submit_bulk(&self, payload: &[BulkTestPayload]) -> Result<String> {
        let n = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_payload.lock() = Some(payload.to_vec());
        Ok(format!("job-{n}"))
    }

    async fn job_status(&self, _job_id: &str) -> Result<Value> {
        self.status_reads.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.status_error {
            return Err(CaseportError::Api(message.clone()));
        }
        let mut statuses = self.statuses.lock();
        let status = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        Ok(status.unwrap_or_else(|| json!({"status": "pending"})))
    }

    async fn add_test_to_plan(&self, plan_id: &str, _issue_id: &str) -> Result<MutationReport> {
        self.mutate(&[plan_id], MutationReport::added(1)).await
    }

    async fn add_test_to_execution(
        &self,
        execution_id: &str,
        _issue_id: &str,
    ) -> Result<MutationReport> {
        self.mutate(&[execution_id], MutationReport::added(1)).await
    }

    async fn add_test_to_set(&self, set_id: &str, _issue_id: &str) -> Result<MutationReport> {
        self.mutate(&[set_id], MutationReport::added(1)).await
    }

    async fn add_test_to_folder(
        &self,
        _project_id: u64,
        path: &str,
        _issue_id: &str,
    ) -> Result<MutationReport> {
        self.mutate(&[path], MutationReport::default()).await
    }

    async fn add_preconditions(
        &self,
        _issue_id: &str,
        precondition_ids: &[String],
    ) -> Result<MutationReport> {
        let targets: Vec<&str> = precondition_ids.iter().map(String::as_str).collect();
        self.mutate(&targets, MutationReport::added(precondition_ids.len())).await
    }

    async fn fetch_relationships(&self, _issue_id: &str) -> Result<IssueRelationships> {
        self.relationship_reads.fetch_add(1, Ordering::SeqCst);
        self.relationships.clone().map_err(CaseportError::Api)
    }

    async fn list_collection(
        &self,
        kind: CollectionKind,
        project_key: &str,
        _limit: u32,
    ) -> Result<Vec<CollectionSummary>> {
        Ok(vec![CollectionSummary {
            issue_id: "20000".to_string(),
            key: Some(format!("{project_key}-1")),
            summary: Some(format!("First {}", kind.noun())),
        }])
    }

    async fn list_folders(&self, _project_id: u64) -> Result<Vec<String>> {
        Ok(vec!["/".to_string(), "/Smoke".to_string()])
    }
}

/// Record source backed by a map.
#[derive(Default)]
pub struct FakeRecords {
    records: HashMap<String, LocalTestRecord>,
}

impl FakeRecords {
    pub fn with(id: &str, record: LocalTestRecord) -> Self {
        let mut records = HashMap::new();
        records.insert(id.to_string(), record);
        Self { records }
    }
}

impl RecordSource for FakeRecords {
    fn load(&self, id: &str) -> Result<LocalTestRecord> {
        self.records
            .get(id)
            .cloned()
            .ok_or_else(|| CaseportError::RecordNotFound(id.to_string()))
    }
}
