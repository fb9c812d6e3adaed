//! HTTP client for the remote test-management service.
//!
//! Every request carries a bearer token obtained through [`TokenManager`]. The
//! Authorization header is wrapped in [`RedactedHeader`] so the token never
//! shows up in formatted output, even with reqwest debug logging enabled.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, header};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use url::Url;

use crate::config::Config;
use crate::error::{CaseportError, Result};

use super::TestManagementApi;
use super::auth::{
    Authenticator, Clock, ConfigTokenStore, Credentials, SystemClock, TokenManager, TokenStore,
};
use super::error::{ApiError, Endpoint};
use super::graphql::{self, READ_LIMIT};
use super::types::{
    BulkTestPayload, CollectionKind, CollectionSummary, IssueRelationships, MutationReport,
};

/// Timeout for queries, status reads and the token exchange.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the bulk submission, which can carry large payloads.
pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Wrapper for sensitive header values that redacts the value when formatted.
struct RedactedHeader {
    value: String,
}

impl RedactedHeader {
    fn bearer(token: &str) -> Self {
        Self {
            value: format!("Bearer {token}"),
        }
    }

    fn as_header_value(&self) -> Result<header::HeaderValue> {
        let mut value = header::HeaderValue::from_str(&self.value).map_err(|_| {
            CaseportError::Authentication("bearer token is not a valid header value".to_string())
        })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Display for RedactedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Debug for RedactedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedactedHeader")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url)?;
    if url.cannot_be_a_base() {
        return Err(CaseportError::Config(format!(
            "base_url '{base_url}' cannot be used as a base URL"
        )));
    }
    Ok(url)
}

/// Append path segments to the base URL, keeping its existing path.
fn join_endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| CaseportError::Config(format!("base_url '{base}' cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn build_http_client() -> Result<Client> {
    Ok(Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?)
}

/// Credential exchange over `POST {base}/authenticate`.
pub struct HttpAuthenticator {
    client: Client,
    url: Url,
}

impl HttpAuthenticator {
    pub fn new(client: Client, base_url: &Url) -> Result<Self> {
        Ok(Self {
            client,
            url: join_endpoint(base_url, &["authenticate"])?,
        })
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<String> {
        let body = json!({
            "client_id": credentials.client_id,
            "client_secret": credentials.client_secret().expose_secret(),
        });

        let response = self
            .client
            .post(self.url.clone())
            .timeout(QUERY_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_response(status, &text, Endpoint::Authenticate).into());
        }

        // The token comes back as a JSON string literal; tolerate bare text too
        let token = serde_json::from_str::<String>(&text)
            .unwrap_or_else(|_| text.trim().trim_matches('"').to_string());
        if token.is_empty() {
            return Err(CaseportError::Authentication(
                "authentication returned an empty token".to_string(),
            ));
        }
        Ok(token)
    }
}

/// Authenticated client for the bulk import, job status and GraphQL endpoints.
pub struct RemoteClient {
    client: Client,
    base_url: Url,
    tokens: TokenManager,
    credentials: Credentials,
}

impl RemoteClient {
    /// Build a client from configuration, caching tokens in the config file.
    pub fn from_config(config: &Config) -> Result<Self> {
        let credentials = config.credentials()?;
        let store = Arc::new(ConfigTokenStore::new(Config::config_path()));
        Self::new(&config.base_url, credentials, store, Arc::new(SystemClock))
    }

    pub fn new(
        base_url: &str,
        credentials: Credentials,
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let client = build_http_client()?;
        let authenticator = Arc::new(HttpAuthenticator::new(client.clone(), &base_url)?);

        Ok(Self {
            client,
            base_url,
            tokens: TokenManager::new(authenticator, store, clock),
            credentials,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        join_endpoint(&self.base_url, segments)
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.tokens.get_token(&self.credentials).await?;
        let auth_header = RedactedHeader::bearer(token.expose_secret());
        Ok(request.header(header::AUTHORIZATION, auth_header.as_header_value()?))
    }

    async fn send_json(&self, request: RequestBuilder, endpoint: Endpoint) -> Result<Value> {
        let response = self.authorized(request).await?.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_response(status, &text, endpoint).into());
        }
        serde_json::from_str(&text).map_err(|e| {
            ApiError::new(format!("unexpected response body: {e}"), endpoint).into()
        })
    }

    /// Run a GraphQL document and decode its `data` member.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        document: &str,
        variables: Value,
    ) -> Result<T> {
        let url = self.endpoint(&["graphql"])?;
        let body = json!({ "query": document, "variables": variables });
        let request = self.client.post(url).timeout(QUERY_TIMEOUT).json(&body);
        let raw = self.send_json(request, Endpoint::GraphQl).await?;

        let response: cynic::GraphQlResponse<Value> = serde_json::from_value(raw)?;
        if let Some(first) = response.errors.and_then(|errors| errors.into_iter().next()) {
            return Err(CaseportError::GraphQl(first.message));
        }

        let data = response
            .data
            .filter(|d| !d.is_null())
            .ok_or_else(|| CaseportError::Api("graphql response carried no data".to_string()))?;
        serde_json::from_value(data)
            .map_err(|e| CaseportError::Api(format!("unexpected graphql response shape: {e}")))
    }

    async fn add_tests<T: DeserializeOwned>(
        &self,
        document: &str,
        collection_id: &str,
        issue_id: &str,
    ) -> Result<T> {
        let variables = json!({ "issueId": collection_id, "testIssueIds": [issue_id] });
        self.execute(document, variables).await
    }
}

#[async_trait]
impl TestManagementApi for RemoteClient {
    async fn submit_bulk(&self, payload: &[BulkTestPayload]) -> Result<String> {
        let url = self.endpoint(&["import", "test", "bulk"])?;
        let request = self.client.post(url).timeout(SUBMIT_TIMEOUT).json(payload);
        let body = self.send_json(request, Endpoint::BulkImport).await?;

        let job_id = match body.get("jobId") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(CaseportError::Submission(format!(
                    "bulk import response carried no job id: {body}"
                )));
            }
        };
        tracing::debug!(%job_id, tests = payload.len(), "bulk import accepted");
        Ok(job_id)
    }

    async fn job_status(&self, job_id: &str) -> Result<Value> {
        let url = self.endpoint(&["import", "test", "bulk", job_id, "status"])?;
        let request = self.client.get(url).timeout(QUERY_TIMEOUT);
        self.send_json(request, Endpoint::JobStatus).await
    }

    async fn add_test_to_plan(&self, plan_id: &str, issue_id: &str) -> Result<MutationReport> {
        let data: graphql::AddTestsToTestPlanData = self
            .add_tests(graphql::ADD_TESTS_TO_TEST_PLAN, plan_id, issue_id)
            .await?;
        Ok(data.add_tests_to_test_plan.into())
    }

    async fn add_test_to_execution(
        &self,
        execution_id: &str,
        issue_id: &str,
    ) -> Result<MutationReport> {
        let data: graphql::AddTestsToTestExecutionData = self
            .add_tests(graphql::ADD_TESTS_TO_TEST_EXECUTION, execution_id, issue_id)
            .await?;
        Ok(data.add_tests_to_test_execution.into())
    }

    async fn add_test_to_set(&self, set_id: &str, issue_id: &str) -> Result<MutationReport> {
        let data: graphql::AddTestsToTestSetData = self
            .add_tests(graphql::ADD_TESTS_TO_TEST_SET, set_id, issue_id)
            .await?;
        Ok(data.add_tests_to_test_set.into())
    }

    async fn add_test_to_folder(
        &self,
        project_id: u64,
        path: &str,
        issue_id: &str,
    ) -> Result<MutationReport> {
        let variables = json!({
            "projectId": project_id.to_string(),
            "path": path,
            "testIssueIds": [issue_id],
        });
        let data: graphql::AddTestsToFolderData = self
            .execute(graphql::ADD_TESTS_TO_FOLDER, variables)
            .await?;
        Ok(data.add_tests_to_folder.into())
    }

    async fn add_preconditions(
        &self,
        issue_id: &str,
        precondition_ids: &[String],
    ) -> Result<MutationReport> {
        let variables = json!({
            "issueId": issue_id,
            "preconditionIssueIds": precondition_ids,
        });
        let data: graphql::AddPreconditionsToTestData = self
            .execute(graphql::ADD_PRECONDITIONS_TO_TEST, variables)
            .await?;
        Ok(data.add_preconditions_to_test.into())
    }

    async fn fetch_relationships(&self, issue_id: &str) -> Result<IssueRelationships> {
        let variables = json!({ "issueId": issue_id, "limit": READ_LIMIT });
        let data: graphql::GetTestData = self
            .execute(graphql::GET_TEST_RELATIONSHIPS, variables)
            .await?;
        let node = data.get_test.ok_or_else(|| {
            CaseportError::Api(format!("test {issue_id} was not found remotely"))
        })?;
        Ok(node.into())
    }

    async fn list_collection(
        &self,
        kind: CollectionKind,
        project_key: &str,
        limit: u32,
    ) -> Result<Vec<CollectionSummary>> {
        let (document, root) = graphql::collection_query(kind);
        let variables = json!({ "jql": graphql::project_jql(project_key), "limit": limit });
        let mut data: Value = self.execute(document, variables).await?;

        let page = match data.get_mut(root).map(Value::take) {
            Some(Value::Null) | None => return Ok(Vec::new()),
            Some(page) => page,
        };
        let page: graphql::CollectionPage = serde_json::from_value(page)
            .map_err(|e| CaseportError::Api(format!("unexpected {root} response shape: {e}")))?;
        Ok(page.results.into_iter().map(CollectionSummary::from).collect())
    }

    async fn list_folders(&self, project_id: u64) -> Result<Vec<String>> {
        let variables = json!({ "projectId": project_id.to_string(), "path": "/" });
        let data: graphql::GetFolderData = self.execute(graphql::GET_FOLDER, variables).await?;
        Ok(data
            .get_folder
            .map(|tree| graphql::flatten_folder_paths(&tree))
            .unwrap_or_default())
    }
}
