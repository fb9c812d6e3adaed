use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaseportError {
    // Fatal orchestration errors
    #[error("authentication error: {0}")]
    Authentication(String),

    #[error("bulk import submission failed: {0}")]
    Submission(String),

    #[error("import job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    #[error(
        "import job {job_id} did not finish after {attempts} status checks; \
         the test may still be created remotely"
    )]
    JobTimeout { job_id: String, attempts: u32 },

    #[error("operation cancelled")]
    Cancelled,

    // Remote errors
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    // Local errors
    #[error("record '{0}' not found")]
    RecordNotFound(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CaseportError {
    /// Whether the remote side may have created the test despite this error.
    pub fn issue_may_exist(&self) -> bool {
        matches!(self, CaseportError::JobTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, CaseportError>;
