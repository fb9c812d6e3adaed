//! Top-level application configuration.
//!
//! Configuration is stored in `.caseport/config.yaml` and includes:
//! - The base URL of the remote test-management service
//! - Client credentials for the token exchange
//! - The cached bearer token, so restarts do not re-authenticate
//! - Job polling settings

use std::env;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CaseportError, Result};
use crate::import::poller::{DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL, PollOptions};
use crate::remote::auth::{Credentials, TokenState};

/// Directory holding configuration and local records.
pub const CASEPORT_DIR: &str = ".caseport";

/// Environment variable overriding [`CASEPORT_DIR`].
pub const CASEPORT_ROOT_ENV: &str = "CASEPORT_ROOT";

pub const CLIENT_ID_ENV: &str = "CASEPORT_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "CASEPORT_CLIENT_SECRET";

pub const DEFAULT_BASE_URL: &str = "https://xray.cloud.getxray.app/api/v2";

/// Root directory for caseport state, honouring `CASEPORT_ROOT`.
pub fn caseport_root() -> PathBuf {
    match env::var(CASEPORT_ROOT_ENV) {
        Ok(root) if !root.is_empty() => PathBuf::from(root),
        _ => PathBuf::from(CASEPORT_DIR),
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the remote API (e.g. `https://host/api/v2`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Client credentials
    #[serde(default)]
    pub auth: AuthConfig,

    /// Cached bearer token, written by the token store only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenState>,

    /// Job polling configuration
    #[serde(default, skip_serializing_if = "PollConfig::is_default")]
    pub poll: PollConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth: AuthConfig::default(),
            token: None,
            poll: PollConfig::default(),
        }
    }
}

/// Client id/secret pair used for the token exchange
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Job polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Number of status reads before giving up (default: 30)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between status reads in milliseconds (default: 2000)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl PollConfig {
    /// Check if this config has default values
    pub fn is_default(&self) -> bool {
        self.max_attempts == default_max_attempts() && self.interval_ms == default_interval_ms()
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> PathBuf {
        caseport_root().join("config.yaml")
    }

    /// Load configuration from the default path, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, or return default if not found
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            CaseportError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config at {}: {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                CaseportError::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create directory for config at {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        let content = serde_yaml_ng::to_string(self)?;
        let write_error = |e: io::Error| {
            CaseportError::Io(io::Error::new(
                e.kind(),
                format!("Failed to write config at {}: {}", path.display(), e),
            ))
        };

        // Credentials and the cached token live here: owner read/write only
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path).map_err(write_error)?;

        // The creation mode does not apply to a file that already existed
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| {
                    CaseportError::Io(io::Error::new(
                        e.kind(),
                        format!(
                            "Failed to set permissions on config at {}: {}",
                            path.display(),
                            e
                        ),
                    ))
                })?;
        }

        file.write_all(content.as_bytes()).map_err(write_error)?;

        Ok(())
    }

    /// Get the client id from the environment or config file
    pub fn client_id(&self) -> Option<String> {
        if let Ok(id) = env::var(CLIENT_ID_ENV)
            && !id.is_empty()
        {
            return Some(id);
        }
        self.auth.client_id.clone()
    }

    /// Get the client secret from the environment or config file
    pub fn client_secret(&self) -> Option<String> {
        if let Ok(secret) = env::var(CLIENT_SECRET_ENV)
            && !secret.is_empty()
        {
            return Some(secret);
        }
        self.auth.client_secret.clone()
    }

    /// Build the credentials for the token exchange
    pub fn credentials(&self) -> Result<Credentials> {
        let client_id = self.client_id().ok_or_else(|| {
            CaseportError::Config(format!(
                "client id not configured. Set {CLIENT_ID_ENV} or run: caseport config set auth.client_id <id>"
            ))
        })?;
        let client_secret = self.client_secret().ok_or_else(|| {
            CaseportError::Config(format!(
                "client secret not configured. Set {CLIENT_SECRET_ENV} or run: caseport config set auth.client_secret <secret>"
            ))
        })?;
        Ok(Credentials::new(client_id, client_secret))
    }

    /// Set the client id. A token issued for other credentials is dropped.
    pub fn set_client_id(&mut self, client_id: String) {
        self.auth.client_id = Some(client_id);
        self.token = None;
    }

    /// Set the client secret. A token issued for other credentials is dropped.
    pub fn set_client_secret(&mut self, client_secret: String) {
        self.auth.client_secret = Some(client_secret);
        self.token = None;
    }

    /// Set the base URL after checking it parses.
    pub fn set_base_url(&mut self, base_url: &str) -> Result<()> {
        let parsed = url::Url::parse(base_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CaseportError::Config(format!(
                "base_url must be an http(s) URL, got '{base_url}'"
            )));
        }
        self.base_url = base_url.trim_end_matches('/').to_string();
        self.token = None;
        Ok(())
    }

    /// Polling options for the import job
    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            max_attempts: self.poll.max_attempts,
            interval: Duration::from_millis(self.poll.interval_ms),
        }
    }
}
