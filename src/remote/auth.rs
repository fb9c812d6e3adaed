//! Bearer token lifecycle for the remote service.
//!
//! Tokens are obtained lazily: [`TokenManager::get_token`] re-authenticates only
//! when the cached [`TokenState`] is missing or older than the validity window
//! minus the refresh margin. There is no background refresh and no
//! de-duplication of concurrent refreshes; a redundant exchange simply
//! overwrites the cache with an equally valid token.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use parking_lot::Mutex;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;

/// How long an issued token is accepted by the remote service.
pub const TOKEN_VALIDITY: SignedDuration = SignedDuration::from_hours(24);

/// Tokens are refreshed this long before they would expire.
pub const TOKEN_REFRESH_MARGIN: SignedDuration = SignedDuration::from_mins(30);

/// Client id/secret pair exchanged for a bearer token.
pub struct Credentials {
    pub client_id: String,
    client_secret: SecretString,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
        }
    }

    pub fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// A cached bearer token and the time it was obtained.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenState {
    pub token: String,
    pub issued_at: Timestamp,
}

impl TokenState {
    pub fn new(token: impl Into<String>, issued_at: Timestamp) -> Self {
        Self {
            token: token.into(),
            issued_at,
        }
    }

    /// Whether the token may still be used at `now`.
    pub fn is_fresh(&self, now: Timestamp, validity: SignedDuration, margin: SignedDuration) -> bool {
        now.duration_since(self.issued_at) <= validity - margin
    }
}

impl fmt::Debug for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenState")
            .field("token", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Backing store for the cached token.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<TokenState>;

    fn store(&self, state: TokenState) -> Result<()>;
}

/// Process-local token cache.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    state: Mutex<Option<TokenState>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: TokenState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<TokenState> {
        self.state.lock().clone()
    }

    fn store(&self, state: TokenState) -> Result<()> {
        *self.state.lock() = Some(state);
        Ok(())
    }
}

/// Token cache persisted in the config file, so it survives restarts.
#[derive(Debug, Clone)]
pub struct ConfigTokenStore {
    path: PathBuf,
}

impl ConfigTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for ConfigTokenStore {
    fn load(&self) -> Option<TokenState> {
        match Config::load_from(&self.path) {
            Ok(config) => config.token,
            Err(e) => {
                tracing::warn!("Failed to read cached token: {e}");
                None
            }
        }
    }

    fn store(&self, state: TokenState) -> Result<()> {
        let mut config = Config::load_from(&self.path)?;
        config.token = Some(state);
        config.save_to(&self.path)
    }
}

/// Performs the credential exchange against the remote service.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Exchange credentials for a bearer token.
    ///
    /// A rejected exchange must surface as `CaseportError::Authentication`.
    async fn authenticate(&self, credentials: &Credentials) -> Result<String>;
}

/// Hands out bearer tokens, refreshing them lazily.
pub struct TokenManager {
    authenticator: Arc<dyn Authenticator>,
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    validity: SignedDuration,
    margin: SignedDuration,
}

impl TokenManager {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            authenticator,
            store,
            clock,
            validity: TOKEN_VALIDITY,
            margin: TOKEN_REFRESH_MARGIN,
        }
    }

    /// Override the validity window and refresh margin.
    pub fn with_validity(mut self, validity: SignedDuration, margin: SignedDuration) -> Self {
        self.validity = validity;
        self.margin = margin;
        self
    }

    /// Return a usable bearer token, authenticating if the cache is stale.
    pub async fn get_token(&self, credentials: &Credentials) -> Result<SecretString> {
        let now = self.clock.now();
        if let Some(state) = self.store.load()
            && state.is_fresh(now, self.validity, self.margin)
        {
            return Ok(SecretString::from(state.token));
        }

        tracing::debug!(client_id = %credentials.client_id, "requesting bearer token");
        let token = self.authenticator.authenticate(credentials).await?;

        // A token that cannot be cached is still valid for this call
        if let Err(e) = self.store.store(TokenState::new(token.clone(), now)) {
            tracing::warn!("Failed to cache bearer token: {e}");
        }

        Ok(SecretString::from(token))
    }
}
