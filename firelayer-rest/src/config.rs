//! Connection settings for the REST client.
//!
//! Settings come either from code ([`RestConfig::new`], [`RestConfig::for_project`]) or from
//! the environment ([`RestConfig::from_env`]), after loading a `.env` file if one exists:
//!
//! | variable | meaning |
//! |---|---|
//! | `FIREBASE_DATABASE_URL` | database base URL |
//! | `FIREBASE_PROJECT_ID` | used for `https://<project>.firebaseio.com` when no URL is set |
//! | `FIREBASE_AUTH_TOKEN` | database secret or ID token, sent as `auth=` |
//! | `FIREBASE_ACCESS_TOKEN` | OAuth2 access token, sent as `access_token=` |
//! | `FIREBASE_TIMEOUT_MS` | default per-request timeout |

use serde::{Deserialize, Serialize};
use std::{env, time::Duration};
use thiserror::Error;

use firelayer_core::error::ConnectorError;

use crate::credential::{Credential, StaticCredential};

/// Invalid or missing connection settings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("neither FIREBASE_DATABASE_URL nor FIREBASE_PROJECT_ID is set")]
    MissingDatabase,
    #[error("{0} is not a valid database URL: {1}")]
    InvalidUrl(String, String),
    #[error("FIREBASE_TIMEOUT_MS must be a number of milliseconds, got {0:?}")]
    InvalidTimeout(String),
}

impl From<ConfigError> for ConnectorError {
    fn from(err: ConfigError) -> Self {
        ConnectorError::Initialization(err.to_string())
    }
}

/// Settings of a [`RestStore`](crate::RestStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestConfig {
    /// Base URL of the database, without a trailing `.json` path.
    pub database_url: String,
    /// Database secret or Firebase ID token.
    #[serde(default, skip_serializing)]
    pub auth_token: Option<String>,
    /// OAuth2 access token; takes precedence over `auth_token`.
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
    /// Timeout for requests whose call context carries none.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl RestConfig {
    /// Settings for the database at `database_url`, without credentials.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            auth_token: None,
            access_token: None,
            timeout_ms: None,
        }
    }

    /// Settings for the default database of a project.
    pub fn for_project(project_id: &str) -> Self {
        Self::new(format!("https://{project_id}.firebaseio.com"))
    }

    /// Reads the settings from the environment, loading `.env` first (silently ignored if
    /// missing).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if no database is configured or the timeout is not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(env_opt)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match (lookup("FIREBASE_DATABASE_URL"), lookup("FIREBASE_PROJECT_ID")) {
            (Some(url), _) => Self::new(url),
            (None, Some(project_id)) => Self::for_project(&project_id),
            (None, None) => return Err(ConfigError::MissingDatabase),
        };

        config.auth_token = lookup("FIREBASE_AUTH_TOKEN");
        config.access_token = lookup("FIREBASE_ACCESS_TOKEN");
        config.timeout_ms = lookup("FIREBASE_TIMEOUT_MS")
            .map(|raw| raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidTimeout(raw)))
            .transpose()?;

        Ok(config)
    }

    /// Sets the OAuth2 access token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Sets the database secret or ID token.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Sets the default request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// The default request timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// The static credential configured, if any. An access token wins over an auth token.
    pub fn credential(&self) -> Option<StaticCredential> {
        self.access_token
            .clone()
            .map(Credential::AccessToken)
            .or_else(|| self.auth_token.clone().map(Credential::IdToken))
            .map(StaticCredential::new)
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}
