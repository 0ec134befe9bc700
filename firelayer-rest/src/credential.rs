//! Credentials attached to REST requests.
//!
//! The REST protocol takes credentials as a query parameter: database secrets and Firebase ID
//! tokens as `auth=`, OAuth2 access tokens as `access_token=`. Token minting and refresh are
//! left to the caller; implement [`CredentialProvider`] to hand the store fresh tokens.

use async_trait::async_trait;
use std::fmt::Debug;

use firelayer_core::error::ConnectorResult;

/// A token the database accepts.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Database secret or Firebase ID token.
    IdToken(String),
    /// Google OAuth2 access token.
    AccessToken(String),
}

impl Credential {
    /// The query parameter carrying this credential.
    pub fn query_pair(&self) -> (&'static str, &str) {
        match self {
            Credential::IdToken(token) => ("auth", token.as_str()),
            Credential::AccessToken(token) => ("access_token", token.as_str()),
        }
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::IdToken(_) => f.write_str("IdToken(..)"),
            Credential::AccessToken(_) => f.write_str("AccessToken(..)"),
        }
    }
}

/// Supplies the credential for each request.
#[async_trait]
pub trait CredentialProvider: Send + Sync + Debug {
    /// Returns the credential to send, or `None` for unauthenticated requests.
    async fn credential(&self) -> ConnectorResult<Option<Credential>>;
}

/// A credential that never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticCredential(Credential);

impl StaticCredential {
    pub fn new(credential: Credential) -> Self {
        Self(credential)
    }
}

#[async_trait]
impl CredentialProvider for StaticCredential {
    async fn credential(&self) -> ConnectorResult<Option<Credential>> {
        Ok(Some(self.0.clone()))
    }
}
