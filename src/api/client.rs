//! Octocrab client wrapper scoped to one installation.
//!
//! Application hooks that want the typed GitHub API surface get one of
//! these from their context or from the token manager. The wrapper exists
//! so callers can tell which installation a client is acting for.

use octocrab::Octocrab;

use crate::error::GitHubAppError;

/// A GitHub API client authenticated as a specific installation.
///
/// The embedded token is short-lived; callers must not assume the client
/// outlives the token's expiry. Long-running work should re-request a
/// client rather than hold one.
#[derive(Clone)]
pub struct ApiClient {
    /// The underlying octocrab client.
    client: Octocrab,

    /// The installation this client acts for.
    installation_id: u64,
}

impl ApiClient {
    /// Builds a client from an installation token.
    pub fn from_token(
        token: impl Into<String>,
        installation_id: u64,
        base_url: &str,
    ) -> Result<Self, GitHubAppError> {
        let token: String = token.into();
        let client = Octocrab::builder()
            .personal_token(token)
            .base_uri(base_url)?
            .build()?;
        Ok(Self {
            client,
            installation_id,
        })
    }

    /// Wraps a pre-configured octocrab instance.
    pub fn from_octocrab(client: Octocrab, installation_id: u64) -> Self {
        Self {
            client,
            installation_id,
        }
    }

    /// Returns a reference to the underlying octocrab client.
    pub fn inner(&self) -> &Octocrab {
        &self.client
    }

    /// The installation this client is bound to.
    pub fn installation_id(&self) -> u64 {
        self.installation_id
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("installation_id", &self.installation_id)
            .finish_non_exhaustive()
    }
}
