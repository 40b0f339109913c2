//! Installation access tokens and their cache.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::api::{ApiClient, RestClient};
use crate::error::GitHubAppError;

use super::jwt::{create_app_jwt, DEFAULT_JWT_EXPIRATION};

/// A short-lived credential scoped to one installation.
///
/// Immutable once constructed; a refresh replaces the cache entry rather
/// than mutating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationToken {
    /// The bearer token.
    pub token: String,

    /// Expiry instant. `None` means the token never expires (test and
    /// enterprise contexts).
    pub expires_at: Option<DateTime<Utc>>,
}

impl InstallationToken {
    pub fn new(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// True once the expiry instant has passed. A token without an expiry
    /// never expires.
    pub fn expired(&self) -> bool {
        match self.expires_at {
            None => false,
            Some(at) => at <= Utc::now(),
        }
    }
}

/// Mints app JWTs and manages the installation-token cache.
///
/// The cache is keyed by installation id and guarded by a coarse mutex;
/// entries are small and operations are fast. The lock is never held across
/// a network call, so concurrent deliveries for the same installation may
/// race to refresh - redundant but harmless, and an expired token is never
/// handed out.
pub struct TokenManager {
    app_id: Option<u64>,
    private_key: Option<String>,
    base_url: String,
    cache: Mutex<HashMap<u64, InstallationToken>>,
}

impl TokenManager {
    pub fn new(app_id: Option<u64>, private_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            app_id,
            private_key,
            base_url: base_url.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The configured app id, or a configuration error.
    pub fn app_id(&self) -> Result<u64, GitHubAppError> {
        self.app_id
            .ok_or_else(|| GitHubAppError::Config("app id is not configured".into()))
    }

    /// Mints an app JWT with the given lifetime.
    pub fn create_jwt(&self, expiration: Duration) -> Result<String, GitHubAppError> {
        let key = self
            .private_key
            .as_deref()
            .ok_or_else(|| GitHubAppError::Config("private key is not configured".into()))?;
        create_app_jwt(self.app_id()?, key, expiration)
    }

    /// REST handle authenticated with a fresh app JWT.
    fn jwt_client(&self) -> Result<RestClient, GitHubAppError> {
        let jwt = self.create_jwt(DEFAULT_JWT_EXPIRATION)?;
        Ok(RestClient::new(&self.base_url, jwt))
    }

    /// Fetches a new installation token from the provider and caches it.
    ///
    /// Status mapping: 401 -> `Unauthorized`, 403 -> `BadCredentials`,
    /// 404 -> `UnknownObject`, any other non-2xx -> `Api` with the response
    /// body in the message.
    pub async fn get_access_token(
        &self,
        installation_id: u64,
        user_id: Option<u64>,
    ) -> Result<InstallationToken, GitHubAppError> {
        let path = format!("/app/installations/{}/access_tokens", installation_id);
        let body = user_id.map(|id| json!({ "user_id": id }));

        let response = self.jwt_client()?.post(&path, body.as_ref()).await?;
        let token: InstallationToken = serde_json::from_value(response)?;

        debug!(
            installation_id,
            expires_at = ?token.expires_at,
            "minted installation token"
        );

        self.cache
            .lock()
            .expect("token cache lock poisoned")
            .insert(installation_id, token.clone());

        Ok(token)
    }

    /// Returns a non-expired token for the installation, refreshing if the
    /// cached one is missing or expired.
    pub async fn token_for(&self, installation_id: u64) -> Result<InstallationToken, GitHubAppError> {
        {
            let cache = self.cache.lock().expect("token cache lock poisoned");
            if let Some(token) = cache.get(&installation_id) {
                if !token.expired() {
                    return Ok(token.clone());
                }
            }
        } // lock released before the refresh round-trip

        self.get_access_token(installation_id, None).await
    }

    /// Builds an API client authenticated as the installation.
    pub async fn client(&self, installation_id: u64) -> Result<ApiClient, GitHubAppError> {
        let token = self.token_for(installation_id).await?;
        ApiClient::from_token(token.token, installation_id, &self.base_url)
    }

    /// REST handle bound to the installation's token, for raw JSON calls.
    pub async fn rest(&self, installation_id: u64) -> Result<RestClient, GitHubAppError> {
        let token = self.token_for(installation_id).await?;
        Ok(RestClient::new(&self.base_url, token.token))
    }

    /// Lists installations of this app, paginated. Uses the app JWT, not an
    /// installation token.
    pub async fn list_installations(
        &self,
        per_page: u32,
        page: u32,
    ) -> Result<Vec<Value>, GitHubAppError> {
        let query = [
            ("per_page", per_page.to_string()),
            ("page", page.to_string()),
        ];
        let response = self.jwt_client()?.get("/app/installations", &query).await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Drops a cached token (test hook and manual invalidation).
    pub fn invalidate(&self, installation_id: u64) {
        self.cache
            .lock()
            .expect("token cache lock poisoned")
            .remove(&installation_id);
    }

    #[cfg(test)]
    pub(crate) fn seed_token(&self, installation_id: u64, token: InstallationToken) {
        self.cache
            .lock()
            .expect("token cache lock poisoned")
            .insert(installation_id, token);
    }

    #[cfg(test)]
    pub(crate) fn cached(&self, installation_id: u64) -> Option<InstallationToken> {
        self.cache
            .lock()
            .expect("token cache lock poisoned")
            .get(&installation_id)
            .cloned()
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("app_id", &self.app_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn token_without_expiry_never_expires() {
        let token = InstallationToken::new("t", None);
        assert!(!token.expired());
    }

    #[test]
    fn token_with_future_expiry_is_live() {
        let token = InstallationToken::new("t", Some(Utc::now() + TimeDelta::hours(1)));
        assert!(!token.expired());
    }

    #[test]
    fn token_with_past_expiry_is_expired() {
        let token = InstallationToken::new("t", Some(Utc::now() - TimeDelta::hours(1)));
        assert!(token.expired());
    }

    #[test]
    fn token_deserializes_from_provider_response() {
        let token: InstallationToken = serde_json::from_str(
            r#"{"token": "ghs_abc123", "expires_at": "2023-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(token.token, "ghs_abc123");
        assert!(token.expires_at.is_some());
    }

    #[test]
    fn missing_app_id_is_a_config_error() {
        let manager = TokenManager::new(None, Some("pem".into()), "https://api.github.com");
        assert!(matches!(
            manager.app_id(),
            Err(GitHubAppError::Config(_))
        ));
    }

    #[test]
    fn missing_private_key_is_a_config_error() {
        let manager = TokenManager::new(Some(123), None, "https://api.github.com");
        assert!(matches!(
            manager.create_jwt(DEFAULT_JWT_EXPIRATION),
            Err(GitHubAppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn cached_live_token_is_reused_without_refresh() {
        // No credentials configured: any attempt to refresh would fail with
        // a config error, so success proves the cache was used.
        let manager = TokenManager::new(None, None, "https://api.github.com");
        let live = InstallationToken::new("cached", Some(Utc::now() + TimeDelta::hours(1)));
        manager.seed_token(42, live.clone());

        let token = manager.token_for(42).await.unwrap();
        assert_eq!(token, live);
    }

    #[tokio::test]
    async fn expired_cached_token_triggers_refresh() {
        let manager = TokenManager::new(None, None, "https://api.github.com");
        let stale = InstallationToken::new("stale", Some(Utc::now() - TimeDelta::minutes(5)));
        manager.seed_token(42, stale);

        // The refresh path needs credentials; with none configured it must
        // surface the config error rather than hand back the stale token.
        let result = manager.token_for(42).await;
        assert!(matches!(result, Err(GitHubAppError::Config(_))));
    }

    #[tokio::test]
    async fn invalidate_drops_the_cache_entry() {
        let manager = TokenManager::new(None, None, "https://api.github.com");
        manager.seed_token(7, InstallationToken::new("t", None));
        assert!(manager.cached(7).is_some());

        manager.invalidate(7);
        assert!(manager.cached(7).is_none());
    }
}
