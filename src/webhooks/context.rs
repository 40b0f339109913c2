//! Per-delivery context handed to hooks.

use std::sync::Arc;

use serde_json::Value;

use crate::api::ApiClient;
use crate::app::GitHubApp;
use crate::error::GitHubAppError;
use crate::ratelimit::GuardedClient;
use crate::webhooks::event::EventKey;

/// Everything a hook can see about the delivery it is handling.
///
/// Cheap to clone (the payload is shared behind an `Arc`); each hook in a
/// delivery receives its own handle. Client factories resolve the
/// installation id embedded in the delivery payload, so hooks never touch
/// ambient globals.
#[derive(Clone)]
pub struct HookContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    key: EventKey,
    payload: Value,
    installation_id: Option<u64>,
    app: GitHubApp,
}

impl HookContext {
    pub(crate) fn new(
        app: GitHubApp,
        key: EventKey,
        payload: Value,
        installation_id: Option<u64>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                key,
                payload,
                installation_id,
                app,
            }),
        }
    }

    /// The event key this delivery dispatched under.
    pub fn event(&self) -> &EventKey {
        &self.inner.key
    }

    /// The delivery's `action` field, if any.
    pub fn action(&self) -> Option<&str> {
        self.inner.key.action.as_deref()
    }

    /// The full JSON payload of the delivery.
    pub fn payload(&self) -> &Value {
        &self.inner.payload
    }

    /// The installation id from the payload, if present.
    pub fn installation_id(&self) -> Option<u64> {
        self.inner.installation_id
    }

    /// The application handle (token manager, configuration).
    pub fn app(&self) -> &GitHubApp {
        &self.inner.app
    }

    fn require_installation(&self) -> Result<u64, GitHubAppError> {
        self.inner.installation_id.ok_or_else(|| {
            GitHubAppError::Validation("delivery carries no installation id".into())
        })
    }

    /// An octocrab client authenticated as this delivery's installation.
    ///
    /// The token behind the client is short-lived; long-running hooks should
    /// call this again rather than hold the client.
    pub async fn client(&self) -> Result<ApiClient, GitHubAppError> {
        let installation_id = self.require_installation()?;
        self.inner.app.tokens().client(installation_id).await
    }

    /// A rate-limit-guarded REST handle bound to this delivery's
    /// installation. Every call made through it retries on rate limiting
    /// per the configured policy.
    pub async fn rest(&self) -> Result<GuardedClient, GitHubAppError> {
        let installation_id = self.require_installation()?;
        let rest = self.inner.app.tokens().rest(installation_id).await?;
        Ok(GuardedClient::new(
            rest,
            self.inner.app.config().rate_limit,
        ))
    }
}

impl std::fmt::Debug for HookContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookContext")
            .field("event", &self.inner.key.to_string())
            .field("installation_id", &self.inner.installation_id)
            .finish_non_exhaustive()
    }
}
