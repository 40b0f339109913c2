//! Application bootstrap: configuration, hook registration, router assembly.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;

use crate::api::ApiClient;
use crate::auth::TokenManager;
use crate::config::{Config, ConfigBuilder, OAuthConfig};
use crate::error::GitHubAppError;
use crate::oauth::state::StateStore;
use crate::oauth::{callback_handler, login_handler, user_handler};
use crate::webhooks::gateway::webhook_handler;
use crate::webhooks::registry::{Hook, HookRegistry};

/// The framework handle: configuration, token cache, hook registry and
/// OAuth state, shared behind an `Arc`.
///
/// Built once at startup via [`GitHubApp::builder`]; immutable afterwards.
/// Cloning is cheap and every clone sees the same caches.
#[derive(Clone)]
pub struct GitHubApp {
    inner: Arc<AppInner>,
}

struct AppInner {
    config: Config,
    tokens: TokenManager,
    registry: HookRegistry,
    states: StateStore,
}

impl GitHubApp {
    pub fn builder() -> GitHubAppBuilder {
        GitHubAppBuilder::default()
    }

    /// Builds an app from the environment with no hooks registered.
    pub fn from_env() -> Result<Self, GitHubAppError> {
        Self::builder().build()
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Token minting and the installation-token cache.
    pub fn tokens(&self) -> &TokenManager {
        &self.inner.tokens
    }

    pub(crate) fn registry(&self) -> &HookRegistry {
        &self.inner.registry
    }

    pub(crate) fn states(&self) -> &StateStore {
        &self.inner.states
    }

    /// An API client authenticated as the given installation.
    pub async fn client(&self, installation_id: u64) -> Result<ApiClient, GitHubAppError> {
        self.inner.tokens.client(installation_id).await
    }

    /// Assembles the router: the webhook endpoint at the configured path,
    /// plus the OAuth routes when OAuth is configured. The consuming
    /// application serves this router (and may merge its own routes in).
    pub fn router(&self) -> Router {
        let mut router = Router::new().route(&self.inner.config.webhook_path, post(webhook_handler));

        if self.inner.config.oauth.is_some() {
            router = router
                .route("/auth/github/login", get(login_handler))
                .route("/auth/github/callback", get(callback_handler))
                .route("/auth/github/user", get(user_handler));
        }

        router.with_state(self.clone())
    }
}

impl std::fmt::Debug for GitHubApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubApp")
            .field("app_id", &self.inner.config.app_id)
            .field("webhook_path", &self.inner.config.webhook_path)
            .field("hooks", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

/// Builder for [`GitHubApp`]: configuration plus hook registration.
///
/// Hooks can only be registered here, before [`build`](Self::build) - the
/// registry is frozen once the app exists, so dispatch reads it without
/// synchronization.
#[derive(Default)]
pub struct GitHubAppBuilder {
    config: ConfigBuilder,
    registrations: Vec<(String, Arc<dyn Hook>)>,
}

impl GitHubAppBuilder {
    pub fn app_id(mut self, id: u64) -> Self {
        self.config = self.config.app_id(id);
        self
    }

    pub fn private_key(mut self, pem: impl Into<String>) -> Self {
        self.config = self.config.private_key(pem);
        self
    }

    pub fn webhook_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.config = self.config.webhook_secret(secret);
        self
    }

    pub fn webhook_path(mut self, path: impl Into<String>) -> Self {
        self.config = self.config.webhook_path(path);
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config = self.config.base_url(url);
        self
    }

    pub fn oauth(mut self, oauth: OAuthConfig) -> Self {
        self.config = self.config.oauth(oauth);
        self
    }

    pub fn rate_limit_retries(mut self, retries: u32) -> Self {
        self.config = self.config.rate_limit_retries(retries);
        self
    }

    pub fn rate_limit_max_sleep(mut self, max_sleep: Duration) -> Self {
        self.config = self.config.rate_limit_max_sleep(max_sleep);
        self
    }

    /// Registers a hook under an event spec (`"issues"`, `"issues.opened"`).
    pub fn on<H: Hook + 'static>(self, spec: impl Into<String>, hook: H) -> Self {
        self.on_shared(spec, Arc::new(hook))
    }

    /// Registers an already-shared hook; registering the same `Arc` under
    /// several specs runs it once per matching registration.
    pub fn on_shared(mut self, spec: impl Into<String>, hook: Arc<dyn Hook>) -> Self {
        self.registrations.push((spec.into(), hook));
        self
    }

    pub fn build(self) -> Result<GitHubApp, GitHubAppError> {
        let config = self.config.build()?;

        let mut registry = HookRegistry::new();
        for (spec, hook) in self.registrations {
            registry.on(&spec, hook);
        }

        let tokens = TokenManager::new(
            config.app_id,
            config.private_key.clone(),
            config.base_url.clone(),
        );

        Ok(GitHubApp {
            inner: Arc::new(AppInner {
                config,
                tokens,
                registry,
                states: StateStore::default(),
            }),
        })
    }
}
