//! Hook registration and lookup.
//!
//! The registry is an explicit object built during application bootstrap
//! and frozen before the server starts taking deliveries; dispatch only
//! ever reads it, so no synchronization is needed. Registration is
//! append-only: there is no removal operation.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::GitHubAppError;
use crate::webhooks::context::HookContext;
use crate::webhooks::event::{EventKey, EventKind};

/// What a hook returns on success: an arbitrary JSON value reported back in
/// the delivery response alongside the hook's name.
pub type HookResult = Result<Value, GitHubAppError>;

/// A webhook handler.
///
/// Hooks run sequentially within a delivery (they may share an API client)
/// and receive the delivery context by value. A failing hook fails the
/// whole delivery; hooks that already ran are not rolled back.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Name reported in the delivery response.
    fn name(&self) -> &str;

    async fn call(&self, ctx: HookContext) -> HookResult;
}

type BoxedHookFuture = Pin<Box<dyn Future<Output = HookResult> + Send>>;

/// Adapter turning a named async closure into a [`Hook`].
///
/// The closure's future is boxed at registration time; hooks run at network
/// cadence, so the indirection is immaterial.
pub struct FnHook {
    name: String,
    f: Box<dyn Fn(HookContext) -> BoxedHookFuture + Send + Sync>,
}

/// Wraps an async closure as a hook.
///
/// ```ignore
/// let app = GitHubApp::builder()
///     .on("issues.opened", hook("greet", |ctx| async move {
///         let issue = ctx.payload()["issue"]["number"].clone();
///         Ok(issue)
///     }))
///     .build()?;
/// ```
pub fn hook<F, Fut>(name: impl Into<String>, f: F) -> FnHook
where
    F: Fn(HookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult> + Send + 'static,
{
    FnHook {
        name: name.into(),
        f: Box::new(move |ctx| Box::pin(f(ctx))),
    }
}

#[async_trait]
impl Hook for FnHook {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, ctx: HookContext) -> HookResult {
        (self.f)(ctx).await
    }
}

/// Insertion-ordered mapping from event key to hooks.
#[derive(Default)]
pub struct HookRegistry {
    hooks: HashMap<EventKey, Vec<Arc<dyn Hook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook under a key. The same hook may be registered under
    /// several keys; it then runs once per matching registration.
    pub fn register(&mut self, key: EventKey, hook: Arc<dyn Hook>) {
        self.hooks.entry(key).or_default().push(hook);
    }

    /// Registers a hook under a string spec (`"issues"`, `"issues.opened"`).
    pub fn on(&mut self, spec: &str, hook: Arc<dyn Hook>) {
        self.register(EventKey::parse(spec), hook);
    }

    /// Hooks matching a delivery, in dispatch order: first those registered
    /// for the bare event, then those registered for `event.action`. Order
    /// within each group is registration order.
    pub fn matching(&self, kind: &EventKind, action: Option<&str>) -> Vec<Arc<dyn Hook>> {
        let mut matched = Vec::new();

        if let Some(hooks) = self.hooks.get(&EventKey::event(kind.clone())) {
            matched.extend(hooks.iter().cloned());
        }
        if let Some(action) = action {
            if let Some(hooks) = self
                .hooks
                .get(&EventKey::with_action(kind.clone(), action))
            {
                matched.extend(hooks.iter().cloned());
            }
        }

        matched
    }

    /// Number of keys with at least one hook.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<String> = self.hooks.keys().map(|k| k.to_string()).collect();
        keys.sort();
        f.debug_struct("HookRegistry").field("keys", &keys).finish()
    }
}
