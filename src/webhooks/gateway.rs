//! Webhook endpoint handler.
//!
//! Accepts GitHub webhook deliveries and runs them through the dispatch
//! pipeline: header validation, signature verification, payload parsing,
//! hook lookup, sequential hook execution, response assembly.
//!
//! # Request
//!
//! - Method: POST (route configurable, default `/webhook`)
//! - Required headers: `Content-Type: application/json`, `X-GitHub-Event`
//! - Optional headers: `X-Hub-Signature-256` / `X-Hub-Signature` (required
//!   when a webhook secret is configured)
//! - Body: JSON payload, normally carrying `installation.id` and `action`
//!
//! # Response
//!
//! - 200 with `{"status": ..., "calls": {...}}` - delivery processed;
//!   `calls` maps each hook that ran to the value it returned
//! - 400 - malformed delivery (headers, content type, signature, JSON)
//! - 500 - a hook failed; hooks that already ran are not rolled back

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::app::GitHubApp;
use crate::error::GitHubAppError;
use crate::webhooks::context::HookContext;
use crate::webhooks::event::{EventKey, EventKind};
use crate::webhooks::signature::verify_delivery;

/// Header naming the event type.
const HEADER_EVENT: &str = "x-github-event";
/// Current signature header (HMAC-SHA256).
const HEADER_SIGNATURE_256: &str = "x-hub-signature-256";
/// Legacy signature header (HMAC-SHA1).
const HEADER_SIGNATURE_1: &str = "x-hub-signature";

/// Response status when at least one hook ran.
pub const STATUS_HOOKS_CALLED: &str = "handler(s) called";
/// Response status when no hook matched the delivery.
pub const STATUS_NO_HOOK_CALLED: &str = "no handler called";

/// Body of a successful delivery response.
#[derive(Debug, Serialize, Deserialize)]
pub struct DispatchResponse {
    pub status: String,

    /// Hook name -> value the hook returned. Empty when nothing matched.
    pub calls: serde_json::Map<String, Value>,
}

/// Webhook handler. Mounted by [`GitHubApp::router`] at the configured path.
pub async fn webhook_handler(
    State(app): State<GitHubApp>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DispatchResponse>, GitHubAppError> {
    // Delivery metadata must be well-formed before anything else runs.
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| GitHubAppError::Validation("missing Content-Type header".into()))?;
    if !content_type.starts_with("application/json") {
        return Err(GitHubAppError::Validation(format!(
            "unsupported Content-Type: {}",
            content_type
        )));
    }

    let event_name = headers
        .get(HEADER_EVENT)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| GitHubAppError::Validation("missing X-GitHub-Event header".into()))?
        .to_string();

    // Verify the signature against the raw body before parsing it.
    let sha256_header = headers.get(HEADER_SIGNATURE_256).and_then(|v| v.to_str().ok());
    let sha1_header = headers.get(HEADER_SIGNATURE_1).and_then(|v| v.to_str().ok());
    if !verify_delivery(
        &body,
        app.config().webhook_secret.as_deref(),
        sha256_header,
        sha1_header,
    ) {
        warn!(event = %event_name, "invalid webhook signature");
        return Err(GitHubAppError::Validation("invalid webhook signature".into()));
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| GitHubAppError::Validation(format!("invalid JSON body: {}", e)))?;

    let kind = EventKind::parse(&event_name);
    let action = payload
        .get("action")
        .and_then(Value::as_str)
        .map(str::to_string);
    let installation_id = payload
        .get("installation")
        .and_then(|i| i.get("id"))
        .and_then(Value::as_u64);

    debug!(
        event = %event_name,
        action = action.as_deref().unwrap_or("-"),
        installation_id,
        "received webhook delivery"
    );

    let hooks = app.registry().matching(&kind, action.as_deref());
    if hooks.is_empty() {
        return Ok(Json(DispatchResponse {
            status: STATUS_NO_HOOK_CALLED.to_string(),
            calls: serde_json::Map::new(),
        }));
    }

    let key = match &action {
        Some(action) => EventKey::with_action(kind, action.clone()),
        None => EventKey::event(kind),
    };
    let ctx = HookContext::new(app.clone(), key, payload, installation_id);

    // Hooks run strictly in registration order, one at a time: they may
    // share the installation's API client. The first failure fails the
    // delivery; earlier hooks are not rolled back.
    let mut calls = serde_json::Map::new();
    for hook in hooks {
        debug!(hook = hook.name(), "invoking hook");
        match hook.call(ctx.clone()).await {
            Ok(value) => {
                calls.insert(hook.name().to_string(), value);
            }
            Err(e) => {
                return Err(GitHubAppError::Hook {
                    name: hook.name().to_string(),
                    source: Box::new(e),
                });
            }
        }
    }

    info!(event = %event_name, hooks = calls.len(), "delivery dispatched");

    Ok(Json(DispatchResponse {
        status: STATUS_HOOKS_CALLED.to_string(),
        calls,
    }))
}
