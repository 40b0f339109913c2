//! GitHub App runtime core.
//!
//! This crate is the runtime behind a GitHub App: it authenticates as an
//! installed application (app JWTs exchanged for cached installation
//! tokens), receives and verifies webhook deliveries, dispatches them to
//! registered hooks, optionally authenticates end users via OAuth2, and
//! shields outbound API calls from the provider's rate limiting.
//!
//! The crate hands back an [`axum::Router`]; serving it - and everything
//! else about the process - belongs to the consuming application.
//!
//! ```ignore
//! use github_app::{hook, GitHubApp};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = GitHubApp::builder()
//!         .app_id(123)
//!         .private_key(std::fs::read_to_string("private-key.pem")?)
//!         .webhook_secret(b"my-webhook-secret".to_vec())
//!         .on("issues.opened", hook("greet", |ctx| async move {
//!             let issue = ctx.payload()["issue"]["number"].as_u64().unwrap_or(0);
//!             let rest = ctx.rest().await?;
//!             rest.post(
//!                 &format!("/repos/octocat/hello-world/issues/{issue}/comments"),
//!                 Some(&json!({"body": "thanks for opening this!"})),
//!             )
//!             .await?;
//!             Ok(json!("greeted"))
//!         }))
//!         .build()?;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app.router()).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod oauth;
pub mod ratelimit;
pub mod webhooks;

pub use api::{ApiClient, RestClient};
pub use app::{GitHubApp, GitHubAppBuilder};
pub use auth::{InstallationToken, TokenManager};
pub use config::{Config, OAuthConfig};
pub use error::{GitHubAppError, ResponseData};
pub use oauth::{CurrentUser, SessionClaims};
pub use ratelimit::{retry_with_rate_limit, GuardedClient, RateLimitConfig};
pub use webhooks::{hook, EventKey, EventKind, Hook, HookContext, HookRegistry};
