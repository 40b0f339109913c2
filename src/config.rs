//! Framework configuration.
//!
//! Every option can be supplied either programmatically through
//! [`ConfigBuilder`] or via environment variables; explicit builder values
//! take precedence over the environment. Recognized variables:
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `GITHUBAPP_ID` | numeric application id |
//! | `GITHUBAPP_PRIVATE_KEY` | RSA private key, PEM |
//! | `GITHUBAPP_WEBHOOK_SECRET` | webhook HMAC secret (unset = verification disabled) |
//! | `GITHUBAPP_WEBHOOK_PATH` | route for the webhook endpoint |
//! | `GITHUBAPP_URL` | API base URL (enterprise deployments) |
//! | `GITHUBAPP_OAUTH_CLIENT_ID` / `_CLIENT_SECRET` / `_REDIRECT_URI` / `_SESSION_SECRET` | OAuth login |
//! | `GITHUBAPP_OAUTH_SCOPES` | requested OAuth scopes |
//! | `GITHUBAPP_RATE_LIMIT_RETRIES` | retry count for rate-limited calls |
//! | `GITHUBAPP_RATE_LIMIT_MAX_SLEEP` | cap (seconds) on any single retry sleep |

use std::env;
use std::time::Duration;

use crate::error::GitHubAppError;
use crate::ratelimit::RateLimitConfig;

/// Default API base URL. Overridden for GitHub Enterprise.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Default route for the webhook endpoint.
pub const DEFAULT_WEBHOOK_PATH: &str = "/webhook";

/// Default scopes requested during OAuth login.
pub const DEFAULT_OAUTH_SCOPES: &str = "read:user user:email";

/// OAuth login configuration. All four credentials are required for the
/// OAuth routes to be mounted.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Secret used to sign session tokens (HMAC-SHA256).
    pub session_secret: String,
    /// Space-separated scope list placed in the authorization URL.
    pub scopes: String,
}

/// Resolved framework configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Numeric GitHub App id (`iss` claim of app JWTs).
    pub app_id: Option<u64>,

    /// RSA private key in PEM form, used to sign app JWTs.
    pub private_key: Option<String>,

    /// Webhook HMAC secret. `None` disables signature verification.
    pub webhook_secret: Option<Vec<u8>>,

    /// Route the webhook endpoint is mounted at.
    pub webhook_path: String,

    /// API base URL.
    pub base_url: String,

    /// OAuth login configuration, if enabled.
    pub oauth: Option<OAuthConfig>,

    /// Retry policy for rate-limited API calls.
    pub rate_limit: RateLimitConfig,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Loads configuration purely from the environment.
    pub fn from_env() -> Result<Self, GitHubAppError> {
        ConfigBuilder::default().build()
    }
}

/// Builder for [`Config`]. Unset fields fall back to the environment, then
/// to defaults.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    app_id: Option<u64>,
    private_key: Option<String>,
    webhook_secret: Option<Vec<u8>>,
    webhook_path: Option<String>,
    base_url: Option<String>,
    oauth: Option<OAuthConfig>,
    rate_limit_retries: Option<u32>,
    rate_limit_max_sleep: Option<Duration>,
}

impl ConfigBuilder {
    pub fn app_id(mut self, id: u64) -> Self {
        self.app_id = Some(id);
        self
    }

    pub fn private_key(mut self, pem: impl Into<String>) -> Self {
        self.private_key = Some(pem.into());
        self
    }

    pub fn webhook_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    pub fn webhook_path(mut self, path: impl Into<String>) -> Self {
        self.webhook_path = Some(path.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn oauth(mut self, oauth: OAuthConfig) -> Self {
        self.oauth = Some(oauth);
        self
    }

    pub fn rate_limit_retries(mut self, retries: u32) -> Self {
        self.rate_limit_retries = Some(retries);
        self
    }

    pub fn rate_limit_max_sleep(mut self, max_sleep: Duration) -> Self {
        self.rate_limit_max_sleep = Some(max_sleep);
        self
    }

    /// Resolves the configuration: builder values first, then environment,
    /// then defaults.
    pub fn build(self) -> Result<Config, GitHubAppError> {
        let app_id = match self.app_id {
            Some(id) => Some(id),
            None => env_parse::<u64>("GITHUBAPP_ID")?,
        };

        let private_key = self.private_key.or_else(|| env_var("GITHUBAPP_PRIVATE_KEY"));

        let webhook_secret = self
            .webhook_secret
            .or_else(|| env_var("GITHUBAPP_WEBHOOK_SECRET").map(String::into_bytes));

        let webhook_path = self
            .webhook_path
            .or_else(|| env_var("GITHUBAPP_WEBHOOK_PATH"))
            .unwrap_or_else(|| DEFAULT_WEBHOOK_PATH.to_string());

        let base_url = self
            .base_url
            .or_else(|| env_var("GITHUBAPP_URL"))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        // The base URL is joined with absolute paths; a trailing slash would
        // produce `//app/installations`.
        let base_url = base_url.trim_end_matches('/').to_string();

        let oauth = match self.oauth {
            Some(oauth) => Some(oauth),
            None => oauth_from_env(),
        };

        let rate_limit = RateLimitConfig {
            retries: match self.rate_limit_retries {
                Some(r) => r,
                None => env_parse::<u32>("GITHUBAPP_RATE_LIMIT_RETRIES")?
                    .unwrap_or(RateLimitConfig::DEFAULT.retries),
            },
            max_sleep: match self.rate_limit_max_sleep {
                Some(d) => d,
                None => env_parse::<u64>("GITHUBAPP_RATE_LIMIT_MAX_SLEEP")?
                    .map(Duration::from_secs)
                    .unwrap_or(RateLimitConfig::DEFAULT.max_sleep),
            },
            base_delay: RateLimitConfig::DEFAULT.base_delay,
        };

        Ok(Config {
            app_id,
            private_key,
            webhook_secret,
            webhook_path,
            base_url,
            oauth,
            rate_limit,
        })
    }
}

/// Reads the OAuth block from the environment. All of client id, client
/// secret, redirect URI and session secret must be present; a partial block
/// leaves OAuth disabled.
fn oauth_from_env() -> Option<OAuthConfig> {
    let client_id = env_var("GITHUBAPP_OAUTH_CLIENT_ID")?;
    let client_secret = env_var("GITHUBAPP_OAUTH_CLIENT_SECRET")?;
    let redirect_uri = env_var("GITHUBAPP_OAUTH_REDIRECT_URI")?;
    let session_secret = env_var("GITHUBAPP_OAUTH_SESSION_SECRET")?;

    Some(OAuthConfig {
        client_id,
        client_secret,
        redirect_uri,
        session_secret,
        scopes: env_var("GITHUBAPP_OAUTH_SCOPES")
            .unwrap_or_else(|| DEFAULT_OAUTH_SCOPES.to_string()),
    })
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, GitHubAppError> {
    match env_var(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| GitHubAppError::Config(format!("invalid value for {}: {}", name, raw))),
    }
}
