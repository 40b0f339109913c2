//! Error types shared by every subsystem of the framework.
//!
//! The taxonomy mirrors the provider's failure modes:
//!
//! - `Validation` - a malformed delivery or request (bad headers, bad
//!   signature, bad JSON); always a client error
//! - `Unauthorized` / `BadCredentials` / `UnknownObject` - the provider's
//!   401/403/404 responses, surfaced as typed errors
//! - `RateLimitExhausted` - the rate-limit guard gave up after its
//!   configured retries
//! - `Api` - any other non-2xx from the provider
//!
//! Errors that originate in an HTTP exchange carry a [`ResponseData`] with
//! the status, the rate-limit headers, and the response body, so that the
//! retry logic can classify them and callers can inspect what the provider
//! actually said.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// The parts of an HTTP response that survive into an error.
///
/// Captured before the response body is consumed; the header fields are the
/// ones rate-limit classification needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseData {
    /// HTTP status code.
    pub status: u16,

    /// `Retry-After` header, verbatim.
    pub retry_after: Option<String>,

    /// `x-ratelimit-remaining` header, verbatim.
    pub ratelimit_remaining: Option<String>,

    /// `x-ratelimit-reset` header (epoch seconds), verbatim.
    pub ratelimit_reset: Option<String>,

    /// Response body text (may be empty).
    pub body: String,
}

impl ResponseData {
    /// Captures the relevant parts of a `reqwest` response's metadata.
    ///
    /// The body must be read separately (reading it consumes the response).
    pub fn from_parts(status: StatusCode, headers: &reqwest::header::HeaderMap, body: String) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };

        ResponseData {
            status: status.as_u16(),
            retry_after: header("retry-after"),
            ratelimit_remaining: header("x-ratelimit-remaining"),
            ratelimit_reset: header("x-ratelimit-reset"),
            body,
        }
    }
}

/// Error type for all framework operations.
#[derive(Debug, Error)]
pub enum GitHubAppError {
    /// Malformed delivery or request: bad content type, missing headers,
    /// invalid signature, unparseable JSON, unknown OAuth state.
    #[error("{0}")]
    Validation(String),

    /// The provider returned 401, or a session token was missing/invalid.
    #[error("{message}")]
    Unauthorized {
        message: String,
        response: Option<ResponseData>,
    },

    /// The provider returned 403.
    #[error("bad credentials: {message}")]
    BadCredentials {
        message: String,
        response: Option<ResponseData>,
    },

    /// The provider returned 404.
    #[error("unknown object: {message}")]
    UnknownObject {
        message: String,
        response: Option<ResponseData>,
    },

    /// The rate-limit guard exhausted its retries.
    ///
    /// Carries the last rate-limited response observed.
    #[error("rate limit retries exhausted after {attempts} attempts")]
    RateLimitExhausted {
        attempts: u32,
        response: ResponseData,
    },

    /// Any other non-2xx provider response.
    #[error("GitHub API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        response: Option<ResponseData>,
    },

    /// OAuth code exchange or profile fetch failed.
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A webhook hook returned an error. The delivery as a whole fails.
    #[error("hook '{name}' failed: {source}")]
    Hook {
        name: String,
        #[source]
        source: Box<GitHubAppError>,
    },

    /// Transport-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// JWT signing or validation failure.
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Error from the octocrab API client.
    #[error(transparent)]
    Octocrab(#[from] octocrab::Error),
}

impl GitHubAppError {
    /// Shorthand for an `Unauthorized` without response data.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        GitHubAppError::Unauthorized {
            message: message.into(),
            response: None,
        }
    }

    /// Maps a non-2xx provider response to its typed error.
    ///
    /// 401, 403 and 404 get dedicated variants; everything else becomes
    /// [`GitHubAppError::Api`] with the response body in the message.
    pub fn from_api_response(data: ResponseData) -> Self {
        let message = data.body.clone();
        match data.status {
            401 => GitHubAppError::Unauthorized {
                message,
                response: Some(data),
            },
            403 => GitHubAppError::BadCredentials {
                message,
                response: Some(data),
            },
            404 => GitHubAppError::UnknownObject {
                message,
                response: Some(data),
            },
            status => GitHubAppError::Api {
                status,
                message,
                response: Some(data),
            },
        }
    }

    /// Returns the captured provider response, if this error carries one.
    pub fn response(&self) -> Option<&ResponseData> {
        match self {
            GitHubAppError::Unauthorized { response, .. }
            | GitHubAppError::BadCredentials { response, .. }
            | GitHubAppError::UnknownObject { response, .. }
            | GitHubAppError::Api { response, .. } => response.as_ref(),
            GitHubAppError::RateLimitExhausted { response, .. } => Some(response),
            _ => None,
        }
    }

    /// The HTTP status this error maps to at the serving boundary.
    pub fn status(&self) -> StatusCode {
        match self {
            GitHubAppError::Validation(_) => StatusCode::BAD_REQUEST,
            GitHubAppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            GitHubAppError::BadCredentials { .. } => StatusCode::FORBIDDEN,
            GitHubAppError::UnknownObject { .. } => StatusCode::NOT_FOUND,
            GitHubAppError::Api { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            // Hook failures, exhausted retries, OAuth exchange failures and
            // everything transport-level surface as a server error.
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GitHubAppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}
