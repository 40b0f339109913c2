//! Minimal REST client over the provider's JSON API.
//!
//! Every non-2xx response is converted into a typed error carrying the
//! status, the rate-limit headers and the body (see
//! [`GitHubAppError::from_api_response`]), which is what the retry guard
//! needs for classification.

use reqwest::header::{ACCEPT, USER_AGENT};
use serde_json::Value;

use crate::error::{GitHubAppError, ResponseData};

/// Accept header GitHub asks API consumers to send.
const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// User agent for outbound calls; GitHub rejects anonymous clients.
const GITHUB_USER_AGENT: &str = concat!("github-app/", env!("CARGO_PKG_VERSION"));

/// A JSON REST handle bound to a base URL and a bearer token.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl RestClient {
    /// Creates a client for `base_url` authenticating with `token`.
    ///
    /// The token may be an app JWT or an installation token; both are sent
    /// as `Authorization: Bearer`.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// The base URL this client targets.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, GitHubAppError> {
        self.execute(self.http.get(self.url(path)).query(query)).await
    }

    pub async fn post(&self, path: &str, body: Option<&Value>) -> Result<Value, GitHubAppError> {
        let mut request = self.http.post(self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(request).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value, GitHubAppError> {
        self.execute(self.http.patch(self.url(path)).json(body)).await
    }

    pub async fn put(&self, path: &str, body: Option<&Value>) -> Result<Value, GitHubAppError> {
        let mut request = self.http.put(self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(request).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, GitHubAppError> {
        self.execute(self.http.delete(self.url(path))).await
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value, GitHubAppError> {
        let response = request
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(USER_AGENT, GITHUB_USER_AGENT)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(GitHubAppError::from_api_response(ResponseData::from_parts(
                status, &headers, body,
            )));
        }

        // 204 No Content and friends have an empty body.
        if body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path() {
        let client = RestClient::new("https://api.github.com", "t");
        assert_eq!(
            client.url("/app/installations"),
            "https://api.github.com/app/installations"
        );
    }

    #[test]
    fn trailing_slash_on_base_is_tolerated() {
        let client = RestClient::new("https://ghe.example.com/api/v3/", "t");
        assert_eq!(client.url("/user"), "https://ghe.example.com/api/v3/user");
    }

    #[test]
    fn debug_does_not_leak_the_token() {
        let client = RestClient::new("https://api.github.com", "sekrit");
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("sekrit"));
    }
}
