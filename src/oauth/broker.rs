//! OAuth login endpoints.
//!
//! Three routes, mounted by [`GitHubApp::router`] when OAuth is configured:
//!
//! - `GET /auth/github/login` - returns the authorization URL (as JSON, not
//!   a redirect, so both browser UIs and programmatic callers can use it)
//! - `GET /auth/github/callback?code&state` - validates the CSRF state,
//!   exchanges the code for an access token, fetches the user profile and
//!   mints a session token
//! - `GET /auth/github/user` - returns the claims of a bearer session token
//!
//! The code exchange talks to the provider's OAuth host (github.com), not
//! the API host; profile fetches go to the configured API base URL.

use axum::extract::{FromRequestParts, Query, State};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::RestClient;
use crate::app::GitHubApp;
use crate::config::OAuthConfig;
use crate::error::GitHubAppError;

use super::session::{issue_session, verify_session, SessionClaims, SESSION_TTL_SECS};

/// Provider authorization endpoint.
const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
/// Provider token-exchange endpoint.
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub auth_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CallbackResponse {
    pub user: Value,
    pub session_token: String,
}

fn oauth_config(app: &GitHubApp) -> Result<&OAuthConfig, GitHubAppError> {
    app.config()
        .oauth
        .as_ref()
        .ok_or_else(|| GitHubAppError::Config("OAuth is not configured".into()))
}

/// Builds the provider authorization URL for a login attempt.
fn authorization_url(oauth: &OAuthConfig, state: &str) -> String {
    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", &oauth.client_id)
        .append_pair("redirect_uri", &oauth.redirect_uri)
        .append_pair("scope", &oauth.scopes)
        .append_pair("state", state)
        .finish();
    format!("{}?{}", AUTHORIZE_URL, query)
}

/// `GET /auth/github/login`
pub async fn login_handler(
    State(app): State<GitHubApp>,
) -> Result<Json<LoginResponse>, GitHubAppError> {
    let oauth = oauth_config(&app)?;
    let state = app.states().issue();

    debug!("issued OAuth login state");
    Ok(Json(LoginResponse {
        auth_url: authorization_url(oauth, &state),
    }))
}

/// `GET /auth/github/callback?code&state`
pub async fn callback_handler(
    State(app): State<GitHubApp>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<CallbackResponse>, GitHubAppError> {
    let oauth = oauth_config(&app)?;

    let code = params
        .code
        .ok_or_else(|| GitHubAppError::Validation("Missing authorization code".into()))?;
    let state = params
        .state
        .ok_or_else(|| GitHubAppError::Validation("Missing state parameter".into()))?;

    // Single-use CSRF check: the nonce must have been issued by /login,
    // must not be stale, and is consumed here.
    if !app.states().consume(&state) {
        warn!("OAuth callback with unknown or expired state");
        return Err(GitHubAppError::Validation(
            "Invalid or expired state parameter".into(),
        ));
    }

    let access_token = exchange_code(oauth, &code).await?;
    let mut user = fetch_user(app.config().base_url.as_str(), &access_token).await?;

    // Profiles with a private email need the explicit emails endpoint.
    if user.get("email").map(Value::is_null).unwrap_or(true) {
        if let Some(email) = fetch_primary_email(app.config().base_url.as_str(), &access_token).await
        {
            user["email"] = Value::String(email);
        }
    }

    let user_id = user
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| GitHubAppError::OAuth("user profile has no id".into()))?;
    let login = user
        .get("login")
        .and_then(Value::as_str)
        .ok_or_else(|| GitHubAppError::OAuth("user profile has no login".into()))?;

    let claims = SessionClaims::new(
        user_id,
        login,
        user.get("name").and_then(Value::as_str).map(String::from),
        user.get("email").and_then(Value::as_str).map(String::from),
        user.get("avatar_url")
            .and_then(Value::as_str)
            .map(String::from),
        SESSION_TTL_SECS,
    );
    let session_token = issue_session(oauth.session_secret.as_bytes(), &claims)?;

    info!(login, "OAuth login completed");
    Ok(Json(CallbackResponse {
        user,
        session_token,
    }))
}

/// `GET /auth/github/user` (Bearer auth)
pub async fn user_handler(
    State(app): State<GitHubApp>,
    headers: HeaderMap,
) -> Result<Json<SessionClaims>, GitHubAppError> {
    let oauth = oauth_config(&app)?;
    let token = bearer_token(&headers)
        .ok_or_else(|| GitHubAppError::unauthorized("Missing session token"))?;
    let claims = verify_session(oauth.session_secret.as_bytes(), token)?;
    Ok(Json(claims))
}

/// Extractor for protecting arbitrary endpoints with session auth.
///
/// ```ignore
/// async fn dashboard(CurrentUser(user): CurrentUser) -> String {
///     format!("hello, {}", user.login)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionClaims);

impl FromRequestParts<GitHubApp> for CurrentUser {
    type Rejection = GitHubAppError;

    async fn from_request_parts(
        parts: &mut Parts,
        app: &GitHubApp,
    ) -> Result<Self, Self::Rejection> {
        let oauth = oauth_config(app)?;
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| GitHubAppError::unauthorized("Missing session token"))?;
        let claims = verify_session(oauth.session_secret.as_bytes(), token)?;
        Ok(CurrentUser(claims))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
}

/// Exchanges an authorization code for an access token.
///
/// Both a non-2xx response and a 2xx body carrying an `error` field fail
/// the exchange; the provider uses both shapes.
async fn exchange_code(oauth: &OAuthConfig, code: &str) -> Result<String, GitHubAppError> {
    let response = reqwest::Client::new()
        .post(TOKEN_URL)
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&[
            ("client_id", oauth.client_id.as_str()),
            ("client_secret", oauth.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", oauth.redirect_uri.as_str()),
        ])
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(GitHubAppError::OAuth(format!(
            "token exchange failed (HTTP {}): {}",
            status, body
        )));
    }

    let parsed: Value = serde_json::from_str(&body)
        .map_err(|e| GitHubAppError::OAuth(format!("unparseable token response: {}", e)))?;
    if let Some(error) = parsed.get("error").and_then(Value::as_str) {
        let description = parsed
            .get("error_description")
            .and_then(Value::as_str)
            .unwrap_or("");
        return Err(GitHubAppError::OAuth(format!(
            "token exchange failed: {} {}",
            error, description
        )));
    }

    parsed
        .get("access_token")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| GitHubAppError::OAuth("token response has no access_token".into()))
}

/// Fetches the authenticated user's profile.
async fn fetch_user(base_url: &str, access_token: &str) -> Result<Value, GitHubAppError> {
    RestClient::new(base_url, access_token)
        .get("/user", &[])
        .await
        .map_err(|e| GitHubAppError::OAuth(format!("user profile fetch failed: {}", e)))
}

/// Fetches the user's primary (or first) verified email, if visible.
async fn fetch_primary_email(base_url: &str, access_token: &str) -> Option<String> {
    let emails = RestClient::new(base_url, access_token)
        .get("/user/emails", &[])
        .await
        .ok()?;
    let list = emails.as_array()?;

    let primary = list
        .iter()
        .find(|e| e.get("primary").and_then(Value::as_bool) == Some(true))
        .or_else(|| list.first())?;
    primary
        .get("email")
        .and_then(Value::as_str)
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use url::Url;

    use crate::config::DEFAULT_OAUTH_SCOPES;

    fn oauth_app() -> GitHubApp {
        GitHubApp::builder()
            .oauth(OAuthConfig {
                client_id: "client-id".into(),
                client_secret: "client-secret".into(),
                redirect_uri: "http://localhost/callback".into(),
                session_secret: "test-session-secret".into(),
                scopes: DEFAULT_OAUTH_SCOPES.into(),
            })
            .build()
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn login_returns_auth_url_with_client_id_and_state() {
        let app = oauth_app();
        let response = app
            .router()
            .oneshot(get_request("/auth/github/login"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let url = Url::parse(body["auth_url"].as_str().unwrap()).unwrap();

        assert_eq!(url.host_str(), Some("github.com"));
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("client_id".into(), "client-id".into())));
        let state = pairs
            .iter()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.clone())
            .expect("state param present");
        assert!(!state.is_empty());

        // The state from the URL is the one the store issued.
        assert!(app.states().consume(&state));
    }

    #[tokio::test]
    async fn each_login_gets_a_distinct_state() {
        let app = oauth_app();
        let router = app.router();

        let first = body_json(
            router
                .clone()
                .oneshot(get_request("/auth/github/login"))
                .await
                .unwrap(),
        )
        .await;
        let second = body_json(
            router
                .oneshot(get_request("/auth/github/login"))
                .await
                .unwrap(),
        )
        .await;

        assert_ne!(first["auth_url"], second["auth_url"]);
    }

    #[tokio::test]
    async fn callback_without_code_returns_400() {
        let app = oauth_app();
        let response = app
            .router()
            .oneshot(get_request("/auth/github/callback"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&bytes).contains("Missing authorization code"));
    }

    #[tokio::test]
    async fn callback_with_unknown_state_returns_400() {
        let app = oauth_app();
        let response = app
            .router()
            .oneshot(get_request("/auth/github/callback?code=abc&state=bogus"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn state_is_single_use() {
        let app = oauth_app();
        let state = app.states().issue();

        assert!(app.states().consume(&state));

        // Replaying the same state is rejected at the callback boundary.
        let uri = format!("/auth/github/callback?code=abc&state={}", state);
        let response = app.router().oneshot(get_request(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn user_without_token_returns_401() {
        let app = oauth_app();
        let response = app
            .router()
            .oneshot(get_request("/auth/github/user"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&bytes).contains("Missing session token"));
    }

    #[tokio::test]
    async fn user_with_valid_session_returns_claims() {
        let app = oauth_app();
        let claims = SessionClaims::new(
            42,
            "octocat",
            Some("The Octocat".into()),
            Some("octo@example.com".into()),
            None,
            SESSION_TTL_SECS,
        );
        let token = issue_session(b"test-session-secret", &claims).unwrap();

        let request = Request::builder()
            .uri("/auth/github/user")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = app.router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["login"], "octocat");
        assert_eq!(body["sub"], "42");
    }

    #[tokio::test]
    async fn user_with_garbage_token_returns_401() {
        let app = oauth_app();
        let request = Request::builder()
            .uri("/auth/github/user")
            .header("authorization", "Bearer not.a.jwt")
            .body(Body::empty())
            .unwrap();
        let response = app.router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn current_user_extractor_protects_custom_routes() {
        let app = oauth_app();
        let claims = SessionClaims::new(7, "ghost", None, None, None, SESSION_TTL_SECS);
        let token = issue_session(b"test-session-secret", &claims).unwrap();

        async fn whoami(CurrentUser(user): CurrentUser) -> String {
            user.login
        }
        let router: Router = Router::new()
            .route("/whoami", get(whoami))
            .with_state(app);

        // Authenticated request passes and sees the claims.
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"ghost");

        // Unauthenticated request is rejected.
        let response = router
            .oneshot(get_request("/whoami"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn authorization_url_encodes_parameters() {
        let oauth = OAuthConfig {
            client_id: "id with spaces".into(),
            client_secret: "secret".into(),
            redirect_uri: "http://localhost/callback?next=/home".into(),
            session_secret: "s".into(),
            scopes: "read:user user:email".into(),
        };

        let url = authorization_url(&oauth, "nonce123");
        assert!(url.starts_with(AUTHORIZE_URL));
        assert!(url.contains("state=nonce123"));
        assert!(url.contains("id+with+spaces") || url.contains("id%20with%20spaces"));
        // The raw separator characters of the redirect URI must not appear
        // unescaped in the query.
        assert!(!url.contains("callback?next"));
    }
}
