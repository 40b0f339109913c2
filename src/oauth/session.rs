//! Stateless session tokens.
//!
//! After a successful OAuth login the broker mints a signed, time-bounded
//! session token carrying the user's claims. Validity is determined purely
//! by signature and expiry; there is no server-side session table.
//!
//! Tokens are HMAC-SHA256 JWTs signed with the configured session secret.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::GitHubAppError;

/// Session lifetime: 24 hours.
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Claims embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the user's numeric id, as a string.
    pub sub: String,
    /// The user's login name.
    pub login: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Issued-at, epoch seconds.
    pub iat: i64,
    /// Expiry, epoch seconds.
    pub exp: i64,
}

impl SessionClaims {
    /// Builds claims for a user profile, issued now, expiring after
    /// `ttl_secs`.
    pub fn new(
        user_id: u64,
        login: impl Into<String>,
        name: Option<String>,
        email: Option<String>,
        avatar_url: Option<String>,
        ttl_secs: i64,
    ) -> Self {
        let iat = Utc::now().timestamp();
        SessionClaims {
            sub: user_id.to_string(),
            login: login.into(),
            name,
            email,
            avatar_url,
            iat,
            exp: iat + ttl_secs,
        }
    }
}

/// Signs a session token.
pub fn issue_session(secret: &[u8], claims: &SessionClaims) -> Result<String, GitHubAppError> {
    Ok(jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )?)
}

/// Validates a session token and returns its claims.
///
/// Expired or otherwise invalid tokens map to `Unauthorized`, which the
/// serving boundary renders as 401.
pub fn verify_session(secret: &[u8], token: &str) -> Result<SessionClaims, GitHubAppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;

    let data = jsonwebtoken::decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            GitHubAppError::unauthorized("session token expired")
        }
        _ => GitHubAppError::unauthorized("invalid session token"),
    })?;

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-session-secret";

    fn claims() -> SessionClaims {
        SessionClaims::new(
            42,
            "octocat",
            Some("The Octocat".into()),
            Some("octo@example.com".into()),
            Some("https://avatars.githubusercontent.com/u/42".into()),
            SESSION_TTL_SECS,
        )
    }

    #[test]
    fn issue_then_verify_roundtrips() {
        let token = issue_session(SECRET, &claims()).unwrap();
        let decoded = verify_session(SECRET, &token).unwrap();

        assert_eq!(decoded.sub, "42");
        assert_eq!(decoded.login, "octocat");
        assert_eq!(decoded.email.as_deref(), Some("octo@example.com"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_session(SECRET, &claims()).unwrap();
        let result = verify_session(b"other-secret", &token);

        assert!(matches!(result, Err(GitHubAppError::Unauthorized { .. })));
    }

    #[test]
    fn expired_session_is_rejected() {
        let mut expired = claims();
        expired.iat -= 2 * SESSION_TTL_SECS;
        expired.exp = expired.iat + SESSION_TTL_SECS;

        let token = issue_session(SECRET, &expired).unwrap();
        let result = verify_session(SECRET, &token);

        match result {
            Err(GitHubAppError::Unauthorized { message, .. }) => {
                assert!(message.contains("expired"));
            }
            other => panic!("expected Unauthorized, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(matches!(
            verify_session(SECRET, "not.a.jwt"),
            Err(GitHubAppError::Unauthorized { .. })
        ));
    }

    #[test]
    fn optional_claims_are_omitted_when_absent() {
        let minimal = SessionClaims::new(7, "ghost", None, None, None, SESSION_TTL_SECS);
        let json = serde_json::to_value(&minimal).unwrap();

        assert!(json.get("name").is_none());
        assert!(json.get("email").is_none());
        assert_eq!(json["login"], "ghost");
    }
}
