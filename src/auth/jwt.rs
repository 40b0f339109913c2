//! App JWT minting.
//!
//! The JWT carries `{iat, exp, iss: <app id>}` and is signed RS256 with the
//! app's RSA private key. GitHub accepts these for at most ten minutes.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::error::GitHubAppError;

/// Default JWT lifetime: GitHub's maximum of ten minutes.
pub const DEFAULT_JWT_EXPIRATION: Duration = Duration::from_secs(600);

/// Claims of an app-level JWT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppClaims {
    /// Issued-at, epoch seconds.
    pub iat: i64,
    /// Expiry, epoch seconds.
    pub exp: i64,
    /// Issuer: the numeric app id.
    pub iss: u64,
}

impl AppClaims {
    /// Builds claims for `app_id` issued at `now`, expiring after
    /// `expiration`.
    pub fn new(app_id: u64, now: DateTime<Utc>, expiration: Duration) -> Self {
        let iat = now.timestamp();
        AppClaims {
            iat,
            exp: iat + expiration.as_secs() as i64,
            iss: app_id,
        }
    }
}

/// Mints an app JWT signed with the given RSA private key (PEM).
pub fn create_app_jwt(
    app_id: u64,
    private_key_pem: &str,
    expiration: Duration,
) -> Result<String, GitHubAppError> {
    let claims = AppClaims::new(app_id, Utc::now(), expiration);
    let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())?;
    Ok(jsonwebtoken::encode(
        &Header::new(Algorithm::RS256),
        &claims,
        &key,
    )?)
}
