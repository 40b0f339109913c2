//! Application authentication.
//!
//! A GitHub App authenticates in two steps: it signs a short-lived JWT with
//! its private key (proving it is the app), then exchanges that JWT for an
//! installation access token scoped to one installation. Installation
//! tokens are cached until expiry; the cache never hands out an expired
//! token.

pub mod jwt;
pub mod tokens;

pub use jwt::{create_app_jwt, AppClaims, DEFAULT_JWT_EXPIRATION};
pub use tokens::{InstallationToken, TokenManager};
