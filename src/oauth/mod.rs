//! OAuth2 end-user authentication.
//!
//! Flow: `/login` issues a single-use CSRF nonce and returns the provider
//! authorization URL; the provider redirects back to `/callback`, which
//! validates the nonce, exchanges the code for an access token, fetches the
//! user profile and mints a stateless session token; `/user` (and the
//! [`CurrentUser`] extractor) validate that token on later requests.

pub mod broker;
pub mod session;
pub mod state;

pub use broker::{
    callback_handler, login_handler, user_handler, CallbackParams, CallbackResponse, CurrentUser,
    LoginResponse,
};
pub use session::{issue_session, verify_session, SessionClaims, SESSION_TTL_SECS};
pub use state::{StateStore, STATE_TTL};
