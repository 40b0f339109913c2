//! Outbound API clients.
//!
//! Two layers:
//! - [`RestClient`] - a thin JSON/REST handle bound to a bearer token. Used
//!   for the endpoints the framework calls itself (token minting, OAuth,
//!   installation listing) and, wrapped by the rate-limit guard, handed to
//!   webhook hooks.
//! - [`ApiClient`] - an octocrab client bound to one installation, for
//!   application code that wants the typed GitHub API surface.

pub mod client;
pub mod rest;

pub use client::ApiClient;
pub use rest::RestClient;
