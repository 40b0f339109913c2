//! Webhook ingestion and dispatch.
//!
//! A delivery flows through:
//! 1. header validation and signature verification ([`signature`])
//! 2. payload parsing and event-key derivation ([`event`])
//! 3. hook lookup ([`registry`]) and sequential execution ([`gateway`])
//!
//! Hooks receive a [`HookContext`] giving them the payload and
//! installation-scoped client factories.

pub mod context;
pub mod event;
pub mod gateway;
pub mod registry;
pub mod signature;

pub use context::HookContext;
pub use event::{EventKey, EventKind};
pub use gateway::{
    webhook_handler, DispatchResponse, STATUS_HOOKS_CALLED, STATUS_NO_HOOK_CALLED,
};
pub use registry::{hook, FnHook, Hook, HookRegistry, HookResult};
pub use signature::{
    compute_signature, compute_signature_sha1, format_signature_header,
    format_signature_header_sha1, parse_signature_header, verify_delivery, verify_sha1,
    verify_sha256,
};
