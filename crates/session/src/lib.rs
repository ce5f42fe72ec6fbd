//! Session layer for Formgate
//!
//! This crate owns the per-session state the request lifecycle mutates:
//! - SessionStore: Opaque per-session blobs keyed by string (external)
//! - MemorySessionStore: DashMap-backed reference implementation
//! - Session: Handle with a single mutual-exclusion boundary per session
//! - TransactionTokenStore: Single-use tokens guarding state-changing requests
//! - RedirectContextStore: View-state snapshots surviving one redirect hop
//!
//! # Concurrency
//!
//! Two tabs of the same browser can race on one session. Every
//! read-modify-write of a session blob (`issue`/`consume`, `save`/`restore`)
//! happens while holding that session's lock, so each operation is atomic
//! per session. Different sessions never contend.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod context;
pub mod session;
pub mod store;
pub mod token;

pub use context::{ContextId, RedirectContextSnapshot, RedirectContextStore};
pub use session::{Session, SessionAttributes, SessionGuard, SessionRegistry};
pub use store::{MemorySessionStore, SessionStore};
pub use token::{TokenCheck, TransactionTokenStore};
