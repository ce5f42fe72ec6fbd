//! Formgate - request-lifecycle consistency for form-driven web applications
//!
//! Formgate sits between a web layer and a row store and keeps each
//! request consistent with the ones before it:
//! - Single-use transaction tokens reject duplicate submissions
//! - Redirect contexts carry view-state and messages across one
//!   post/redirect/get hop
//! - Version vectors detect edits made against data someone else changed
//! - Soft-delete reconciliation purges flagged rows before a colliding write
//! - A pure pager model renders list navigation
//!
//! # Quick Start
//!
//! ```
//! use formgate::{
//!     FormgateConfig, IncomingRequest, MemorySessionStore, PageHandler,
//!     RequestLifecycleOrchestrator, SessionId, SessionRegistry, StaticMetadata,
//! };
//! use std::sync::Arc;
//!
//! let sessions = Arc::new(SessionRegistry::new(Arc::new(MemorySessionStore::new())));
//! let orchestrator = RequestLifecycleOrchestrator::new(
//!     &FormgateConfig::default(),
//!     sessions,
//!     Arc::new(StaticMetadata::new()),
//! )?;
//!
//! let page = PageHandler::single_form("/profile", "profile");
//! let outcome = orchestrator.handle_page(&page, IncomingRequest::page(SessionId::new("s1"), "/profile"));
//! assert!(outcome.as_render().is_some_and(|r| r.transaction_token.is_some()));
//! # Ok::<(), formgate::FormgateError>(())
//! ```
//!
//! # Layers
//!
//! Each layer is its own crate, re-exported here whole:
//! [`formgate_core`], [`formgate_session`], [`formgate_storage`],
//! [`formgate_concurrency`], [`formgate_engine`].

pub use formgate_concurrency;
pub use formgate_core;
pub use formgate_engine;
pub use formgate_session;
pub use formgate_storage;

pub use formgate_concurrency::{
    capture_versions, checked_write, find_and_check, CheckedRows, ReconcileReport, RowRef,
    SoftDeleteReconciler,
};
pub use formgate_core::{
    build_cells, CellKind, ErrorCategory, FormgateError, FormgateResult, Message, MessageLevel,
    Messages, PagerCell, RequestContext, RowIdentity, SessionId, TenantScope, Value,
    VersionVector, ViewState, CONTEXT_ID_PARAM, TRANSACTION_TOKEN_PARAM,
};
pub use formgate_engine::{
    init_tracing, ActionKind, ActionScope, FormgateConfig, IncomingRequest, MetadataProvider,
    Outcome, PageHandler, PageKind, RenderInstruction, RequestLifecycleOrchestrator,
    RequiredRule, StaticMetadata, StructuralValidator,
};
pub use formgate_session::{
    ContextId, MemorySessionStore, RedirectContextStore, Session, SessionRegistry, SessionStore,
    TransactionTokenStore,
};
pub use formgate_storage::{MemoryRowStore, RowStore, StoredRow, TableSchema, UnitOfWork};
