//! Request lifecycle engine for Formgate
//!
//! This crate ties the lower layers into one per-request entry point:
//! - RequestLifecycleOrchestrator: token check, context restore,
//!   validation, and post-redirect-get for every request
//! - PageHandler: the four page shapes and which view each action renders
//! - Validation: metadata-driven required fields plus structural validators
//! - Redirect URLs: reserved parameters carried exactly once
//! - Configuration (`formgate.toml`) and tracing initialisation
//!
//! Row-level optimistic checks live in `formgate-concurrency`; a caller's
//! action runs them inside the orchestrator's `perform` closure, and a
//! conflict surfaces here as a data-changed render.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod handler;
pub mod metadata;
pub mod orchestrator;
pub mod redirect;
pub mod request;
pub mod telemetry;
pub mod validate;

pub use config::{
    ContextConfig, FormgateConfig, LogFormat, LoggingConfig, MessageConfig, TokenConfig,
    CONFIG_FILE_NAME,
};
pub use handler::{ActionKind, PageHandler, PageKind};
pub use metadata::{MetadataProvider, RequiredRule, StaticMetadata};
pub use orchestrator::{
    ActionScope, LifecycleState, RequestLifecycleOrchestrator, DATA_CHANGED_CODE,
    DUPLICATE_SUBMISSION_CODE, GENERIC_FAILURE_CODE,
};
pub use redirect::{append_param, strip_reserved, RedirectUrl};
pub use request::{Dispatch, IncomingRequest, Outcome, RenderInstruction};
pub use telemetry::init_tracing;
pub use validate::{check_required, StructuralValidator, REQUIRED_CODE};
