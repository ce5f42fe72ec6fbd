//! RequestLifecycleOrchestrator: one entry point per incoming request
//!
//! ## Lifecycle
//!
//! ```text
//! RECEIVED -> TOKEN_CHECKED -> CONTEXT_RESOLVED -> VALIDATED -> REDIRECT
//!     |                              |                 |
//!     +------------------------------+-----------------+------> RENDER
//! ```
//!
//! - `RECEIVED`: forward or fresh navigation is decided
//! - `TOKEN_CHECKED`: state-changing navigations consume their token; a
//!   forward replays an already-consumed one and skips the check
//! - `CONTEXT_RESOLVED`: a `contextId` parameter restores (and deletes) the
//!   snapshot saved before the redirect that led here; current keys win,
//!   inherited messages are taken only if the request brought none
//! - `VALIDATED`: required-field and structural checks; failures are
//!   appended after whatever messages were resolved and the form re-renders
//! - `REDIRECT`: after the caller's action succeeds, the view-state and
//!   messages are saved under a fresh context id carried on the target URL
//!
//! Duplicate submissions, validation failures and data-changed conflicts
//! become render instructions. Everything else is logged and becomes the
//! generic error page.

use crate::config::{FormgateConfig, MessageConfig};
use crate::handler::{ActionKind, PageHandler};
use crate::metadata::MetadataProvider;
use crate::redirect::{strip_reserved, RedirectUrl};
use crate::request::{IncomingRequest, Outcome, RenderInstruction};
use crate::validate::{check_required, StructuralValidator};
use formgate_core::limits::is_reserved;
use formgate_core::{
    ErrorCategory, FormgateError, FormgateResult, Message, Messages, RequestContext, Value,
    ViewState, CONTEXT_ID_PARAM,
};
use formgate_session::{RedirectContextStore, Session, SessionRegistry, TransactionTokenStore};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info_span, warn};

/// Message code of the duplicate-submission notice
pub const DUPLICATE_SUBMISSION_CODE: &str = "i.duplicateSubmission";
/// Message code of the data-changed notice
pub const DATA_CHANGED_CODE: &str = "w.dataChanged";
/// Message code of the generic failure notice
pub const GENERIC_FAILURE_CODE: &str = "e.genericFailure";

// ============================================================================
// Lifecycle states
// ============================================================================

/// Where a request is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Request accepted; dispatch kind known
    Received,
    /// Transaction token consumed or deliberately skipped
    TokenChecked,
    /// Redirect context restored or found absent
    ContextResolved,
    /// Validation passed
    Validated,
    /// Terminal: render in place
    Render,
    /// Terminal: redirect
    Redirect,
}

impl LifecycleState {
    /// Whether `next` may follow `self`
    pub fn can_advance_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Received, TokenChecked)
                | (Received, Render)
                | (TokenChecked, ContextResolved)
                | (ContextResolved, Validated)
                | (ContextResolved, Render)
                | (Validated, Render)
                | (Validated, Redirect)
        )
    }

    /// Whether the state ends the lifecycle
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Render | Self::Redirect)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "RECEIVED",
            Self::TokenChecked => "TOKEN_CHECKED",
            Self::ContextResolved => "CONTEXT_RESOLVED",
            Self::Validated => "VALIDATED",
            Self::Render => "RENDER",
            Self::Redirect => "REDIRECT",
        };
        f.write_str(name)
    }
}

struct Lifecycle {
    state: LifecycleState,
}

impl Lifecycle {
    fn new() -> Self {
        debug!(target: "formgate::lifecycle", state = %LifecycleState::Received, "Lifecycle started");
        Self {
            state: LifecycleState::Received,
        }
    }

    fn advance(&mut self, next: LifecycleState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal lifecycle transition {} -> {}",
            self.state,
            next
        );
        debug!(target: "formgate::lifecycle", from = %self.state, to = %next, "Lifecycle transition");
        self.state = next;
    }
}

// ============================================================================
// Action scope
// ============================================================================

/// What the caller's action sees once validation has passed
pub struct ActionScope<'a> {
    ctx: &'a RequestContext,
    form: &'a str,
    params: &'a BTreeMap<String, Value>,
    view_state: &'a mut ViewState,
    messages: &'a mut Messages,
    redirect_params: Vec<(String, String)>,
}

impl ActionScope<'_> {
    /// Request context
    pub fn ctx(&self) -> &RequestContext {
        self.ctx
    }

    /// The submitted form
    pub fn form(&self) -> &str {
        self.form
    }

    /// A submitted parameter
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// All submitted parameters
    pub fn params(&self) -> &BTreeMap<String, Value> {
        self.params
    }

    /// View-state carried to the redirect target
    pub fn view_state(&mut self) -> &mut ViewState {
        self.view_state
    }

    /// Queue a message for the redirect target
    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Add a query parameter to the redirect URL
    ///
    /// Reserved names are ignored.
    pub fn redirect_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.redirect_params.push((name.into(), value.into()));
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Coordinates token check, context restore, validation, and PRG per request
pub struct RequestLifecycleOrchestrator {
    sessions: Arc<SessionRegistry>,
    tokens: TransactionTokenStore,
    contexts: RedirectContextStore,
    metadata: Arc<dyn MetadataProvider>,
    validators: Vec<Arc<dyn StructuralValidator>>,
    messages: MessageConfig,
}

impl RequestLifecycleOrchestrator {
    /// Build from configuration
    ///
    /// # Errors
    ///
    /// Returns `FormgateError::Config` if the configuration is invalid.
    pub fn new(
        config: &FormgateConfig,
        sessions: Arc<SessionRegistry>,
        metadata: Arc<dyn MetadataProvider>,
    ) -> FormgateResult<Self> {
        config.validate()?;
        Ok(Self {
            sessions,
            tokens: config.token_store()?,
            contexts: config.context_store()?,
            metadata,
            validators: Vec::new(),
            messages: config.messages.clone(),
        })
    }

    /// Add a structural validator; validators run in registration order
    pub fn with_validator(mut self, validator: impl StructuralValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Session registry
    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Token store
    pub fn tokens(&self) -> &TransactionTokenStore {
        &self.tokens
    }

    /// Context store
    pub fn contexts(&self) -> &RedirectContextStore {
        &self.contexts
    }

    /// Handle a request that performs no action of its own
    pub fn handle_page(&self, handler: &PageHandler, request: IncomingRequest) -> Outcome {
        self.handle(handler, request, |_| Ok(()))
    }

    /// Handle one request
    ///
    /// `perform` runs only for `Submit` and `Search` actions, after
    /// validation has passed. Returning a recoverable error from it
    /// re-renders the form; any other error yields the error page.
    pub fn handle<F>(&self, handler: &PageHandler, request: IncomingRequest, perform: F) -> Outcome
    where
        F: FnOnce(&mut ActionScope<'_>) -> FormgateResult<()>,
    {
        let session = self.sessions.open(&request.session_id);
        let ctx = match session.request_context() {
            Ok(ctx) => ctx,
            Err(e) => return self.fatal(&RequestContext::new(request.session_id.clone()), e),
        };

        let span = info_span!(
            target: "formgate::lifecycle",
            "request",
            request_id = %ctx.request_id,
            session_id = %ctx.session_id,
            path = %request.path,
            action = ?request.action,
        );
        let _entered = span.enter();

        match self.run(handler, &session, &ctx, request, perform) {
            Ok(outcome) => outcome,
            Err(e) => self.fatal(&ctx, e),
        }
    }

    fn run<F>(
        &self,
        handler: &PageHandler,
        session: &Session,
        ctx: &RequestContext,
        request: IncomingRequest,
        perform: F,
    ) -> FormgateResult<Outcome>
    where
        F: FnOnce(&mut ActionScope<'_>) -> FormgateResult<()>,
    {
        let mut lifecycle = Lifecycle::new();
        let forwarded = request.is_forward();
        let token = request.transaction_token().map(str::to_string);
        let context_id = request.context_id();
        let IncomingRequest {
            path,
            action,
            form,
            params,
            mut view_state,
            mut messages,
            ..
        } = request;

        // TOKEN_CHECKED
        if action.is_state_changing() {
            if forwarded {
                debug!(target: "formgate::lifecycle", "Forwarded request; token check skipped");
            } else if let Err(e) = self.tokens.consume(session, token.as_deref()) {
                let view = handler.form_view().to_string();
                return self.recover(e, handler, session, &mut lifecycle, view, view_state, messages);
            }
        }
        lifecycle.advance(LifecycleState::TokenChecked);

        // CONTEXT_RESOLVED
        if let Some(id) = context_id {
            match self.contexts.restore(session, &id)? {
                Some(snapshot) => {
                    let inherited = view_state.merge_inherited(snapshot.view_state);
                    if messages.is_empty() {
                        messages = snapshot.pending_messages;
                    }
                    debug!(
                        target: "formgate::lifecycle",
                        context_id = %id,
                        inherited,
                        messages = messages.len(),
                        "Redirect context inherited"
                    );
                }
                None => {
                    debug!(target: "formgate::lifecycle", context_id = %id, "No redirect context; starting fresh");
                }
            }
        }
        lifecycle.advance(LifecycleState::ContextResolved);

        if action == ActionKind::Page {
            let view = handler.view_for(&path).to_string();
            return self.render(handler, session, &mut lifecycle, view, view_state, messages);
        }

        // VALIDATED
        let form = handler.resolve_form(form.as_deref()).ok_or_else(|| {
            FormgateError::contract(format!(
                "{} page has no form {:?}",
                handler.kind(),
                form
            ))
        })?;
        let mut failures = check_required(
            &*self.metadata,
            form,
            &params,
            ctx,
            &self.messages.required_field,
        );
        for validator in &self.validators {
            failures.extend(validator.validate(form, &params, ctx));
        }
        if !failures.is_empty() {
            echo_input(&mut view_state, &params);
            let view = handler.form_view().to_string();
            return self.recover(
                FormgateError::validation(failures),
                handler,
                session,
                &mut lifecycle,
                view,
                view_state,
                messages,
            );
        }
        lifecycle.advance(LifecycleState::Validated);

        let performed = {
            let mut scope = ActionScope {
                ctx,
                form,
                params: &params,
                view_state: &mut view_state,
                messages: &mut messages,
                redirect_params: Vec::new(),
            };
            perform(&mut scope).map(|()| scope.redirect_params)
        };
        let redirect_params = match performed {
            Ok(p) => p,
            Err(e) => {
                let view = handler.form_view().to_string();
                return self.recover(e, handler, session, &mut lifecycle, view, view_state, messages);
            }
        };

        // REDIRECT
        let context_id = self.contexts.save(session, &view_state, &messages)?;
        let mut url = RedirectUrl::parse(handler.success_target()).strip_reserved();
        for (name, value) in strip_reserved(redirect_params) {
            url = url.set(&name, &value);
        }
        let url = url.set(CONTEXT_ID_PARAM, context_id.as_str()).to_string();
        lifecycle.advance(LifecycleState::Redirect);
        debug!(target: "formgate::lifecycle", %url, "Redirecting");

        Ok(Outcome::Redirect { url, context_id })
    }

    /// Turn a recoverable error into a render of `view`; pass fatal ones up
    #[allow(clippy::too_many_arguments)]
    fn recover(
        &self,
        err: FormgateError,
        handler: &PageHandler,
        session: &Session,
        lifecycle: &mut Lifecycle,
        view: String,
        view_state: ViewState,
        mut messages: Messages,
    ) -> FormgateResult<Outcome> {
        match err.category() {
            ErrorCategory::Fatal => return Err(err),
            ErrorCategory::DuplicateSubmission => {
                warn!(target: "formgate::lifecycle", error = %err, "Duplicate submission");
                messages.push(Message::info(
                    DUPLICATE_SUBMISSION_CODE,
                    &self.messages.duplicate_submission,
                ));
            }
            ErrorCategory::DataChanged => {
                warn!(target: "formgate::lifecycle", error = %err, "Data changed under the edit");
                messages.push(Message::warning(DATA_CHANGED_CODE, &self.messages.data_changed));
            }
            ErrorCategory::Validation => {
                if let FormgateError::Validation { messages: failures } = err {
                    debug!(target: "formgate::lifecycle", failures = failures.len(), "Validation failed");
                    messages.extend(failures);
                }
            }
        }
        self.render(handler, session, lifecycle, view, view_state, messages)
    }

    fn render(
        &self,
        handler: &PageHandler,
        session: &Session,
        lifecycle: &mut Lifecycle,
        view: String,
        view_state: ViewState,
        messages: Messages,
    ) -> FormgateResult<Outcome> {
        let transaction_token = if handler.issues_token(&view) {
            Some(self.tokens.issue(session)?)
        } else {
            None
        };
        lifecycle.advance(LifecycleState::Render);
        debug!(target: "formgate::lifecycle", %view, messages = messages.len(), "Rendering");
        Ok(Outcome::Render(RenderInstruction {
            view,
            view_state,
            messages,
            transaction_token,
        }))
    }

    fn fatal(&self, ctx: &RequestContext, err: FormgateError) -> Outcome {
        error!(
            target: "formgate::lifecycle",
            request_id = %ctx.request_id,
            session_id = %ctx.session_id,
            error = %err,
            "Request failed"
        );
        Outcome::ErrorPage {
            message: Message::error(GENERIC_FAILURE_CODE, &self.messages.generic_failure),
            request_id: ctx.request_id,
        }
    }
}

/// Put the submitted input back into the view-state so the form keeps it
fn echo_input(view_state: &mut ViewState, params: &BTreeMap<String, Value>) {
    let input: ViewState = params
        .iter()
        .filter(|(k, _)| !is_reserved(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    view_state.apply(input);
}
