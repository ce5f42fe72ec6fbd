//! What the orchestrator is given, and what it returns

use crate::handler::ActionKind;
use formgate_core::{
    Message, Messages, RequestId, SessionId, Value, ViewState, CONTEXT_ID_PARAM,
    TRANSACTION_TOKEN_PARAM,
};
use formgate_session::ContextId;
use std::collections::BTreeMap;

/// How the request reached the orchestrator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dispatch {
    /// Fresh browser navigation
    #[default]
    Navigation,
    /// Internal same-request re-dispatch; replays the original parameters
    Forward,
}

/// One incoming request
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    /// Session the request belongs to
    pub session_id: SessionId,
    /// Requested view path
    pub path: String,
    /// What the request asks the page to do
    pub action: ActionKind,
    /// Submitted form, for pages with more than one
    pub form: Option<String>,
    /// Navigation or forward
    pub dispatch: Dispatch,
    /// Query and form parameters
    pub params: BTreeMap<String, Value>,
    /// View-state produced by the current request
    pub view_state: ViewState,
    /// Messages produced by the current request
    pub messages: Messages,
}

impl IncomingRequest {
    /// Request with no parameters, view-state or messages
    pub fn new(session_id: SessionId, path: impl Into<String>, action: ActionKind) -> Self {
        Self {
            session_id,
            path: path.into(),
            action,
            form: None,
            dispatch: Dispatch::Navigation,
            params: BTreeMap::new(),
            view_state: ViewState::new(),
            messages: Messages::new(),
        }
    }

    /// Plain page request
    pub fn page(session_id: SessionId, path: impl Into<String>) -> Self {
        Self::new(session_id, path, ActionKind::Page)
    }

    /// State-changing submit
    pub fn submit(session_id: SessionId, path: impl Into<String>) -> Self {
        Self::new(session_id, path, ActionKind::Submit)
    }

    /// Mark as an internal forward
    pub fn forwarded(mut self) -> Self {
        self.dispatch = Dispatch::Forward;
        self
    }

    /// Name the submitted form
    pub fn with_form(mut self, form: impl Into<String>) -> Self {
        self.form = Some(form.into());
        self
    }

    /// Add a parameter
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Carry a transaction token, if any
    pub fn with_token(self, token: Option<&str>) -> Self {
        match token {
            Some(t) => self.with_param(TRANSACTION_TOKEN_PARAM, t),
            None => self,
        }
    }

    /// Carry a context id
    pub fn with_context(self, id: &ContextId) -> Self {
        self.with_param(CONTEXT_ID_PARAM, id.as_str())
    }

    /// Set the current view-state
    pub fn with_view_state(mut self, view_state: ViewState) -> Self {
        self.view_state = view_state;
        self
    }

    /// Add a message produced by the current request
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Whether the request is an internal forward
    pub fn is_forward(&self) -> bool {
        self.dispatch == Dispatch::Forward
    }

    /// The `transactionToken` parameter
    pub fn transaction_token(&self) -> Option<&str> {
        self.params.get(TRANSACTION_TOKEN_PARAM).and_then(Value::as_str)
    }

    /// The `contextId` parameter
    pub fn context_id(&self) -> Option<ContextId> {
        self.params
            .get(CONTEXT_ID_PARAM)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(ContextId::new)
    }
}

/// Render a view in place
#[derive(Debug, Clone, PartialEq)]
pub struct RenderInstruction {
    /// View path
    pub view: String,
    /// Final view-state
    pub view_state: ViewState,
    /// Messages to show
    pub messages: Messages,
    /// Fresh token to embed in the view's state-changing form
    pub transaction_token: Option<String>,
}

/// The orchestrator's answer
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Render a view in place
    Render(RenderInstruction),
    /// Redirect the browser
    Redirect {
        /// Target URL, carrying `contextId` exactly once
        url: String,
        /// The context saved for the target request
        context_id: ContextId,
    },
    /// Show the generic error page
    ErrorPage {
        /// Generic failure notice
        message: Message,
        /// Correlation id of the failed request, as logged
        request_id: RequestId,
    },
}

impl Outcome {
    /// The render instruction, if this is a render
    pub fn as_render(&self) -> Option<&RenderInstruction> {
        match self {
            Self::Render(r) => Some(r),
            _ => None,
        }
    }

    /// The redirect URL, if this is a redirect
    pub fn redirect_url(&self) -> Option<&str> {
        match self {
            Self::Redirect { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Whether this is the generic error page
    pub fn is_error_page(&self) -> bool {
        matches!(self, Self::ErrorPage { .. })
    }
}
