//! Page-handler variants
//!
//! Every page of an application has one of four shapes. The shape decides
//! which view is rendered for each action, where a successful submit
//! redirects to, and which views carry a state-changing form (and therefore
//! a transaction token).
//!
//! | Kind | Page action renders | Failed submit re-renders | Success redirects to | Token on |
//! |------|---------------------|--------------------------|----------------------|----------|
//! | `SingleForm` | view | view | view | view |
//! | `TwoForm` | view | view | view | view |
//! | `EditPair` | edit view | edit view | list view | edit view |
//! | `SearchListPair` | list view | search view | list view | none |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageKind {
    /// One view, one form
    SingleForm,
    /// One view, two independently submitted forms
    TwoForm,
    /// Edit view submitting back to a list view
    EditPair,
    /// Search view whose criteria drive a list view
    SearchListPair,
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SingleForm => "single-form",
            Self::TwoForm => "two-form",
            Self::EditPair => "edit-pair",
            Self::SearchListPair => "search-list-pair",
        };
        f.write_str(name)
    }
}

/// What a request asks the page to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Plain read: render the page
    Page,
    /// State-changing submit: token checked, validated, then redirected
    Submit,
    /// Read-only submit of search criteria: validated, then redirected
    Search,
}

impl ActionKind {
    /// Whether the action changes state and must present a transaction token
    pub fn is_state_changing(self) -> bool {
        matches!(self, Self::Submit)
    }
}

/// A page, by shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageHandler {
    /// One view, one form
    SingleForm {
        /// View path
        view: String,
        /// Form name
        form: String,
    },
    /// One view, two forms
    TwoForm {
        /// View path
        view: String,
        /// Form submitted when the request names none
        primary: String,
        /// The other form
        secondary: String,
    },
    /// Edit view plus list view
    EditPair {
        /// List view path, redirected to after a successful edit
        list_view: String,
        /// Edit view path
        edit_view: String,
        /// Edit form name
        form: String,
    },
    /// Search view plus list view
    SearchListPair {
        /// Search view path
        search_view: String,
        /// List view path
        list_view: String,
        /// Search form name
        form: String,
    },
}

impl PageHandler {
    /// Single-form page
    pub fn single_form(view: impl Into<String>, form: impl Into<String>) -> Self {
        Self::SingleForm {
            view: view.into(),
            form: form.into(),
        }
    }

    /// Two-form page
    pub fn two_form(
        view: impl Into<String>,
        primary: impl Into<String>,
        secondary: impl Into<String>,
    ) -> Self {
        Self::TwoForm {
            view: view.into(),
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    /// Edit/list pair
    pub fn edit_pair(
        list_view: impl Into<String>,
        edit_view: impl Into<String>,
        form: impl Into<String>,
    ) -> Self {
        Self::EditPair {
            list_view: list_view.into(),
            edit_view: edit_view.into(),
            form: form.into(),
        }
    }

    /// Search/list pair
    pub fn search_list_pair(
        search_view: impl Into<String>,
        list_view: impl Into<String>,
        form: impl Into<String>,
    ) -> Self {
        Self::SearchListPair {
            search_view: search_view.into(),
            list_view: list_view.into(),
            form: form.into(),
        }
    }

    /// The page's shape
    pub fn kind(&self) -> PageKind {
        match self {
            Self::SingleForm { .. } => PageKind::SingleForm,
            Self::TwoForm { .. } => PageKind::TwoForm,
            Self::EditPair { .. } => PageKind::EditPair,
            Self::SearchListPair { .. } => PageKind::SearchListPair,
        }
    }

    /// Forms the page accepts
    pub fn forms(&self) -> Vec<&str> {
        match self {
            Self::SingleForm { form, .. }
            | Self::EditPair { form, .. }
            | Self::SearchListPair { form, .. } => vec![form.as_str()],
            Self::TwoForm {
                primary, secondary, ..
            } => vec![primary.as_str(), secondary.as_str()],
        }
    }

    /// Form submitted when the request names none
    pub fn default_form(&self) -> &str {
        match self {
            Self::SingleForm { form, .. }
            | Self::EditPair { form, .. }
            | Self::SearchListPair { form, .. } => form,
            Self::TwoForm { primary, .. } => primary,
        }
    }

    /// Resolve the submitted form; `None` if the page has no such form
    pub fn resolve_form<'a>(&'a self, requested: Option<&'a str>) -> Option<&'a str> {
        match requested {
            None => Some(self.default_form()),
            Some(name) => self.forms().into_iter().find(|f| *f == name),
        }
    }

    /// View rendered for a plain page request
    pub fn page_view(&self) -> &str {
        match self {
            Self::SingleForm { view, .. } | Self::TwoForm { view, .. } => view,
            Self::EditPair { edit_view, .. } => edit_view,
            Self::SearchListPair { list_view, .. } => list_view,
        }
    }

    /// Every view of the page
    pub fn views(&self) -> Vec<&str> {
        match self {
            Self::SingleForm { view, .. } | Self::TwoForm { view, .. } => vec![view.as_str()],
            Self::EditPair {
                list_view,
                edit_view,
                ..
            } => vec![edit_view.as_str(), list_view.as_str()],
            Self::SearchListPair {
                search_view,
                list_view,
                ..
            } => vec![search_view.as_str(), list_view.as_str()],
        }
    }

    /// View rendered for a page request of `path`: `path` itself if it
    /// belongs to the page, the page view otherwise
    pub fn view_for<'a>(&'a self, path: &str) -> &'a str {
        self.views()
            .into_iter()
            .find(|v| *v == path)
            .unwrap_or_else(|| self.page_view())
    }

    /// View re-rendered when a submit fails
    pub fn form_view(&self) -> &str {
        match self {
            Self::SingleForm { view, .. } | Self::TwoForm { view, .. } => view,
            Self::EditPair { edit_view, .. } => edit_view,
            Self::SearchListPair { search_view, .. } => search_view,
        }
    }

    /// Redirect target after a successful submit
    pub fn success_target(&self) -> &str {
        match self {
            Self::SingleForm { view, .. } | Self::TwoForm { view, .. } => view,
            Self::EditPair { list_view, .. } | Self::SearchListPair { list_view, .. } => {
                list_view
            }
        }
    }

    /// Whether `view` carries a state-changing form
    pub fn issues_token(&self, view: &str) -> bool {
        match self {
            Self::SingleForm { view: v, .. } | Self::TwoForm { view: v, .. } => v == view,
            Self::EditPair { edit_view, .. } => edit_view == view,
            Self::SearchListPair { .. } => false,
        }
    }
}
