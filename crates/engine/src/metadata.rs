//! Field metadata: which fields a form has and which are required
//!
//! Whether a field is required can depend on who is asking. The provider is
//! handed the login identity of the current request (or `None` when
//! anonymous) and answers per field.

use formgate_core::LoginIdentity;
use std::collections::{BTreeMap, BTreeSet};

/// When a field is required
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequiredRule {
    /// Always required
    Always,
    /// Required only for logged-in users
    WhenLoggedIn,
    /// Required for users holding any of these authorities
    ForAuthorities(BTreeSet<String>),
    /// Never required
    Never,
}

impl RequiredRule {
    /// Rule requiring any of `authorities`
    pub fn for_authorities<I, S>(authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ForAuthorities(authorities.into_iter().map(Into::into).collect())
    }

    /// Evaluate the rule for `login`
    pub fn applies(&self, login: Option<&LoginIdentity>) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::WhenLoggedIn => login.is_some(),
            Self::ForAuthorities(required) => login
                .map(|l| required.iter().any(|a| l.has_authority(a)))
                .unwrap_or(false),
        }
    }
}

/// Answers field questions for the validation step
pub trait MetadataProvider: Send + Sync {
    /// Fields of `form`, in display order
    fn fields(&self, form: &str) -> Vec<String>;

    /// Whether `field` of `form` is required for `login`
    fn is_required(&self, form: &str, field: &str, login: Option<&LoginIdentity>) -> bool;

    /// Human-readable label of `field`
    fn label(&self, _form: &str, field: &str) -> String {
        field.to_string()
    }
}

#[derive(Debug, Clone)]
struct FieldMeta {
    name: String,
    label: String,
    rule: RequiredRule,
}

/// Metadata declared in code
///
/// # Example
///
/// ```
/// use formgate_engine::metadata::{MetadataProvider, RequiredRule, StaticMetadata};
///
/// let meta = StaticMetadata::new()
///     .field("order", "customer", "Customer", RequiredRule::Always)
///     .field("order", "note", "Note", RequiredRule::Never);
/// assert!(meta.is_required("order", "customer", None));
/// assert_eq!(meta.fields("order"), vec!["customer", "note"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata {
    forms: BTreeMap<String, Vec<FieldMeta>>,
}

impl StaticMetadata {
    /// No forms
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field; re-declaring a field replaces it in place
    pub fn field(
        mut self,
        form: impl Into<String>,
        name: impl Into<String>,
        label: impl Into<String>,
        rule: RequiredRule,
    ) -> Self {
        let meta = FieldMeta {
            name: name.into(),
            label: label.into(),
            rule,
        };
        let fields = self.forms.entry(form.into()).or_default();
        match fields.iter_mut().find(|f| f.name == meta.name) {
            Some(existing) => *existing = meta,
            None => fields.push(meta),
        }
        self
    }

    fn find(&self, form: &str, field: &str) -> Option<&FieldMeta> {
        self.forms.get(form)?.iter().find(|f| f.name == field)
    }
}

impl MetadataProvider for StaticMetadata {
    fn fields(&self, form: &str) -> Vec<String> {
        self.forms
            .get(form)
            .map(|fields| fields.iter().map(|f| f.name.clone()).collect())
            .unwrap_or_default()
    }

    fn is_required(&self, form: &str, field: &str, login: Option<&LoginIdentity>) -> bool {
        self.find(form, field)
            .map(|f| f.rule.applies(login))
            .unwrap_or(false)
    }

    fn label(&self, form: &str, field: &str) -> String {
        self.find(form, field)
            .map(|f| f.label.clone())
            .unwrap_or_else(|| field.to_string())
    }
}
