//! Field-level validation
//!
//! Two kinds of checks run in the `VALIDATED` step: required-field checks
//! driven by [`MetadataProvider`], and any number of [`StructuralValidator`]s
//! supplied by the application. Both produce field-scoped messages; none of
//! them mutate state.

use crate::metadata::MetadataProvider;
use formgate_core::{FieldLookup, Message, RequestContext};

/// Message code of a required-field failure
pub const REQUIRED_CODE: &str = "e.required";

/// Application-supplied validation over the submitted input
pub trait StructuralValidator: Send + Sync {
    /// Messages for every problem found in `input` of `form`; empty if valid
    fn validate(&self, form: &str, input: &dyn FieldLookup, ctx: &RequestContext) -> Vec<Message>;
}

impl<F> StructuralValidator for F
where
    F: Fn(&str, &dyn FieldLookup, &RequestContext) -> Vec<Message> + Send + Sync,
{
    fn validate(&self, form: &str, input: &dyn FieldLookup, ctx: &RequestContext) -> Vec<Message> {
        self(form, input, ctx)
    }
}

/// One error message per required field of `form` missing or blank in `input`
///
/// `template` is the message text; `{0}` receives the field label.
pub fn check_required(
    metadata: &dyn MetadataProvider,
    form: &str,
    input: &dyn FieldLookup,
    ctx: &RequestContext,
    template: &str,
) -> Vec<Message> {
    metadata
        .fields(form)
        .into_iter()
        .filter(|field| metadata.is_required(form, field, ctx.login.as_ref()))
        .filter(|field| input.lookup(field).map_or(true, |v| v.is_blank()))
        .map(|field| {
            Message::error(REQUIRED_CODE, template)
                .with_arg(metadata.label(form, &field))
                .for_field(field)
        })
        .collect()
}
