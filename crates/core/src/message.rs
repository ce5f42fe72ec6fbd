//! Validation and info messages
//!
//! Messages are ordered: the order in which they were produced is the order
//! in which they render, and that order survives a redirect hop.

use crate::field::FieldLookup;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Severity of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageLevel {
    /// Informational notice
    Info,
    /// Confirmation that an action succeeded
    Success,
    /// Non-blocking warning
    Warning,
    /// Blocking error (validation, conflict)
    Error,
}

/// A single user-visible message
///
/// `text` is a template: `{0}`, `{1}`, ... substitute positional `args`;
/// `{some.path}` substitutes a field of the source passed to [`Message::render`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Severity
    pub level: MessageLevel,
    /// Stable message code (e.g. `"e.required"`)
    pub code: String,
    /// Template text
    pub text: String,
    /// Field this message is scoped to, if any
    pub field: Option<String>,
    /// Positional template arguments
    pub args: Vec<Value>,
}

impl Message {
    /// Create a message with the given level
    pub fn new(level: MessageLevel, code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            level,
            code: code.into(),
            text: text.into(),
            field: None,
            args: Vec::new(),
        }
    }

    /// Create an info message
    pub fn info(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Info, code, text)
    }

    /// Create a success message
    pub fn success(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Success, code, text)
    }

    /// Create a warning message
    pub fn warning(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Warning, code, text)
    }

    /// Create an error message
    pub fn error(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Error, code, text)
    }

    /// Scope this message to a form field
    pub fn for_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Append a positional template argument
    pub fn with_arg(mut self, arg: impl Into<Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Render the template
    ///
    /// Unknown placeholders and unterminated braces are left as written.
    pub fn render(&self, source: Option<&dyn FieldLookup>) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                out.push_str(&rest[open..]);
                return out;
            };
            let name = &after[..close];
            match self.resolve(name, source) {
                Some(v) => out.push_str(&v.to_string()),
                None => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            }
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        out
    }

    fn resolve(&self, name: &str, source: Option<&dyn FieldLookup>) -> Option<Value> {
        if let Ok(index) = name.parse::<usize>() {
            return self.args.get(index).cloned();
        }
        source.and_then(|s| s.lookup(name))
    }
}

/// Ordered list of pending messages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Messages(Vec<Message>);

impl Messages {
    /// Create an empty message list
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.0.push(message);
    }

    /// Append every message from `other`, preserving order
    pub fn extend(&mut self, other: impl IntoIterator<Item = Message>) {
        self.0.extend(other);
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no messages
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any message has `Error` level
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|m| m.level == MessageLevel::Error)
    }

    /// Messages scoped to the given field
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a Message> + 'a {
        self.0.iter().filter(move |m| m.field.as_deref() == Some(field))
    }

    /// Iterate in production order
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.0.iter()
    }

    /// Consume into the underlying vector
    pub fn into_vec(self) -> Vec<Message> {
        self.0
    }
}

impl From<Vec<Message>> for Messages {
    fn from(messages: Vec<Message>) -> Self {
        Self(messages)
    }
}

impl IntoIterator for Messages {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Messages {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view_state::ViewState;

    #[test]
    fn test_render_positional_args() {
        let msg = Message::error("e.required", "{0} is required").with_arg("Name");
        assert_eq!(msg.render(None), "Name is required");
    }

    #[test]
    fn test_render_field_placeholders() {
        let mut view = ViewState::new();
        view.insert("order.number", Value::from("A-17"));
        let msg = Message::success("i.saved", "Order {order.number} saved");
        assert_eq!(msg.render(Some(&view)), "Order A-17 saved");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let msg = Message::info("i", "{missing} and {3} and {unterminated");
        assert_eq!(msg.render(None), "{missing} and {3} and {unterminated");
    }

    #[test]
    fn test_messages_order_and_filters() {
        let mut messages = Messages::new();
        messages.push(Message::info("a", "first"));
        messages.push(Message::error("b", "second").for_field("email"));
        messages.push(Message::error("c", "third").for_field("name"));

        assert_eq!(messages.len(), 3);
        assert!(messages.has_errors());
        let codes: Vec<_> = messages.iter().map(|m| m.code.as_str()).collect();
        assert_eq!(codes, vec!["a", "b", "c"]);
        assert_eq!(messages.for_field("email").count(), 1);
    }

    #[test]
    fn test_info_only_has_no_errors() {
        let messages: Messages = vec![Message::success("ok", "done")].into();
        assert!(!messages.has_errors());
    }
}
