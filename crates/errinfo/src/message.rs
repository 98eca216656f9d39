//! Error messages, either plain text or deferred until read.
//!
//! Attribute and method lookup failures are common and usually rescued without
//! the message ever being looked at, so their text is described by a
//! [`DeferredNameErrorMessage`] and only formatted when someone asks for it.

use serde::{Serialize, Serializer, ser::Error as _};

use crate::{
    sprintf::{FormatError, sprintf},
    value::Value,
};

/// Longest receiver `inspect` output that is embedded in a deferred message.
pub const MAX_RECEIVER_INSPECT: usize = 65;

/// The message slot of an error object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Plain(String),
    Deferred(DeferredNameErrorMessage),
}

impl Message {
    /// Converts a constructor argument into a message. `nil` means no message.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Nil => None,
            Value::Str(s) => Some(Self::Plain(s)),
            Value::NameErrorMessage(deferred) => Some(Self::Deferred(*deferred)),
            other => Some(Self::Plain(other.to_s())),
        }
    }

    /// Renders the message. Plain text always renders to itself.
    pub fn render(&self) -> Result<Option<String>, FormatError> {
        match self {
            Self::Plain(s) => Ok(Some(s.clone())),
            Self::Deferred(deferred) => deferred.render(),
        }
    }

    /// Returns the text of an already rendered message.
    #[must_use]
    pub fn as_plain(&self) -> Option<&str> {
        match self {
            Self::Plain(s) => Some(s),
            Self::Deferred(_) => None,
        }
    }

    /// Converts the message back into the value handed to the constructor.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Plain(s) => Value::Str(s.clone()),
            Self::Deferred(deferred) => Value::from(deferred.clone()),
        }
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Self::Plain(s)
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Self::Plain(s.to_owned())
    }
}

impl From<DeferredNameErrorMessage> for Message {
    fn from(deferred: DeferredNameErrorMessage) -> Self {
        Self::Deferred(deferred)
    }
}

/// A `NameError` message held as its template, receiver and member name.
///
/// Rendering is recomputed on every call; two instances are equal when all three
/// slots are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredNameErrorMessage {
    template: Value,
    receiver: Value,
    member: Value,
}

impl DeferredNameErrorMessage {
    #[must_use]
    pub fn new(template: impl Into<Value>, receiver: Value, member: Value) -> Self {
        Self {
            template: template.into(),
            receiver,
            member,
        }
    }

    #[must_use]
    pub fn template(&self) -> &Value {
        &self.template
    }

    #[must_use]
    pub fn receiver(&self) -> &Value {
        &self.receiver
    }

    #[must_use]
    pub fn member(&self) -> &Value {
        &self.member
    }

    /// Formats the message, or returns `None` when there is no template.
    ///
    /// The template receives the member name and a description of the receiver,
    /// in that order. The description is the receiver's `inspect` output qualified
    /// with its class name (`nil:NilClass`, `"str":String`); receivers that fail
    /// to inspect or inspect too long are described generically (`#<Foo>`) and
    /// are not qualified.
    pub fn render(&self) -> Result<Option<String>, FormatError> {
        if self.template.is_nil() {
            return Ok(None);
        }
        let description = self.describe_receiver();
        sprintf(&self.template.to_s(), &[self.member.clone(), Value::Str(description)]).map(Some)
    }

    fn describe_receiver(&self) -> String {
        let receiver = &self.receiver;
        let mut desc = match receiver {
            Value::Nil => "nil".to_owned(),
            Value::True => "true".to_owned(),
            Value::False => "false".to_owned(),
            _ => match receiver.inspect() {
                Some(s) if s.len() <= MAX_RECEIVER_INSPECT => s,
                _ => receiver.any_to_s(),
            },
        };
        if !desc.starts_with('#') {
            desc.push(':');
            desc.push_str(receiver.class_name());
        }
        desc
    }

    /// Serialized form: the rendered string.
    pub fn dump(&self) -> Result<Option<String>, FormatError> {
        self.render()
    }

    /// Restores a dumped message. The lazy form is not reconstructed.
    #[must_use]
    pub fn load(dumped: String) -> String {
        dumped
    }
}

impl Serialize for DeferredNameErrorMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.dump().map_err(S::Error::custom)?.serialize(serializer)
    }
}
