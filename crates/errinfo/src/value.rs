//! The slice of runtime values the error subsystem needs to look at.
//!
//! The surrounding VM owns the real object model. Error construction, backtrace
//! validation and deferred message rendering only ever need to classify a value,
//! ask for its class name, or obtain a short printable form of it, so this module
//! models exactly that much and nothing more.

use std::fmt::{self, Write};

use strum::{Display, IntoStaticStr};

use crate::message::DeferredNameErrorMessage;

/// A value handed to the error subsystem by the VM.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    #[default]
    Nil,
    True,
    False,
    Int(i64),
    Str(String),
    Symbol(String),
    Array(Vec<Self>),
    /// Any other heap object, described by its class and how it inspects.
    Object(OpaqueObject),
    /// A deferred `NameError` message standing in for a string.
    NameErrorMessage(Box<DeferredNameErrorMessage>),
    /// Internal "no value" marker. Must never reach user-visible code.
    Undef,
}

/// A VM object the error subsystem only knows from the outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueObject {
    class_name: String,
    /// Result of calling `inspect` on the object; `None` when inspection raises.
    inspect: Option<String>,
    /// Name of the native struct wrapped by a typed data object.
    data_type: Option<String>,
    is_data: bool,
    frozen: bool,
}

impl OpaqueObject {
    /// Creates a plain object of the given class whose `inspect` returns `inspect`.
    #[must_use]
    pub fn new(class_name: impl Into<String>, inspect: Option<String>) -> Self {
        Self {
            class_name: class_name.into(),
            inspect,
            data_type: None,
            is_data: false,
            frozen: false,
        }
    }

    /// Creates a native data object. `data_type` is the wrapped struct name for typed data.
    #[must_use]
    pub fn data(class_name: impl Into<String>, data_type: Option<String>) -> Self {
        Self {
            class_name: class_name.into(),
            inspect: None,
            data_type,
            is_data: true,
            frozen: false,
        }
    }

    #[must_use]
    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    #[must_use]
    pub fn data_type(&self) -> Option<&str> {
        self.data_type.as_deref()
    }

    #[must_use]
    pub fn is_data(&self) -> bool {
        self.is_data
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

/// Builtin type tags used by `check_type`.
///
/// The string form is the name printed in "expected ..." messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum ValueType {
    #[strum(serialize = "nil")]
    Nil,
    Object,
    String,
    Array,
    Integer,
    Symbol,
    #[strum(serialize = "true")]
    True,
    #[strum(serialize = "false")]
    False,
    Data,
    #[strum(serialize = "undef")]
    Undef,
}

impl Value {
    /// Convenience constructor for string values.
    #[must_use]
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Convenience constructor for symbol values.
    #[must_use]
    pub fn symbol(s: impl Into<String>) -> Self {
        Self::Symbol(s.into())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Returns the builtin type tag of this value.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Nil => ValueType::Nil,
            Self::True => ValueType::True,
            Self::False => ValueType::False,
            Self::Int(_) => ValueType::Integer,
            Self::Str(_) => ValueType::String,
            Self::Symbol(_) => ValueType::Symbol,
            Self::Array(_) => ValueType::Array,
            Self::Object(obj) if obj.is_data => ValueType::Data,
            Self::NameErrorMessage(_) => ValueType::Data,
            Self::Object(_) => ValueType::Object,
            Self::Undef => ValueType::Undef,
        }
    }

    /// Returns the name of the value's class.
    #[must_use]
    pub fn class_name(&self) -> &str {
        match self {
            Self::Nil => "NilClass",
            Self::True => "TrueClass",
            Self::False => "FalseClass",
            Self::Int(_) => "Integer",
            Self::Str(_) => "String",
            Self::Symbol(_) => "Symbol",
            Self::Array(_) => "Array",
            Self::Object(obj) => obj.class_name(),
            Self::NameErrorMessage(_) => "NameError::message",
            Self::Undef => "undef",
        }
    }

    /// Returns the `inspect` representation, or `None` if inspection fails.
    #[must_use]
    pub fn inspect(&self) -> Option<String> {
        let mut out = String::new();
        self.inspect_fmt(&mut out).ok()?;
        Some(out)
    }

    fn inspect_fmt(&self, f: &mut impl Write) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("nil"),
            Self::True => f.write_str("true"),
            Self::False => f.write_str("false"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => inspect_str(f, s),
            Self::Symbol(s) => write!(f, ":{s}"),
            Self::Array(items) => {
                f.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.inspect_fmt(f)?;
                }
                f.write_char(']')
            }
            Self::Object(obj) => match &obj.inspect {
                Some(s) => f.write_str(s),
                None => Err(fmt::Error),
            },
            Self::NameErrorMessage(_) | Self::Undef => f.write_str(&self.any_to_s()),
        }
    }

    /// Returns the generic `#<ClassName>` form used when nothing better is available.
    #[must_use]
    pub fn any_to_s(&self) -> String {
        format!("#<{}>", self.class_name())
    }

    /// Returns the `to_s` string conversion of the value.
    #[must_use]
    pub fn to_s(&self) -> String {
        match self {
            Self::Nil => String::new(),
            Self::Str(s) | Self::Symbol(s) => s.clone(),
            Self::Int(i) => i.to_string(),
            Self::True => "true".to_owned(),
            Self::False => "false".to_owned(),
            Self::Array(_) => self.inspect().unwrap_or_else(|| self.any_to_s()),
            Self::NameErrorMessage(msg) => match msg.render() {
                Ok(Some(s)) => s,
                _ => self.any_to_s(),
            },
            Self::Object(_) | Self::Undef => self.any_to_s(),
        }
    }
}

/// Writes `s` as a double-quoted literal that reads back as the same string.
fn inspect_str(f: &mut impl Write, s: &str) -> fmt::Result {
    f.write_char('"')?;
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '\x0C' => f.write_str("\\f")?,
            '\x0B' => f.write_str("\\v")?,
            '\x08' => f.write_str("\\b")?,
            '\x07' => f.write_str("\\a")?,
            '\x1B' => f.write_str("\\e")?,
            // `#` only needs escaping where it would start an interpolation
            '#' if matches!(chars.peek(), Some('{' | '$' | '@')) => f.write_str("\\#")?,
            c if c.is_ascii_control() => write!(f, "\\x{:02X}", u32::from(c))?,
            c if c.is_control() => write!(f, "\\u{:04X}", u32::from(c))?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        if b { Self::True } else { Self::False }
    }
}

impl From<DeferredNameErrorMessage> for Value {
    fn from(msg: DeferredNameErrorMessage) -> Self {
        Self::NameErrorMessage(Box::new(msg))
    }
}
