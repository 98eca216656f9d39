//! Error objects and their class-specific constructors.

use std::{fmt, sync::Arc};

use smallvec::SmallVec;

use crate::{
    exception_private::RunResult,
    message::Message,
    raise,
    sprintf::FormatError,
    taxonomy::{BuiltinClass, ExceptionClass, Initializer},
    value::Value,
};

/// Status stored by `SystemExit` when none is given.
pub const EXIT_SUCCESS: i64 = 0;

/// Positional constructor arguments. Specialized constructors pop their trailing
/// arguments off the end before handing the rest to the generic one.
pub type Args = SmallVec<[Value; 3]>;

/// Attributes declared by specialized exception classes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExtraFields {
    #[default]
    None,
    Exit {
        status: i64,
    },
    Name {
        name: Value,
    },
    NoMethod {
        name: Value,
        args: Value,
    },
    SystemCall {
        errno: Option<i32>,
    },
}

impl ExtraFields {
    fn default_for(initializer: Initializer) -> Self {
        match initializer {
            Initializer::Generic => Self::None,
            Initializer::SystemExit => Self::Exit { status: EXIT_SUCCESS },
            Initializer::NameError => Self::Name { name: Value::Nil },
            Initializer::NoMethodError => Self::NoMethod {
                name: Value::Nil,
                args: Value::Nil,
            },
            Initializer::SystemCallError => Self::SystemCall { errno: None },
        }
    }
}

/// Result of asking a value for an optional capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability<T> {
    Present(T),
    Absent,
}

impl<T> Capability<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent => None,
        }
    }
}

impl<T> From<Option<T>> for Capability<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Self::Present)
    }
}

/// Anything that can be compared against an error or case-matched by
/// `SystemCallError`.
///
/// Objects that do not support an accessor report [`Capability::Absent`]; this
/// is never an error.
pub trait ErrorLike {
    /// The underlying error object, if this is one.
    fn as_error_object(&self) -> Option<&ErrorObject> {
        None
    }

    /// The object's `message`. Absent when unsupported or when rendering fails.
    fn renders_message(&self) -> Capability<String>;

    /// The object's `backtrace`.
    fn renders_backtrace(&self) -> Capability<Option<Vec<String>>>;

    /// The object's `errno` attribute or accessor.
    fn errno_field(&self) -> Capability<Option<i32>> {
        Capability::Absent
    }
}

impl ErrorLike for Value {
    fn renders_message(&self) -> Capability<String> {
        Capability::Absent
    }

    fn renders_backtrace(&self) -> Capability<Option<Vec<String>>> {
        Capability::Absent
    }
}

/// An instance of an exception class.
#[derive(Debug, Clone)]
pub struct ErrorObject {
    class: Arc<ExceptionClass>,
    message: Option<Message>,
    backtrace: Option<Vec<String>>,
    fields: ExtraFields,
}

impl ErrorObject {
    /// Creates an error with the default attributes of its class and no backtrace.
    #[must_use]
    pub fn new(class: Arc<ExceptionClass>, message: Option<Message>) -> Self {
        let fields = ExtraFields::default_for(class.initializer());
        Self {
            class,
            message,
            backtrace: None,
            fields,
        }
    }

    pub(crate) fn with_fields(class: Arc<ExceptionClass>, message: Option<Message>, fields: ExtraFields) -> Self {
        Self {
            class,
            message,
            backtrace: None,
            fields,
        }
    }

    /// `Exception.new(msg = nil)`.
    pub(crate) fn init_generic(class: Arc<ExceptionClass>, mut args: Args) -> RunResult<Self> {
        check_arity(args.len(), 0, 1)?;
        let message = args.pop().and_then(Message::from_value);
        Ok(Self::new(class, message))
    }

    /// `SystemExit.new(status = 0, msg = nil)`. The status is only taken when the
    /// first argument is an integer.
    pub(crate) fn init_exit(class: Arc<ExceptionClass>, mut args: Args) -> RunResult<Self> {
        let status = match args.first() {
            Some(Value::Int(status)) => {
                let status = *status;
                args.remove(0);
                status
            }
            _ => EXIT_SUCCESS,
        };
        let mut exc = Self::init_generic(class, args)?;
        exc.fields = ExtraFields::Exit { status };
        Ok(exc)
    }

    /// `NameError.new(msg = nil, name = nil)`.
    pub(crate) fn init_name(class: Arc<ExceptionClass>, mut args: Args) -> RunResult<Self> {
        let name = pop_trailing(&mut args, 1);
        let mut exc = Self::init_generic(class, args)?;
        exc.fields = ExtraFields::Name { name };
        Ok(exc)
    }

    /// `NoMethodError.new(msg = nil, name = nil, args = nil)`.
    pub(crate) fn init_no_method(class: Arc<ExceptionClass>, mut args: Args) -> RunResult<Self> {
        let call_args = pop_trailing(&mut args, 2);
        let name = pop_trailing(&mut args, 1);
        let mut exc = Self::init_generic(class, args)?;
        exc.fields = ExtraFields::NoMethod { name, args: call_args };
        Ok(exc)
    }

    #[must_use]
    pub fn class(&self) -> &Arc<ExceptionClass> {
        &self.class
    }

    #[must_use]
    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    /// Returns true if this error's class is `builtin` or descends from it.
    #[must_use]
    pub fn is_kind_of(&self, builtin: BuiltinClass) -> bool {
        self.class.is_kind_of_builtin(builtin)
    }

    /// The stored message, as given to the constructor.
    #[must_use]
    pub fn raw_message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    #[must_use]
    pub fn fields(&self) -> &ExtraFields {
        &self.fields
    }

    /// Returns the message text, or the class name when there is none.
    ///
    /// A deferred message is rendered here and the rendered text replaces it, so
    /// later calls return the same string without formatting again.
    pub fn to_display_string(&mut self) -> Result<String, FormatError> {
        if let Some(Message::Deferred(deferred)) = &self.message
            && let Some(rendered) = deferred.render()?
        {
            self.message = Some(Message::Plain(rendered));
        }
        self.render_message()
    }

    /// Same as [`Self::to_display_string`].
    pub fn message(&mut self) -> Result<String, FormatError> {
        self.to_display_string()
    }

    /// Renders the message without storing the result.
    pub fn render_message(&self) -> Result<String, FormatError> {
        let rendered = match &self.message {
            Some(message) => message.render()?,
            None => None,
        };
        Ok(rendered.unwrap_or_else(|| self.class.name().to_owned()))
    }

    /// `#<ClassName: message>`, or just the class name for an empty message.
    pub fn inspect(&mut self) -> Result<String, FormatError> {
        let display = self.to_display_string()?;
        if display.is_empty() {
            Ok(self.class.name().to_owned())
        } else {
            Ok(format!("#<{}: {display}>", self.class.name()))
        }
    }

    #[must_use]
    pub fn backtrace(&self) -> Option<&[String]> {
        self.backtrace.as_deref()
    }

    /// Validates and stores a backtrace given as a VM value.
    pub fn set_backtrace(&mut self, backtrace: Value) -> RunResult<()> {
        self.backtrace = check_backtrace(backtrace)?;
        Ok(())
    }

    /// Stores an already validated backtrace.
    pub fn set_backtrace_lines(&mut self, lines: Vec<String>) {
        self.backtrace = Some(lines);
    }

    /// Structural equality.
    ///
    /// Errors of the same class compare message and backtrace fields directly.
    /// Anything else is compared through its `message` and `backtrace` accessors;
    /// if it lacks either, the result is `false`.
    #[must_use]
    pub fn equals(&self, other: &dyn ErrorLike) -> bool {
        if let Some(obj) = other.as_error_object() {
            if std::ptr::eq(self, obj) {
                return true;
            }
            if self.class == obj.class {
                return self.message == obj.message && self.backtrace == obj.backtrace;
            }
        }

        let Capability::Present(message) = other.renders_message() else {
            return false;
        };
        let Capability::Present(backtrace) = other.renders_backtrace() else {
            return false;
        };
        let own = self.message.as_ref().and_then(Message::as_plain);
        own == Some(message.as_str()) && self.backtrace == backtrace
    }

    /// `exc.exception(msg)`: with no argument a copy of the receiver, otherwise a
    /// copy carrying the new message and no backtrace. An exception argument goes
    /// through [`Self::exception_from`].
    pub fn exception(&self, args: &[Value]) -> RunResult<Self> {
        let Some(arg) = args.first() else {
            return Ok(self.clone());
        };
        check_arity(args.len(), 0, 1)?;
        let mut copy = self.clone();
        copy.message = Message::from_value(arg.clone());
        copy.backtrace = None;
        Ok(copy)
    }

    /// `exc.exception(obj)` where `obj` may be an exception itself.
    ///
    /// Passing the receiver returns it unchanged, backtrace included. Any other
    /// object becomes the message of a copy, as its `message` renders.
    #[must_use]
    pub fn exception_from(&self, arg: &dyn ErrorLike) -> Self {
        if arg.as_error_object().is_some_and(|obj| std::ptr::eq(self, obj)) {
            return self.clone();
        }
        let mut copy = self.clone();
        copy.message = arg.renders_message().into_option().map(Message::Plain);
        copy.backtrace = None;
        copy
    }

    /// Exit status of a `SystemExit`.
    #[must_use]
    pub fn status(&self) -> Option<i64> {
        match self.fields {
            ExtraFields::Exit { status } => Some(status),
            _ => None,
        }
    }

    /// `success?`: true unless a nonzero exit status is recorded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status().is_none_or(|status| status == EXIT_SUCCESS)
    }

    /// Member name of a `NameError`.
    #[must_use]
    pub fn name(&self) -> Option<&Value> {
        match &self.fields {
            ExtraFields::Name { name } | ExtraFields::NoMethod { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Call arguments of a `NoMethodError`.
    #[must_use]
    pub fn args(&self) -> Option<&Value> {
        match &self.fields {
            ExtraFields::NoMethod { args, .. } => Some(args),
            _ => None,
        }
    }

    /// Error number of a `SystemCallError`.
    #[must_use]
    pub fn errno(&self) -> Option<i32> {
        match self.fields {
            ExtraFields::SystemCall { errno } => errno,
            _ => None,
        }
    }
}

impl ErrorLike for ErrorObject {
    fn as_error_object(&self) -> Option<&Self> {
        Some(self)
    }

    fn renders_message(&self) -> Capability<String> {
        self.render_message().ok().into()
    }

    fn renders_backtrace(&self) -> Capability<Option<Vec<String>>> {
        Capability::Present(self.backtrace.clone())
    }

    fn errno_field(&self) -> Capability<Option<i32>> {
        match self.fields {
            ExtraFields::SystemCall { errno } => Capability::Present(errno),
            _ => Capability::Absent,
        }
    }
}

impl fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render_message() {
            Ok(message) => write!(f, "{message} ({})", self.class),
            Err(err) => write!(f, "{} (message could not be formatted: {err})", self.class),
        }
    }
}

/// Accepts `nil`, a string (promoted to one line) or an array of strings.
pub fn check_backtrace(backtrace: Value) -> RunResult<Option<Vec<String>>> {
    const MESSAGE: &str = "backtrace must be Array of String";
    match backtrace {
        Value::Nil => Ok(None),
        Value::Str(line) => Ok(Some(vec![line])),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Str(line) => Ok(line),
                _ => Err(raise!(TypeError, "{MESSAGE}")),
            })
            .collect::<RunResult<Vec<_>>>()
            .map(Some),
        _ => Err(raise!(TypeError, "{MESSAGE}")),
    }
}

/// Fails with `ArgumentError` unless `min <= given <= max`.
pub(crate) fn check_arity(given: usize, min: usize, max: usize) -> RunResult<()> {
    if (min..=max).contains(&given) {
        return Ok(());
    }
    let expected = if min == max {
        min.to_string()
    } else {
        format!("{min}..{max}")
    };
    Err(raise!(ArgumentError, "wrong number of arguments ({given} for {expected})"))
}

/// Pops the last argument if more than `keep` are present.
fn pop_trailing(args: &mut Args, keep: usize) -> Value {
    if args.len() > keep {
        args.pop().unwrap_or_default()
    } else {
        Value::Nil
    }
}
