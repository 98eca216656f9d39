//! The process-wide error runtime: class tree, errno registry, constructors and
//! the raise entry points used by the VM.

use std::{
    fmt, io,
    sync::{Arc, OnceLock},
};

use crate::{
    error_object::{Args, Capability, ErrorLike, ErrorObject, ExtraFields, check_arity},
    exception_private::{RunError, RunResult},
    fatal,
    message::Message,
    os_error::{peek_last_errno, strerror},
    registry::SystemErrorRegistry,
    taxonomy::{BuiltinClass, ExceptionClass, Initializer, Taxonomy, TaxonomyError},
    value::Value,
};

/// Raises a builtin exception with a formatted message.
///
/// Evaluates to a [`RunError`](crate::RunError); callers decide whether to
/// return it.
///
/// ```
/// use errinfo::{BuiltinClass, raise};
///
/// let err = raise!(TypeError, "can't convert {} into {}", "nil", "Integer");
/// assert!(err.is_exception_type(BuiltinClass::TypeError));
/// ```
#[macro_export]
macro_rules! raise {
    ($builtin:ident, $($fmt:tt)+) => {
        $crate::BuiltinClass::$builtin.raise(::std::format!($($fmt)+))
    };
}

static GLOBAL: OnceLock<ErrorRuntime> = OnceLock::new();

/// The class tree and errno registry shared by every execution context.
#[derive(Debug)]
pub struct ErrorRuntime {
    taxonomy: Taxonomy,
    syserr: SystemErrorRegistry,
    /// Builtin classes indexed by [`BuiltinClass::index`].
    builtins: Vec<Arc<ExceptionClass>>,
}

/// Which class a `SystemCallError` constructor call produces.
enum SyscallTarget {
    /// The class the constructor was invoked on.
    Receiver,
    /// A registry-backed `Errno::*` class.
    Errno(Arc<ExceptionClass>),
}

impl ErrorRuntime {
    /// Returns the process-wide runtime, building it on first use.
    ///
    /// A failure to build the builtin classes is an internal bug and aborts.
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(|| match Self::boot() {
            Ok(runtime) => runtime,
            Err(err) => fatal::startup_bug(format_args!("failed to initialize exception classes: {err}")),
        })
    }

    fn boot() -> Result<Self, TaxonomyError> {
        let taxonomy = Taxonomy::with_builtins()?;
        let builtins = BuiltinClass::ALL
            .iter()
            .map(|&builtin| {
                taxonomy.builtin(builtin).ok_or_else(|| TaxonomyError::MissingParent {
                    name: builtin.to_string(),
                    parent: builtin.parent().map(|p| p.to_string()).unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let syserr = SystemErrorRegistry::new(&taxonomy)?;
        tracing::debug!(
            classes = taxonomy.len(),
            errnos = syserr.len(),
            "error runtime initialized"
        );
        Ok(Self {
            taxonomy,
            syserr,
            builtins,
        })
    }

    #[must_use]
    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    #[must_use]
    pub fn syserr(&self) -> &SystemErrorRegistry {
        &self.syserr
    }

    /// Returns the node of a builtin class.
    #[must_use]
    pub fn class(&self, builtin: BuiltinClass) -> Arc<ExceptionClass> {
        Arc::clone(&self.builtins[builtin.index()])
    }

    /// Defines (or returns the existing) subclass `name` of `parent`.
    pub fn define_class(&self, name: &str, parent: &Arc<ExceptionClass>) -> RunResult<Arc<ExceptionClass>> {
        self.taxonomy
            .define(name, parent)
            .map_err(|err| raise!(TypeError, "{err}"))
    }

    /// Returns the `Errno::*` class for `errno`, synthesizing it if needed.
    pub fn errno_class(&self, errno: i32) -> RunResult<Arc<ExceptionClass>> {
        self.syserr
            .lookup(&self.taxonomy, errno)
            .map_err(|err| raise!(TypeError, "{err}"))
    }

    /// Builds an error of a builtin class with a plain message, without running
    /// the class's constructor.
    #[must_use]
    pub fn new_error(&self, builtin: BuiltinClass, message: impl Into<String>) -> ErrorObject {
        ErrorObject::new(self.class(builtin), Some(Message::Plain(message.into())))
    }

    /// `class.new(*args)`: runs the constructor the class inherits.
    pub fn construct(&self, class: &Arc<ExceptionClass>, args: &[Value]) -> RunResult<ErrorObject> {
        let args: Args = args.iter().cloned().collect();
        let class = Arc::clone(class);
        match class.initializer() {
            Initializer::Generic => ErrorObject::init_generic(class, args),
            Initializer::SystemExit => ErrorObject::init_exit(class, args),
            Initializer::NameError => ErrorObject::init_name(class, args),
            Initializer::NoMethodError => ErrorObject::init_no_method(class, args),
            Initializer::SystemCallError => self.init_system_call(&class, args),
        }
    }

    /// `SystemCallError.new(msg, errno)` and `Errno::EXXX.new(msg = nil)`.
    ///
    /// On the generic class an errno selects the matching `Errno::*` class up
    /// front; the object is then created directly with that class.
    fn init_system_call(&self, class: &Arc<ExceptionClass>, mut args: Args) -> RunResult<ErrorObject> {
        let (mesg, errno, target) = if Arc::ptr_eq(class, self.syserr.base()) {
            check_arity(args.len(), 1, 2)?;
            let error = if args.len() == 2 { args.pop() } else { None };
            let mut mesg = args.pop().unwrap_or_default();
            let error = match error {
                Some(error) => error,
                None if matches!(mesg, Value::Int(_)) => std::mem::take(&mut mesg),
                None => Value::Nil,
            };
            let errno = errno_from_value(&error)?;
            let target = match errno {
                Some(errno) => SyscallTarget::Errno(self.errno_class(errno)?),
                None => SyscallTarget::Receiver,
            };
            (mesg, errno, target)
        } else {
            check_arity(args.len(), 0, 1)?;
            let mesg = args.pop().unwrap_or_default();
            let Some(errno) = class.errno_constant() else {
                return Err(self.name_error("Errno", format_args!("uninitialized constant {class}::Errno")));
            };
            (mesg, Some(errno), SyscallTarget::Receiver)
        };

        let class = match target {
            SyscallTarget::Receiver => Arc::clone(class),
            SyscallTarget::Errno(errno_class) => errno_class,
        };
        let description = errno.map_or_else(|| "unknown error".to_owned(), strerror);
        let message = match mesg {
            Value::Nil => description,
            other => format!("{description} - {}", string_value(other)?),
        };
        Ok(ErrorObject::with_fields(
            class,
            Some(Message::Plain(message)),
            ExtraFields::SystemCall { errno },
        ))
    }

    /// `class === candidate`.
    ///
    /// For `SystemCallError` itself, any error in its hierarchy and any object
    /// with an errno matches. For `Errno::*` classes the candidate's errno must
    /// equal the class's `Errno` constant. Other classes match their instances.
    pub fn case_match(&self, class: &Arc<ExceptionClass>, candidate: &dyn ErrorLike) -> RunResult<bool> {
        let candidate_error = candidate.as_error_object();
        if !class.is_kind_of(self.syserr.base()) {
            return Ok(candidate_error.is_some_and(|exc| exc.class().is_kind_of(class)));
        }

        let errno = candidate.errno_field();
        let is_syserr = candidate_error.is_some_and(|exc| exc.is_kind_of(BuiltinClass::SystemCallError));
        if !is_syserr && errno == Capability::Absent {
            return Ok(false);
        }
        if Arc::ptr_eq(class, self.syserr.base()) {
            return Ok(true);
        }

        let Some(expected) = class.errno_constant() else {
            return Err(self.name_error("Errno", format_args!("uninitialized constant {class}::Errno")));
        };
        Ok(errno.into_option().flatten() == Some(expected))
    }

    /// Raises `class` with a formatted message, through the class's constructor.
    pub fn raise(&self, class: &Arc<ExceptionClass>, args: fmt::Arguments<'_>) -> RunError {
        self.construct(class, &[Value::Str(args.to_string())])
            .map_or_else(|err| err, RunError::from)
    }

    /// Raises a `LoadError`.
    pub fn load_error(&self, args: fmt::Arguments<'_>) -> RunError {
        self.new_error(BuiltinClass::LoadError, args.to_string()).into()
    }

    /// Raises a `LoadError` for `path` described by the current OS error.
    pub fn load_fail(&self, path: &str) -> RunError {
        self.load_error(format_args!("{} -- {path}", strerror(peek_last_errno())))
    }

    /// Raises a `NotImplementedError` naming the unsupported `function`.
    pub fn not_implemented(&self, function: &str) -> RunError {
        self.new_error(
            BuiltinClass::NotImplementedError,
            format!("{function}() function is unimplemented on this machine"),
        )
        .into()
    }

    /// Raises an uncatchable `fatal` error.
    pub fn fatal(&self, args: fmt::Arguments<'_>) -> RunError {
        RunError::Fatal(Box::new(self.new_error(BuiltinClass::Fatal, args.to_string())))
    }

    /// Builds the `Errno::*` error for `errno` with an optional message.
    pub fn errno_error(&self, errno: i32, message: Option<&str>) -> RunError {
        let class = match self.errno_class(errno) {
            Ok(class) => class,
            Err(err) => return err,
        };
        let arg = message.map_or(Value::Nil, Value::str);
        self.construct(&class, std::slice::from_ref(&arg))
            .map_or_else(|err| err, RunError::from)
    }

    /// Translates an `io::Error` into the matching `SystemCallError`.
    ///
    /// Errors without an OS code become a generic `SystemCallError` with an
    /// unknown error description.
    pub fn from_io_error(&self, err: &io::Error, context: &str) -> RunError {
        match err.raw_os_error() {
            Some(errno) => self.errno_error(errno, Some(context)),
            None => self.raise(self.syserr.base(), format_args!("{context}")),
        }
    }

    /// Raises a `RuntimeError` for a modification of a frozen `what`.
    pub fn error_frozen(&self, what: &str) -> RunError {
        self.new_error(BuiltinClass::RuntimeError, format!("can't modify frozen {what}"))
            .into()
    }

    /// Fails if `value` is frozen.
    pub fn check_frozen(&self, value: &Value) -> RunResult<()> {
        match value {
            Value::Object(obj) if obj.is_frozen() => Err(self.error_frozen(obj.class_name())),
            _ => Ok(()),
        }
    }

    /// Raises a `NameError` whose `name` is the symbol `name`.
    pub fn name_error(&self, name: &str, args: fmt::Arguments<'_>) -> RunError {
        let class = self.class(BuiltinClass::NameError);
        self.construct(&class, &[Value::Str(args.to_string()), Value::symbol(name)])
            .map_or_else(|err| err, RunError::from)
    }

    /// Raises an `ArgumentError` for a string that is not a valid `type_name`.
    pub fn invalid_str(&self, s: &str, type_name: &str) -> RunError {
        let inspected = Value::str(s).inspect().unwrap_or_default();
        self.new_error(
            BuiltinClass::ArgumentError,
            format!("invalid value for {type_name}: {inspected}"),
        )
        .into()
    }

    /// Raises the `TypeError` for a value of kind `actual` where `expected` was required.
    pub fn wrong_argument_type(&self, actual: &str, expected: &str) -> RunError {
        self.new_error(
            BuiltinClass::TypeError,
            format!("wrong argument type {actual} (expected {expected})"),
        )
        .into()
    }
}

impl BuiltinClass {
    /// Builds an error of this class with a plain message.
    #[must_use]
    pub fn new_error(self, message: impl Into<String>) -> ErrorObject {
        ErrorRuntime::global().new_error(self, message)
    }

    /// Like [`Self::new_error`], wrapped for propagation.
    #[must_use]
    pub fn raise(self, message: impl Into<String>) -> RunError {
        match self {
            Self::Fatal => RunError::Fatal(Box::new(self.new_error(message))),
            _ => self.new_error(message).into(),
        }
    }
}

fn errno_from_value(value: &Value) -> RunResult<Option<i32>> {
    match value {
        Value::Nil => Ok(None),
        Value::Int(n) => i32::try_from(*n)
            .map(Some)
            .map_err(|_| raise!(RangeError, "integer {n} too big to convert to `int'")),
        other => Err(raise!(TypeError, "can't convert {} into Integer", other.class_name())),
    }
}

fn string_value(value: Value) -> RunResult<String> {
    match value {
        Value::Str(s) => Ok(s),
        Value::NameErrorMessage(deferred) => Ok(deferred.render()?.unwrap_or_default()),
        other => Err(raise!(TypeError, "can't convert {} into String", other.class_name())),
    }
}
