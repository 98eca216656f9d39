//! Per-execution-context state: the current error slot, the source position,
//! the call stack used by bug reports, and the diagnostic stream.
//!
//! Nothing in here is shared between contexts, so none of it is locked.

use std::{borrow::Cow, fmt};

use crate::{
    config::{ErrorConfig, Verbosity},
    error_object::ErrorObject,
    exception_private::{RunError, RunResult},
    fatal::{self, BugReport},
    io::DiagnosticWriter,
    os_error::{peek_last_errno, strerror, take_last_errno},
    runtime::ErrorRuntime,
    value::{Value, ValueType},
};

/// File and line the VM is currently executing or compiling.
///
/// Displays as the prefix put in front of positioned diagnostics: nothing when
/// the file is unknown, `file: ` when the line is 0, `file:line: ` otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePosition {
    pub file: Option<String>,
    pub line: u32,
}

impl SourcePosition {
    #[must_use]
    pub fn new(file: Option<impl Into<String>>, line: u32) -> Self {
        Self {
            file: file.map(Into::into),
            line,
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (None, _) => Ok(()),
            (Some(file), 0) => write!(f, "{file}: "),
            (Some(file), line) => write!(f, "{file}:{line}: "),
        }
    }
}

/// One thread of execution as seen by the error subsystem.
pub struct ExecutionContext<W: DiagnosticWriter> {
    runtime: &'static ErrorRuntime,
    /// The current error, also used by the compiler driver as the pending
    /// compile error.
    errinfo: Option<ErrorObject>,
    position: SourcePosition,
    /// Call stack, outermost frame first.
    frames: Vec<String>,
    config: ErrorConfig,
    stream: W,
}

impl<W: DiagnosticWriter> ExecutionContext<W> {
    /// Creates a context writing diagnostics to `stream`.
    pub fn new(config: ErrorConfig, stream: W) -> Self {
        Self {
            runtime: ErrorRuntime::global(),
            errinfo: None,
            position: SourcePosition::default(),
            frames: Vec::new(),
            config,
            stream,
        }
    }

    #[must_use]
    pub fn runtime(&self) -> &'static ErrorRuntime {
        self.runtime
    }

    #[must_use]
    pub fn config(&self) -> &ErrorConfig {
        &self.config
    }

    pub(crate) fn config_mut(&mut self) -> &mut ErrorConfig {
        &mut self.config
    }

    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        self.config.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: Verbosity) {
        self.config.verbosity = verbosity;
    }

    #[must_use]
    pub fn errinfo(&self) -> Option<&ErrorObject> {
        self.errinfo.as_ref()
    }

    pub fn errinfo_mut(&mut self) -> Option<&mut ErrorObject> {
        self.errinfo.as_mut()
    }

    /// Reads and clears the current error.
    pub fn take_errinfo(&mut self) -> Option<ErrorObject> {
        self.errinfo.take()
    }

    pub fn set_errinfo(&mut self, errinfo: Option<ErrorObject>) {
        self.errinfo = errinfo;
    }

    #[must_use]
    pub fn position(&self) -> &SourcePosition {
        &self.position
    }

    pub fn set_source_position(&mut self, file: Option<impl Into<String>>, line: u32) {
        self.position = SourcePosition::new(file, line);
    }

    pub fn push_frame(&mut self, frame: impl Into<String>) {
        self.frames.push(frame.into());
    }

    pub fn pop_frame(&mut self) -> Option<String> {
        self.frames.pop()
    }

    #[must_use]
    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    #[must_use]
    pub fn stream(&self) -> &W {
        &self.stream
    }

    pub fn into_stream(self) -> W {
        self.stream
    }

    /// Writes `text` and a newline. Stream failures are logged and dropped;
    /// diagnostics never interrupt execution.
    pub(crate) fn emit_line(&mut self, text: &str) {
        let result = self
            .stream
            .stderr_write(Cow::Borrowed(text))
            .and_then(|()| self.stream.stderr_push('\n'));
        if let Err(err) = result {
            tracing::warn!(%err, "failed to write diagnostic");
        }
    }

    fn emit_warning(&mut self, args: fmt::Arguments<'_>) {
        let line = format!("{}warning: {args}", self.position);
        self.emit_line(&line);
    }

    /// Prints a positioned warning unless warnings are off.
    pub fn warn(&mut self, args: fmt::Arguments<'_>) {
        if self.config.verbosity.warnings_enabled() {
            self.emit_warning(args);
        }
    }

    /// Prints a positioned warning in verbose mode only.
    pub fn warning(&mut self, args: fmt::Arguments<'_>) {
        if self.config.verbosity.is_verbose() {
            self.emit_warning(args);
        }
    }

    /// The user-facing `warn(msg)`: the message and a line separator, unpositioned.
    pub fn warn_m(&mut self, message: &Value) {
        if self.config.verbosity.warnings_enabled() {
            self.emit_line(&message.to_s());
        }
    }

    /// Verbose-only warning suffixed with the description of the current OS
    /// error. The OS error code is left untouched.
    pub fn sys_warning(&mut self, args: fmt::Arguments<'_>) {
        let errno = peek_last_errno();
        if self.config.verbosity.is_verbose() {
            self.emit_warning(format_args!("{args}: {}", strerror(errno)));
        }
    }

    /// Raises the `Errno::*` error for the current OS error, which is cleared.
    ///
    /// Being called without a pending OS error is an internal bug.
    pub fn sys_fail(&mut self, message: Option<&str>) -> RunError {
        let errno = take_last_errno();
        if errno == 0 {
            self.bug(format_args!("sys_fail({}) - errno == 0", message.unwrap_or_default()));
        }
        self.runtime.errno_error(errno, message)
    }

    /// Fails unless `value` has the builtin type `expected`.
    ///
    /// Typed data never passes a plain `Data` check. An `undef` value is an
    /// internal bug.
    pub fn check_type(&mut self, value: &Value, expected: ValueType) -> RunResult<()> {
        let actual = value.value_type();
        if actual == ValueType::Undef {
            self.bug(format_args!("undef leaked to user space"));
        }
        let typed_data = actual == ValueType::Data && typed_data_name(value).is_some();
        if actual == expected && !typed_data {
            return Ok(());
        }
        let etype = match value {
            Value::Nil => "nil",
            Value::True => "true",
            Value::False => "false",
            other => other.class_name(),
        };
        Err(self.runtime.wrong_argument_type(etype, &expected.to_string()))
    }

    /// Fails unless `value` is typed data wrapping a `struct_name`.
    pub fn check_typed_data(&mut self, value: &Value, struct_name: &str) -> RunResult<()> {
        if value.value_type() != ValueType::Data {
            self.check_type(value, ValueType::Data)?;
        }
        match typed_data_name(value) {
            Some(name) if name == struct_name => Ok(()),
            Some(name) => Err(self.runtime.wrong_argument_type(name, struct_name)),
            None => Err(self.runtime.wrong_argument_type(value.class_name(), struct_name)),
        }
    }

    /// Reports an internal bug at the current position and aborts.
    pub fn bug(&mut self, args: fmt::Arguments<'_>) -> ! {
        let report = BugReport {
            position: &self.position,
            message: args.to_string(),
            description: &self.config.description,
            bug_report_url: &self.config.bug_report_url,
            frames: &self.frames,
        };
        fatal::abort_with_report(&mut self.stream, &report)
    }

    /// Reports an internal bug at an explicit compile position and aborts.
    pub fn compile_bug(&mut self, file: Option<&str>, line: u32, args: fmt::Arguments<'_>) -> ! {
        let position = SourcePosition::new(file, line);
        let report = BugReport {
            position: &position,
            message: args.to_string(),
            description: &self.config.description,
            bug_report_url: &self.config.bug_report_url,
            frames: &self.frames,
        };
        fatal::abort_with_report(&mut self.stream, &report)
    }

    /// Reports an internal bug caused by an unexpected OS error and aborts.
    pub fn bug_errno(&mut self, context: &str, errno: i32) -> ! {
        let message = fatal::errno_bug_message(context, errno);
        self.bug(format_args!("{message}"))
    }
}

impl<W: DiagnosticWriter + fmt::Debug> fmt::Debug for ExecutionContext<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("errinfo", &self.errinfo)
            .field("position", &self.position)
            .field("frames", &self.frames)
            .field("config", &self.config)
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

/// Struct name of a typed data value, `None` for anything else.
fn typed_data_name(value: &Value) -> Option<&str> {
    match value {
        Value::Object(obj) if obj.is_data() => obj.data_type(),
        Value::NameErrorMessage(_) => Some("name_err_mesg"),
        _ => None,
    }
}
