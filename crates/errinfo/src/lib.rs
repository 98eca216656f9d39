#![doc = include_str!("../../../README.md")]

mod aggregator;
mod config;
mod context;
mod error_object;
mod exception_private;
pub mod fatal;
mod io;
mod known_errors;
mod message;
pub mod os_error;
mod registry;
mod runtime;
mod sprintf;
mod taxonomy;
mod value;

pub use crate::{
    aggregator::{COMPILE_ERROR_PLACEHOLDER, CompileErrorMode},
    config::{DEFAULT_BUG_REPORT_URL, ErrorConfig, Verbosity},
    context::{ExecutionContext, SourcePosition},
    error_object::{Args, Capability, EXIT_SUCCESS, ErrorLike, ErrorObject, ExtraFields, check_backtrace},
    exception_private::{RunError, RunResult},
    fatal::BugReport,
    io::{CollectStringWriter, DiagnosticWriter, NoWriter, StderrWriter, StdoutWriter},
    known_errors::{known_errors, strerrno},
    message::{DeferredNameErrorMessage, MAX_RECEIVER_INSPECT, Message},
    registry::{NOERROR, SystemErrorRegistry},
    runtime::ErrorRuntime,
    sprintf::{FormatError, sprintf},
    taxonomy::{BuiltinClass, ClassId, ExceptionClass, Initializer, Taxonomy, TaxonomyError},
    value::{OpaqueObject, Value, ValueType},
};
