//! Compile diagnostics.
//!
//! While a compilation unit is parsed, every error is funnelled into the
//! context's current error slot. In strict mode each diagnostic goes to the
//! stream right away and the slot only records that something failed. In
//! lenient mode nothing is streamed; the diagnostics are joined with newlines
//! into the message of a single `SyntaxError` that the compiler driver picks up
//! afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    context::{ExecutionContext, SourcePosition},
    io::DiagnosticWriter,
    taxonomy::BuiltinClass,
};

/// Message of the placeholder error recorded in strict mode.
pub const COMPILE_ERROR_PLACEHOLDER: &str = "compile error";

/// Whether compile errors are streamed or merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileErrorMode {
    /// Stream each diagnostic immediately.
    #[default]
    Strict,
    /// Accumulate diagnostics into the pending `SyntaxError`.
    Lenient,
}

impl<W: DiagnosticWriter> ExecutionContext<W> {
    #[must_use]
    pub fn compile_mode(&self) -> CompileErrorMode {
        self.config().compile_mode
    }

    pub fn set_compile_mode(&mut self, mode: CompileErrorMode) {
        self.config_mut().compile_mode = mode;
    }

    /// Records a compile error at `file:line`.
    pub fn compile_error(&mut self, file: Option<&str>, line: u32, args: fmt::Arguments<'_>) {
        let text = format!("{}{args}", SourcePosition::new(file, line));
        self.err_append(&text);
    }

    /// Adds detail to the latest compile error. No position is added.
    pub fn compile_error_append(&mut self, args: fmt::Arguments<'_>) {
        self.err_append(&args.to_string());
    }

    /// Prints a compile warning unless warnings are off.
    pub fn compile_warn(&mut self, file: Option<&str>, line: u32, args: fmt::Arguments<'_>) {
        if self.verbosity().warnings_enabled() {
            self.compile_warn_print(file, line, args);
        }
    }

    /// Prints a compile warning in verbose mode only.
    pub fn compile_warning(&mut self, file: Option<&str>, line: u32, args: fmt::Arguments<'_>) {
        if self.verbosity().is_verbose() {
            self.compile_warn_print(file, line, args);
        }
    }

    fn compile_warn_print(&mut self, file: Option<&str>, line: u32, args: fmt::Arguments<'_>) {
        let text = format!("{}warning: {args}", SourcePosition::new(file, line));
        self.emit_line(&text);
    }

    fn err_append(&mut self, text: &str) {
        match self.compile_mode() {
            CompileErrorMode::Lenient => {
                let message = match self.errinfo_mut() {
                    None => text.to_owned(),
                    Some(pending) => {
                        let mut message = pending
                            .to_display_string()
                            .unwrap_or_else(|_| pending.class_name().to_owned());
                        message.push('\n');
                        message.push_str(text);
                        message
                    }
                };
                tracing::debug!(len = message.len(), "merged compile error");
                let merged = self.runtime().new_error(BuiltinClass::SyntaxError, message);
                self.set_errinfo(Some(merged));
            }
            CompileErrorMode::Strict => {
                if self.errinfo().is_none() {
                    let placeholder = self
                        .runtime()
                        .new_error(BuiltinClass::SyntaxError, COMPILE_ERROR_PLACEHOLDER);
                    self.set_errinfo(Some(placeholder));
                }
                self.emit_line(text);
            }
        }
    }
}
