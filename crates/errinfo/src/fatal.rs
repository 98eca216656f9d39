//! Internal bug reports.
//!
//! An invariant violation inside the runtime is not an exception: it is
//! reported once, with the runtime description and the call stack, and then the
//! process aborts. There is no way back from here.

use std::{
    borrow::Cow,
    fmt::{self, Write as _},
    io,
};

use crate::{
    config::ErrorConfig,
    context::SourcePosition,
    io::{DiagnosticWriter, StderrWriter, StdoutWriter},
    known_errors::strerrno,
    os_error::strerror,
};

/// Everything that goes into a bug report.
#[derive(Debug, Clone)]
pub struct BugReport<'a> {
    pub position: &'a SourcePosition,
    pub message: String,
    pub description: &'a str,
    pub bug_report_url: &'a str,
    /// Call stack, outermost frame first.
    pub frames: &'a [String],
}

impl BugReport<'_> {
    /// The report after the position prefix.
    #[must_use]
    pub fn body(&self) -> String {
        let mut out = String::new();
        // writing to a String cannot fail
        let _ = self.write_body(&mut out);
        out
    }

    fn write_body(&self, out: &mut String) -> fmt::Result {
        write!(out, "[BUG] {}\n{}\n\n", self.message, self.description)?;
        if !self.frames.is_empty() {
            out.push_str("-- call stack ----------------------------------------\n");
            for frame in self.frames {
                writeln!(out, "{frame}")?;
            }
            out.push('\n');
        }
        write!(
            out,
            "[NOTE]\n\
             You may have encountered a bug in the runtime or extension libraries.\n\
             Bug reports are welcome.\n\
             For details: {}\n\n",
            self.bug_report_url
        )
    }
}

/// Writes `report` to `primary`, or to `secondary` if the position prefix cannot
/// be written to `primary`.
pub fn report_bug<'w>(
    primary: &'w mut dyn DiagnosticWriter,
    secondary: &'w mut dyn DiagnosticWriter,
    report: &BugReport<'_>,
) -> io::Result<()> {
    let prefix = report.position.to_string();
    let out: &'w mut dyn DiagnosticWriter = if primary.stderr_write(Cow::Borrowed(&prefix)).is_ok() {
        primary
    } else {
        secondary.stderr_write(Cow::Borrowed(&prefix))?;
        secondary
    };
    out.stderr_write(Cow::Owned(report.body()))
}

/// Writes `report` to `stream`, falling back to stdout, and aborts.
pub(crate) fn abort_with_report(stream: &mut dyn DiagnosticWriter, report: &BugReport<'_>) -> ! {
    tracing::error!(message = %report.message, "internal bug, aborting");
    if let Err(err) = report_bug(stream, &mut StdoutWriter, report) {
        tracing::error!(%err, "failed to write bug report");
    }
    std::process::abort()
}

/// Reports a bug hit before any execution context exists and aborts.
pub(crate) fn startup_bug(args: fmt::Arguments<'_>) -> ! {
    let config = ErrorConfig::default();
    let report = BugReport {
        position: &SourcePosition::default(),
        message: args.to_string(),
        description: &config.description,
        bug_report_url: &config.bug_report_url,
        frames: &[],
    };
    abort_with_report(&mut StderrWriter, &report)
}

/// Message of a bug report for an unexpected OS error.
///
/// `context: errno == 0 (NOERROR)` for a zero code, otherwise the description
/// followed by the symbolic name or, failing that, the number.
#[must_use]
pub fn errno_bug_message(context: &str, errno: i32) -> String {
    if errno == 0 {
        return format!("{context}: errno == 0 (NOERROR)");
    }
    match strerrno(errno) {
        Some(name) => format!("{context}: {} ({name})", strerror(errno)),
        None => format!("{context}: {} ({errno})", strerror(errno)),
    }
}
