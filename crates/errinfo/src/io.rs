use std::{
    borrow::Cow,
    io::{self, Write as _},
};

/// Destination of diagnostic output: warnings, streamed compile errors and bug
/// reports.
///
/// Implement this trait to capture or redirect diagnostics. The default
/// implementation `StderrWriter` writes to the process's stderr.
pub trait DiagnosticWriter {
    /// Writes a piece of diagnostic text.
    ///
    /// Must not add separators or a trailing newline; those arrive through
    /// [`stderr_push`](Self::stderr_push).
    fn stderr_write(&mut self, output: Cow<'_, str>) -> io::Result<()>;

    /// Writes a single character, usually a line terminator.
    fn stderr_push(&mut self, end: char) -> io::Result<()>;

    /// Writes `line` followed by a newline.
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.stderr_write(Cow::Borrowed(line))?;
        self.stderr_push('\n')
    }
}

impl<W: DiagnosticWriter + ?Sized> DiagnosticWriter for &mut W {
    fn stderr_write(&mut self, output: Cow<'_, str>) -> io::Result<()> {
        (**self).stderr_write(output)
    }

    fn stderr_push(&mut self, end: char) -> io::Result<()> {
        (**self).stderr_push(end)
    }
}

/// Default `DiagnosticWriter` that writes to stderr.
#[derive(Debug, Default)]
pub struct StderrWriter;

impl DiagnosticWriter for StderrWriter {
    fn stderr_write(&mut self, output: Cow<'_, str>) -> io::Result<()> {
        io::stderr().write_all(output.as_bytes())
    }

    fn stderr_push(&mut self, end: char) -> io::Result<()> {
        let mut buf = [0; 4];
        let mut stderr = io::stderr();
        stderr.write_all(end.encode_utf8(&mut buf).as_bytes())?;
        if end == '\n' {
            stderr.flush()?;
        }
        Ok(())
    }
}

/// Writes diagnostics to stdout. Used as the fallback stream for bug reports.
#[derive(Debug, Default)]
pub struct StdoutWriter;

impl DiagnosticWriter for StdoutWriter {
    fn stderr_write(&mut self, output: Cow<'_, str>) -> io::Result<()> {
        io::stdout().write_all(output.as_bytes())
    }

    fn stderr_push(&mut self, end: char) -> io::Result<()> {
        let mut buf = [0; 4];
        let mut stdout = io::stdout();
        stdout.write_all(end.encode_utf8(&mut buf).as_bytes())?;
        stdout.flush()
    }
}

/// A `DiagnosticWriter` that collects all output into a string.
///
/// Useful for testing or for attaching diagnostics to a compile result.
#[derive(Debug, Default)]
pub struct CollectStringWriter(String);

impl CollectStringWriter {
    #[must_use]
    pub fn new() -> Self {
        Self(String::new())
    }

    /// Returns the collected output.
    #[must_use]
    pub fn output(&self) -> &str {
        self.0.as_str()
    }

    /// Consumes the writer and returns the collected output.
    #[must_use]
    pub fn into_output(self) -> String {
        self.0
    }
}

impl DiagnosticWriter for CollectStringWriter {
    fn stderr_write(&mut self, output: Cow<'_, str>) -> io::Result<()> {
        self.0.push_str(&output);
        Ok(())
    }

    fn stderr_push(&mut self, end: char) -> io::Result<()> {
        self.0.push(end);
        Ok(())
    }
}

/// `DiagnosticWriter` that ignores all output.
#[derive(Debug, Default)]
pub struct NoWriter;

impl DiagnosticWriter for NoWriter {
    fn stderr_write(&mut self, _output: Cow<'_, str>) -> io::Result<()> {
        Ok(())
    }

    fn stderr_push(&mut self, _end: char) -> io::Result<()> {
        Ok(())
    }
}
