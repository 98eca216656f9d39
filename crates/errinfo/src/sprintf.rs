//! Runtime template formatting for message templates that live in VM values.
//!
//! Rust-side callers format with `format_args!`; this is only used where the
//! template itself is data, as with deferred `NameError` messages.

use std::fmt;

use crate::value::Value;

/// Failure to format a runtime template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The template references more arguments than were supplied.
    TooFewArguments,
    /// `%d` was applied to something that is not an integer.
    NotAnInteger(String),
    /// The template ends with a bare `%` or uses an unknown directive.
    MalformedDirective(char),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewArguments => f.write_str("too few arguments"),
            Self::NotAnInteger(class_name) => write!(f, "can't convert {class_name} into Integer"),
            Self::MalformedDirective('%') => f.write_str("incomplete format specifier; use %% (double %) instead"),
            Self::MalformedDirective(c) => write!(f, "malformed format string - %{c}"),
        }
    }
}

impl std::error::Error for FormatError {}

/// Formats `template` with `args`.
///
/// Supported directives:
/// - `%s`: the argument's `to_s`
/// - `%p`: the argument's `inspect`, or its generic form when inspection fails
/// - `%d` / `%i`: an integer argument
/// - `%%`: a literal percent sign
pub fn sprintf(template: &str, args: &[Value]) -> Result<String, FormatError> {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('s') => {
                let arg = args.next().ok_or(FormatError::TooFewArguments)?;
                out.push_str(&arg.to_s());
            }
            Some('p') => {
                let arg = args.next().ok_or(FormatError::TooFewArguments)?;
                out.push_str(&arg.inspect().unwrap_or_else(|| arg.any_to_s()));
            }
            Some('d' | 'i') => match args.next().ok_or(FormatError::TooFewArguments)? {
                Value::Int(i) => out.push_str(&i.to_string()),
                other => return Err(FormatError::NotAnInteger(other.class_name().to_owned())),
            },
            Some(other) => return Err(FormatError::MalformedDirective(other)),
            None => return Err(FormatError::MalformedDirective('%')),
        }
    }
    Ok(out)
}
