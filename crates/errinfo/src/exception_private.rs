use std::fmt;

use crate::{error_object::ErrorObject, sprintf::FormatError, taxonomy::BuiltinClass};

pub type RunResult<T> = Result<T, RunError>;

/// An error travelling back to the VM's control-transfer machinery.
///
/// Two variants:
/// - `Exc`: an ordinary exception that user code may rescue
/// - `Fatal`: an instance of the `fatal` class, which cannot be rescued
#[derive(Debug, Clone)]
pub enum RunError {
    Exc(Box<ErrorObject>),
    Fatal(Box<ErrorObject>),
}

impl From<ErrorObject> for RunError {
    fn from(exc: ErrorObject) -> Self {
        Self::Exc(Box::new(exc))
    }
}

impl From<FormatError> for RunError {
    fn from(err: FormatError) -> Self {
        BuiltinClass::ArgumentError.raise(err.to_string())
    }
}

impl RunError {
    /// The carried error object.
    #[must_use]
    pub fn error(&self) -> &ErrorObject {
        match self {
            Self::Exc(exc) | Self::Fatal(exc) => exc,
        }
    }

    #[must_use]
    pub fn into_error(self) -> ErrorObject {
        match self {
            Self::Exc(exc) | Self::Fatal(exc) => *exc,
        }
    }

    /// Returns true if user code may rescue this error.
    #[must_use]
    pub fn is_catchable(&self) -> bool {
        matches!(self, Self::Exc(_))
    }

    /// Returns true if the error's class is `builtin` or one of its descendants.
    #[must_use]
    pub fn is_exception_type(&self, builtin: BuiltinClass) -> bool {
        self.error().is_kind_of(builtin)
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error().fmt(f)
    }
}

impl std::error::Error for RunError {}
