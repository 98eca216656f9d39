use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::aggregator::CompileErrorMode;

/// Where bug reports point users.
pub const DEFAULT_BUG_REPORT_URL: &str = "https://github.com/parcadei/errinfo/issues";

/// How chatty warnings are.
///
/// Mirrors the VM's tri-state verbose flag: unset disables warnings, `false` is
/// the default level and `true` also enables the verbose-only ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// Verbose flag unset: no warnings at all.
    Off,
    /// Verbose flag `false`.
    #[default]
    Default,
    /// Verbose flag `true`.
    Verbose,
}

impl Verbosity {
    /// Converts the VM's `Option<bool>` verbose flag.
    #[must_use]
    pub const fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            None => Self::Off,
            Some(false) => Self::Default,
            Some(true) => Self::Verbose,
        }
    }

    /// Warnings other than verbose-only ones are printed.
    #[must_use]
    pub const fn warnings_enabled(self) -> bool {
        !matches!(self, Self::Off)
    }

    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose)
    }
}

/// Settings for one execution context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorConfig {
    #[serde(default)]
    pub verbosity: Verbosity,
    #[serde(default)]
    pub compile_mode: CompileErrorMode,
    /// Runtime version line printed in bug reports.
    #[serde(default = "default_description")]
    pub description: Cow<'static, str>,
    /// Where bug reports tell users to go.
    #[serde(default = "default_bug_report_url")]
    pub bug_report_url: Cow<'static, str>,
}

fn default_description() -> Cow<'static, str> {
    Cow::Borrowed(concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION")))
}

fn default_bug_report_url() -> Cow<'static, str> {
    Cow::Borrowed(DEFAULT_BUG_REPORT_URL)
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::default(),
            compile_mode: CompileErrorMode::default(),
            description: default_description(),
            bug_report_url: default_bug_report_url(),
        }
    }
}

impl ErrorConfig {
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_compile_mode(mut self, compile_mode: CompileErrorMode) -> Self {
        self.compile_mode = compile_mode;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = description.into();
        self
    }
}
