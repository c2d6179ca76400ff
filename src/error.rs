//! Error types shared by the argument engine and the console.
//!
//! Two families live here: [`ProcessingError`], which is a user mistake on the
//! command line and is recovered from by printing one line, and [`ConfigError`],
//! which means a command type declared inconsistent metadata and is a bug in
//! that command.

use thiserror::Error;

/// A token that a [`Handler`](crate::handler::Handler) refused to convert.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value '{token}': {reason}")]
pub struct ConversionError {
    /// The raw token as typed by the user.
    pub token: String,
    /// Short human readable reason, e.g. "expected an integer".
    pub reason: String,
}

impl ConversionError {
    pub fn new(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            reason: reason.into(),
        }
    }
}

/// Failure while binding a token list onto a command.
///
/// Only one error is ever reported per invocation. Fields already assigned on the
/// target before the failure are left in place and must be treated as invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessingError {
    /// The token looks like an option but no option with that name is declared.
    #[error("unknown option '{0}'")]
    UndefinedOption(String),

    /// The option needs a value and none followed it.
    #[error("option '{0}' requires a value")]
    MissingOperand(String),

    /// A positional token was given to a command that takes none.
    #[error("no argument allowed, but found '{0}'")]
    NoArgumentAllowed(String),

    /// More positional tokens than declared arguments.
    #[error("too many arguments, unexpected '{0}'")]
    TooManyArguments(String),

    /// Carries the rendered syntax of the option, e.g. `-n, --name=NAME`.
    #[error("option '{0}' is required")]
    RequiredOptionMissing(String),

    /// Carries the help token of the argument, e.g. `TARGET`.
    #[error("argument {0} is required")]
    RequiredArgumentMissing(String),

    /// `target` is the rendered syntax of the option or the argument token.
    #[error("{target}: {source}")]
    TypeConversion {
        target: String,
        #[source]
        source: ConversionError,
    },
}

/// Inconsistent metadata found while discovering a command's descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("option name '{0}' is declared more than once")]
    DuplicateOption(String),

    #[error("argument index {0} is declared more than once")]
    DuplicateIndex(usize),

    #[error("no argument declared for index {0}")]
    IndexGap(usize),

    #[error("member '{0}' is declared both as an option and as an argument")]
    ConflictingMember(String),

    #[error("multi-valued argument at index {0} must be the last argument")]
    MultiValuedNotLast(usize),

    #[error("option for member '{0}' has neither a short nor a long name")]
    UnnamedOption(String),
}
