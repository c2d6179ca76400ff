//! Binds a token list onto a command instance.

use crate::descriptor::Arity;
use crate::discovery::Descriptors;
use crate::error::ProcessingError;
use crate::scanner::{self, OptionShape, ScanError, ScanMode};
use tracing::debug;

/// What a successful [`process`] call saw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Processed {
    present: Vec<&'static str>,
    overridden: bool,
}

impl Processed {
    /// Whether an option or argument bound to `member` was given.
    pub fn is_present(&self, member: &str) -> bool {
        self.present.iter().any(|m| *m == member)
    }

    /// Whether an override option suppressed the required checks.
    pub fn overridden(&self) -> bool {
        self.overridden
    }
}

/// Parses `tokens` against `descriptors` and stores the converted values on `target`.
///
/// On error the target may already hold some of the values; callers must not use it.
pub fn process<T, S: AsRef<str>>(
    target: &mut T,
    descriptors: &Descriptors<T>,
    tokens: &[S],
    mode: ScanMode,
) -> Result<Processed, ProcessingError> {
    let options = descriptors.options();
    let arguments = descriptors.arguments();

    let shapes: Vec<OptionShape<'_>> = options
        .iter()
        .map(|opt| OptionShape {
            short: opt.short(),
            long: opt.long(),
            arity: opt.arity(),
            optional_value: opt.is_value_optional(),
        })
        .collect();
    let scan = scanner::scan(&shapes, tokens, mode).map_err(|err| match err {
        ScanError::Undefined(token) | ScanError::UnexpectedValue(token) => {
            ProcessingError::UndefinedOption(token)
        }
        ScanError::MissingValue(index) => ProcessingError::MissingOperand(options[index].syntax()),
    })?;

    let mut option_seen = vec![false; options.len()];
    for occurrence in &scan.occurrences {
        let opt = &options[occurrence.option];
        let values: Vec<&str> = match (&occurrence.value, opt.arity(), opt.separator()) {
            (Some(value), Arity::Unlimited, Some(sep)) => value.split(sep).collect(),
            (Some(value), _, _) => vec![value.as_str()],
            (None, Arity::Flag, _) => vec![""],
            (None, _, _) => opt.implicit_value().into_iter().collect(),
        };
        for value in values {
            opt.setter()
                .assign(target, value)
                .map_err(|source| ProcessingError::TypeConversion {
                    target: opt.syntax(),
                    source,
                })?;
        }
        option_seen[occurrence.option] = true;
    }

    let mut argument_seen = vec![false; arguments.len()];
    if let Some(first) = scan.operands.first() {
        if arguments.is_empty() {
            return Err(ProcessingError::NoArgumentAllowed(first.clone()));
        }
    }
    let mut index = 0;
    for operand in &scan.operands {
        let Some(arg) = arguments.get(index) else {
            return Err(ProcessingError::TooManyArguments(operand.clone()));
        };
        arg.setter()
            .assign(target, operand)
            .map_err(|source| ProcessingError::TypeConversion {
                target: arg.token().to_string(),
                source,
            })?;
        argument_seen[index] = true;
        if !arg.is_multi_valued() {
            index += 1;
        }
    }

    let overridden = options
        .iter()
        .zip(&option_seen)
        .any(|(opt, seen)| *seen && opt.overrides());
    if !overridden {
        if let Some(arg) = arguments
            .iter()
            .zip(&argument_seen)
            .find(|(arg, seen)| arg.is_required() && !**seen)
            .map(|(arg, _)| arg)
        {
            return Err(ProcessingError::RequiredArgumentMissing(arg.token().to_string()));
        }
        if let Some(opt) = options
            .iter()
            .zip(&option_seen)
            .find(|(opt, seen)| opt.is_required() && !**seen)
            .map(|(opt, _)| opt)
        {
            return Err(ProcessingError::RequiredOptionMissing(opt.syntax()));
        }
    }

    let present = options
        .iter()
        .zip(&option_seen)
        .filter(|(_, seen)| **seen)
        .map(|(opt, _)| opt.member())
        .chain(
            arguments
                .iter()
                .zip(&argument_seen)
                .filter(|(_, seen)| **seen)
                .map(|(arg, _)| arg.member()),
        )
        .collect();
    debug!(
        options = scan.occurrences.len(),
        operands = scan.operands.len(),
        overridden,
        "processed command line"
    );
    Ok(Processed {
        present,
        overridden,
    })
}
