//! Building and validating the descriptor set of a command type.
//!
//! Commands register their options and arguments explicitly through [`Declare`].
//! Nothing is cached: [`Descriptors::discover`] runs the declaration again for
//! every invocation, since command instances are short-lived anyway.

use crate::descriptor::{ArgumentDescriptor, ArgumentSpec, OptionDescriptor, OptionSpec};
use crate::error::ConfigError;
use crate::setter::Setter;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Implemented by every type whose fields can be bound from a command line.
pub trait Declare: Sized + 'static {
    fn declare(decl: &mut Declarations<Self>);
}

/// Collects declarations in the order they are made.
pub struct Declarations<T> {
    options: Vec<OptionDescriptor<T>>,
    arguments: Vec<ArgumentDescriptor<T>>,
}

impl<T: 'static> Declarations<T> {
    pub fn new() -> Self {
        Self {
            options: Vec::new(),
            arguments: Vec::new(),
        }
    }

    pub fn option<S: Setter<T> + 'static>(&mut self, spec: OptionSpec<T, S>) -> &mut Self {
        self.options.push(spec.build());
        self
    }

    pub fn argument<S: Setter<T> + 'static>(&mut self, spec: ArgumentSpec<T, S>) -> &mut Self {
        self.arguments.push(spec.build());
        self
    }
}

impl<T: 'static> Default for Declarations<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Validated options (declaration order) and arguments (index order) of one command.
pub struct Descriptors<T> {
    options: Vec<OptionDescriptor<T>>,
    arguments: Vec<ArgumentDescriptor<T>>,
}

impl<T> PartialEq for Descriptors<T> {
    fn eq(&self, other: &Self) -> bool {
        self.options == other.options && self.arguments == other.arguments
    }
}

impl<T> fmt::Debug for Descriptors<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptors")
            .field("options", &self.options)
            .field("arguments", &self.arguments)
            .finish()
    }
}

impl<T: Declare> Descriptors<T> {
    /// Runs `T::declare` and validates the result.
    pub fn discover() -> Result<Self, ConfigError> {
        let mut decl = Declarations::new();
        T::declare(&mut decl);
        let descriptors = Self::from_declarations(decl)?;
        debug!(
            command = std::any::type_name::<T>(),
            options = descriptors.options.len(),
            arguments = descriptors.arguments.len(),
            "discovered descriptors"
        );
        Ok(descriptors)
    }
}

impl<T> Descriptors<T> {
    pub fn from_declarations(decl: Declarations<T>) -> Result<Self, ConfigError> {
        let Declarations {
            options,
            mut arguments,
        } = decl;

        let mut shorts = HashSet::new();
        let mut longs = HashSet::new();
        let mut option_members = HashSet::new();
        for opt in &options {
            if opt.short().is_none() && opt.long().is_none() {
                return Err(ConfigError::UnnamedOption(opt.member().to_string()));
            }
            if let Some(short) = opt.short() {
                if !shorts.insert(short) {
                    return Err(ConfigError::DuplicateOption(format!("-{}", short)));
                }
            }
            if let Some(long) = opt.long() {
                if !longs.insert(long.to_string()) {
                    return Err(ConfigError::DuplicateOption(format!("--{}", long)));
                }
            }
            option_members.insert(opt.member());
        }

        if let Some(arg) = arguments
            .iter()
            .find(|arg| option_members.contains(arg.member()))
        {
            return Err(ConfigError::ConflictingMember(arg.member().to_string()));
        }

        arguments.sort_by_key(|arg| arg.index());
        for (pos, arg) in arguments.iter().enumerate() {
            if arg.index() != pos {
                if pos > 0 && arguments[pos - 1].index() == arg.index() {
                    return Err(ConfigError::DuplicateIndex(arg.index()));
                }
                return Err(ConfigError::IndexGap(pos));
            }
        }
        if let Some(arg) = arguments
            .iter()
            .rev()
            .skip(1)
            .find(|arg| arg.is_multi_valued())
        {
            return Err(ConfigError::MultiValuedNotLast(arg.index()));
        }

        Ok(Self { options, arguments })
    }

    pub fn options(&self) -> &[OptionDescriptor<T>] {
        &self.options
    }

    pub fn arguments(&self) -> &[ArgumentDescriptor<T>] {
        &self.arguments
    }

    pub fn find_short(&self, name: char) -> Option<usize> {
        self.options.iter().position(|opt| opt.short() == Some(name))
    }

    pub fn find_long(&self, name: &str) -> Option<usize> {
        self.options.iter().position(|opt| opt.long() == Some(name))
    }
}
