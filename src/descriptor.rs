//! Immutable records describing one declared option or positional argument,
//! and the builders commands use to declare them.
//!
//! ```
//! use cmdshell::descriptor::{ArgumentSpec, OptionSpec};
//! use cmdshell::discovery::{Declarations, Declare, Descriptors};
//!
//! #[derive(Default)]
//! struct CopyCmd {
//!     recursive: bool,
//!     source: String,
//!     target: String,
//! }
//!
//! impl Declare for CopyCmd {
//!     fn declare(decl: &mut Declarations<Self>) {
//!         decl.option(
//!             OptionSpec::flag("recursive", |c: &mut CopyCmd| &mut c.recursive)
//!                 .short('r')
//!                 .long("recursive")
//!                 .help("copy directories recursively"),
//!         )
//!         .argument(ArgumentSpec::value("source", 0, |c: &mut CopyCmd| &mut c.source).required())
//!         .argument(ArgumentSpec::value("target", 1, |c: &mut CopyCmd| &mut c.target).required());
//!     }
//! }
//!
//! let descriptors = Descriptors::<CopyCmd>::discover().unwrap();
//! assert_eq!(descriptors.options()[0].syntax(), "-r, --recursive");
//! assert_eq!(descriptors.arguments()[1].token(), "TARGET");
//! ```

use crate::handler::{FromToken, Handler};
use crate::setter::{FlagSetter, LazyHandler, Setter, ValueSetter};
use std::fmt;
use std::marker::PhantomData;

/// How many values an option takes per occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// No value, the option is a switch.
    Flag,
    /// Exactly one value (or zero when the value is optional).
    Single,
    /// One value per occurrence, repeatable; the value may be split on the separator.
    Unlimited,
}

/// One declared option.
pub struct OptionDescriptor<T> {
    member: &'static str,
    short: Option<char>,
    long: Option<String>,
    separator: Option<char>,
    arity: Arity,
    optional_value: bool,
    implicit: Option<String>,
    overrides: bool,
    required: bool,
    token: String,
    help: String,
    setter: Box<dyn Setter<T>>,
}

impl<T> OptionDescriptor<T> {
    pub fn member(&self) -> &'static str {
        self.member
    }

    pub fn short(&self) -> Option<char> {
        self.short
    }

    pub fn long(&self) -> Option<&str> {
        self.long.as_deref()
    }

    pub fn separator(&self) -> Option<char> {
        self.separator
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn is_value_optional(&self) -> bool {
        self.optional_value
    }

    /// Value bound when an optional-value option is given without one.
    pub fn implicit_value(&self) -> Option<&str> {
        self.implicit.as_deref()
    }

    /// Whether the presence of this option suppresses required checks.
    pub fn overrides(&self) -> bool {
        self.overrides
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn setter(&self) -> &dyn Setter<T> {
        self.setter.as_ref()
    }

    /// Rendered syntax such as `-n, --name=NAME` or `--color[=WHEN]`.
    pub fn syntax(&self) -> String {
        let mut out = String::new();
        if let Some(short) = self.short {
            out.push('-');
            out.push(short);
        }
        if let Some(long) = &self.long {
            if !out.is_empty() {
                out.push_str(", ");
            }
            out.push_str("--");
            out.push_str(long);
        }
        if self.arity == Arity::Flag {
            return out;
        }
        let glue = if self.long.is_some() { "=" } else { " " };
        if self.optional_value {
            let glue = if self.long.is_some() { "=" } else { "" };
            out.push_str(&format!("[{}{}]", glue, self.token));
        } else {
            out.push_str(glue);
            out.push_str(&self.token);
        }
        if self.arity == Arity::Unlimited {
            match self.separator {
                Some(sep) => out.push_str(&format!("[{}{}...]", sep, self.token)),
                None => out.push_str("..."),
            }
        }
        out
    }

    /// Short name if any, else the long one; used in log and error messages.
    pub fn display_name(&self) -> String {
        match (&self.long, self.short) {
            (Some(long), _) => format!("--{}", long),
            (None, Some(short)) => format!("-{}", short),
            (None, None) => self.member.to_string(),
        }
    }
}

impl<T> PartialEq for OptionDescriptor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.member == other.member
            && self.short == other.short
            && self.long == other.long
            && self.separator == other.separator
            && self.arity == other.arity
            && self.optional_value == other.optional_value
            && self.implicit == other.implicit
            && self.overrides == other.overrides
            && self.required == other.required
            && self.token == other.token
            && self.help == other.help
            && self.setter.kind() == other.setter.kind()
    }
}

impl<T> fmt::Debug for OptionDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionDescriptor")
            .field("member", &self.member)
            .field("syntax", &self.syntax())
            .field("required", &self.required)
            .field("overrides", &self.overrides)
            .field("slot", &self.setter.kind())
            .finish()
    }
}

/// One declared positional argument.
pub struct ArgumentDescriptor<T> {
    member: &'static str,
    index: usize,
    required: bool,
    token: String,
    help: String,
    setter: Box<dyn Setter<T>>,
}

impl<T> ArgumentDescriptor<T> {
    pub fn member(&self) -> &'static str {
        self.member
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_multi_valued(&self) -> bool {
        self.setter.is_multi_valued()
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn setter(&self) -> &dyn Setter<T> {
        self.setter.as_ref()
    }

    /// `SOURCE`, `[SOURCE]`, `FILES...` or `[FILES...]`.
    pub fn syntax(&self) -> String {
        let dots = if self.is_multi_valued() { "..." } else { "" };
        if self.required {
            format!("{}{}", self.token, dots)
        } else {
            format!("[{}{}]", self.token, dots)
        }
    }
}

impl<T> PartialEq for ArgumentDescriptor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.member == other.member
            && self.index == other.index
            && self.required == other.required
            && self.token == other.token
            && self.help == other.help
            && self.setter.kind() == other.setter.kind()
    }
}

impl<T> fmt::Debug for ArgumentDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentDescriptor")
            .field("member", &self.member)
            .field("index", &self.index)
            .field("syntax", &self.syntax())
            .field("slot", &self.setter.kind())
            .finish()
    }
}

fn default_token(member: &str) -> String {
    member.to_ascii_uppercase().replace('-', "_")
}

/// Builder for an [`OptionDescriptor`].
///
/// `S` is the concrete setter; it stays visible until the spec is handed to
/// [`Declarations`](crate::discovery::Declarations) so `.handler()` can reach it.
pub struct OptionSpec<T, S> {
    member: &'static str,
    short: Option<char>,
    long: Option<String>,
    separator: Option<char>,
    arity: Arity,
    optional_value: bool,
    implicit: Option<String>,
    overrides: bool,
    required: bool,
    token: Option<String>,
    help: String,
    setter: S,
    _target: PhantomData<fn(&mut T)>,
}

impl<T, S> OptionSpec<T, S> {
    fn with_setter(member: &'static str, arity: Arity, setter: S) -> Self {
        Self {
            member,
            short: None,
            long: None,
            separator: None,
            arity,
            optional_value: false,
            implicit: None,
            overrides: false,
            required: false,
            token: None,
            help: String::new(),
            setter,
            _target: PhantomData,
        }
    }

    pub fn short(mut self, name: char) -> Self {
        self.short = Some(name);
        self
    }

    pub fn long(mut self, name: impl Into<String>) -> Self {
        self.long = Some(name.into());
        self
    }

    /// Splits each value of an [`Arity::Unlimited`] option on `sep`.
    pub fn separator(mut self, sep: char) -> Self {
        self.separator = Some(sep);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Presence of this option skips all required checks (e.g. `--help`).
    pub fn overrides(mut self) -> Self {
        self.overrides = true;
        self
    }

    /// The value may be omitted; it is then only taken when attached (`--opt=v`, `-ov`).
    pub fn optional_value(mut self) -> Self {
        self.optional_value = true;
        self
    }

    /// Like [`optional_value`](Self::optional_value), binding `value` when none is given.
    pub fn implicit(mut self, value: impl Into<String>) -> Self {
        self.optional_value = true;
        self.implicit = Some(value.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }
}

impl<T: 'static, S: Setter<T> + 'static> OptionSpec<T, S> {
    pub(crate) fn build(self) -> OptionDescriptor<T> {
        let optional_value = self.optional_value && self.arity != Arity::Flag;
        OptionDescriptor {
            member: self.member,
            short: self.short,
            long: self.long,
            separator: self.separator,
            arity: self.arity,
            optional_value,
            implicit: if optional_value { self.implicit } else { None },
            overrides: self.overrides,
            required: self.required,
            token: self.token.unwrap_or_else(|| default_token(self.member)),
            help: self.help,
            setter: Box::new(self.setter),
        }
    }
}

impl<T: 'static> OptionSpec<T, FlagSetter<T>> {
    /// A switch stored into a `bool`.
    pub fn flag(member: &'static str, access: fn(&mut T) -> &mut bool) -> Self {
        Self::with_setter(member, Arity::Flag, FlagSetter::new(access))
    }
}

impl<T: 'static, V: FromToken + 'static> OptionSpec<T, ValueSetter<T, V>> {
    /// Single value stored into a `V`.
    pub fn value(member: &'static str, access: fn(&mut T) -> &mut V) -> Self {
        Self::with_setter(
            member,
            Arity::Single,
            ValueSetter::scalar(access, LazyHandler::with_default()),
        )
    }

    /// Single value stored into an `Option<V>`.
    pub fn optional(member: &'static str, access: fn(&mut T) -> &mut Option<V>) -> Self {
        Self::with_setter(
            member,
            Arity::Single,
            ValueSetter::boxed(access, LazyHandler::with_default()),
        )
    }

    /// Repeatable option collecting into a `Vec<V>`.
    pub fn list(member: &'static str, access: fn(&mut T) -> &mut Vec<V>) -> Self {
        Self::with_setter(
            member,
            Arity::Unlimited,
            ValueSetter::multi(access, LazyHandler::with_default()),
        )
    }
}

impl<T: 'static, V: 'static> OptionSpec<T, ValueSetter<T, V>> {
    pub fn value_with(
        member: &'static str,
        access: fn(&mut T) -> &mut V,
        handler: impl Handler<V> + 'static,
    ) -> Self {
        Self::with_setter(
            member,
            Arity::Single,
            ValueSetter::scalar(access, LazyHandler::explicit(handler)),
        )
    }

    pub fn optional_with(
        member: &'static str,
        access: fn(&mut T) -> &mut Option<V>,
        handler: impl Handler<V> + 'static,
    ) -> Self {
        Self::with_setter(
            member,
            Arity::Single,
            ValueSetter::boxed(access, LazyHandler::explicit(handler)),
        )
    }

    pub fn list_with(
        member: &'static str,
        access: fn(&mut T) -> &mut Vec<V>,
        handler: impl Handler<V> + 'static,
    ) -> Self {
        Self::with_setter(
            member,
            Arity::Unlimited,
            ValueSetter::multi(access, LazyHandler::explicit(handler)),
        )
    }

    /// Replaces the default conversion for this option.
    pub fn handler(self, handler: impl Handler<V> + 'static) -> Self {
        self.setter.set_handler(handler);
        self
    }
}

/// Builder for an [`ArgumentDescriptor`].
pub struct ArgumentSpec<T, S> {
    member: &'static str,
    index: usize,
    required: bool,
    token: Option<String>,
    help: String,
    setter: S,
    _target: PhantomData<fn(&mut T)>,
}

impl<T, S> ArgumentSpec<T, S> {
    fn with_setter(member: &'static str, index: usize, setter: S) -> Self {
        Self {
            member,
            index,
            required: false,
            token: None,
            help: String::new(),
            setter,
            _target: PhantomData,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }
}

impl<T: 'static, S: Setter<T> + 'static> ArgumentSpec<T, S> {
    pub(crate) fn build(self) -> ArgumentDescriptor<T> {
        ArgumentDescriptor {
            member: self.member,
            index: self.index,
            required: self.required,
            token: self.token.unwrap_or_else(|| default_token(self.member)),
            help: self.help,
            setter: Box::new(self.setter),
        }
    }
}

impl<T: 'static, V: FromToken + 'static> ArgumentSpec<T, ValueSetter<T, V>> {
    pub fn value(member: &'static str, index: usize, access: fn(&mut T) -> &mut V) -> Self {
        Self::with_setter(member, index, ValueSetter::scalar(access, LazyHandler::with_default()))
    }

    pub fn optional(
        member: &'static str,
        index: usize,
        access: fn(&mut T) -> &mut Option<V>,
    ) -> Self {
        Self::with_setter(
            member,
            index,
            ValueSetter::boxed(access, LazyHandler::with_default()),
        )
    }

    /// Collects every remaining token; only valid as the last argument.
    pub fn list(member: &'static str, index: usize, access: fn(&mut T) -> &mut Vec<V>) -> Self {
        Self::with_setter(member, index, ValueSetter::multi(access, LazyHandler::with_default()))
    }
}

impl<T: 'static, V: 'static> ArgumentSpec<T, ValueSetter<T, V>> {
    pub fn value_with(
        member: &'static str,
        index: usize,
        access: fn(&mut T) -> &mut V,
        handler: impl Handler<V> + 'static,
    ) -> Self {
        Self::with_setter(
            member,
            index,
            ValueSetter::scalar(access, LazyHandler::explicit(handler)),
        )
    }

    pub fn list_with(
        member: &'static str,
        index: usize,
        access: fn(&mut T) -> &mut Vec<V>,
        handler: impl Handler<V> + 'static,
    ) -> Self {
        Self::with_setter(member, index, ValueSetter::multi(access, LazyHandler::explicit(handler)))
    }

    pub fn handler(self, handler: impl Handler<V> + 'static) -> Self {
        self.setter.set_handler(handler);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setter::SlotKind;

    #[derive(Default)]
    struct Target {
        recursive: bool,
        name: String,
        color: Option<String>,
        tags: Vec<String>,
        files: Vec<String>,
    }

    #[test]
    fn test_option_syntax_forms() {
        let flag = OptionSpec::flag("recursive", |t: &mut Target| &mut t.recursive)
            .short('r')
            .long("recursive")
            .build();
        assert_eq!(flag.syntax(), "-r, --recursive");

        let name = OptionSpec::value("name", |t: &mut Target| &mut t.name)
            .short('n')
            .long("name")
            .build();
        assert_eq!(name.syntax(), "-n, --name=NAME");

        let short_only = OptionSpec::value("name", |t: &mut Target| &mut t.name)
            .short('n')
            .token("WHO")
            .build();
        assert_eq!(short_only.syntax(), "-n WHO");

        let color = OptionSpec::optional("color", |t: &mut Target| &mut t.color)
            .long("color")
            .token("WHEN")
            .implicit("always")
            .build();
        assert_eq!(color.syntax(), "--color[=WHEN]");
        assert_eq!(color.implicit_value(), Some("always"));

        let tags = OptionSpec::list("tags", |t: &mut Target| &mut t.tags)
            .short('t')
            .long("tag")
            .token("TAG")
            .separator(',')
            .build();
        assert_eq!(tags.syntax(), "-t, --tag=TAG[,TAG...]");
        assert_eq!(tags.arity(), Arity::Unlimited);
    }

    #[test]
    fn test_flags_never_take_optional_values() {
        let flag = OptionSpec::flag("recursive", |t: &mut Target| &mut t.recursive)
            .short('r')
            .implicit("yes")
            .build();
        assert!(!flag.is_value_optional());
        assert_eq!(flag.implicit_value(), None);
    }

    #[test]
    fn test_argument_syntax_and_default_token() {
        let files = ArgumentSpec::list("files", 0, |t: &mut Target| &mut t.files).build();
        assert_eq!(files.token(), "FILES");
        assert_eq!(files.syntax(), "[FILES...]");
        assert!(files.is_multi_valued());
        assert_eq!(files.setter().kind(), SlotKind::Multi);

        let name = ArgumentSpec::value("name", 0, |t: &mut Target| &mut t.name)
            .required()
            .build();
        assert_eq!(name.syntax(), "NAME");
    }

    #[test]
    fn test_descriptor_equality_ignores_setter_identity() {
        let a = OptionSpec::value("name", |t: &mut Target| &mut t.name).long("name").build();
        let b = OptionSpec::value("name", |t: &mut Target| &mut t.name).long("name").build();
        let c = OptionSpec::value("name", |t: &mut Target| &mut t.name).long("nom").build();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
