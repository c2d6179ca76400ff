//! A small framework for interactive command shells.
//!
//! Commands are plain structs. Each one declares its options and positional
//! arguments through [`discovery::Declare`]; [`processor::process`] binds a
//! token list onto a fresh instance, converting values with the field's
//! [`handler::Handler`], and [`usage::Usage`] renders help from the same
//! declarations.
//!
//! On the interactive side, [`console::Console`] reads lines, runs each one as
//! a [`task::Task`] and forwards Ctrl-C to the running task: the first
//! interrupt asks it to stop, the second aborts it.
//!
//! The [`interpreter::Interpreter`] ties both halves together by running a line
//! through the registered [`command::Command`] types.

pub mod builtin;
pub mod command;
pub mod config;
pub mod console;
pub mod descriptor;
pub mod discovery;
pub mod env;
pub mod error;
pub mod handler;
pub mod interpreter;
pub mod interrupt;
pub mod lexer;
pub mod line_source;
pub mod processor;
pub mod scanner;
pub mod setter;
pub mod task;
pub mod usage;

/// Just a convenient re-export of the command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
