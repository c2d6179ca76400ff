use crate::descriptor::OptionSpec;
use crate::discovery::Declare;
use crate::env::Environment;
use crate::interpreter::Interpreter;
use crate::scanner::ScanMode;
use crate::setter::FlagSetter;
use crate::task::Cancellation;
use anyhow::Result;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Exit code for arguments that could not be processed.
pub const USAGE_ERROR: ExitCode = 2;

/// Everything a running command may touch besides its own fields.
pub struct Invocation<'a> {
    pub env: &'a mut Environment,
    pub stdout: &'a mut dyn Write,
    pub cancel: &'a Cancellation,
    /// The interpreter running this command, for commands that run others.
    pub interpreter: &'a Interpreter,
}

/// A command the shell knows at compile time.
///
/// The fields of `Self` are declared through [`Declare`]; a fresh
/// `Self::default()` receives the processed arguments on every invocation.
pub trait Command: Declare + Default {
    /// Canonical name of the command, e.g. "echo".
    fn name() -> &'static str;

    /// One-line description for `help`.
    fn about() -> &'static str;

    fn scan_mode() -> ScanMode {
        ScanMode::Permute
    }

    /// When true, the usage text is printed instead of running the command.
    fn help_requested(&self) -> bool {
        false
    }

    /// Executes the command.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode>;
}

/// Object-safe handle on one [`Command`] type.
pub trait CommandFactory: Send + Sync {
    fn name(&self) -> &'static str;

    fn about(&self) -> &'static str;

    /// Full usage text, `Usage:` line included.
    fn usage(&self, width: usize) -> Result<String>;

    /// Processes `args` into a fresh command and runs it.
    fn invoke(&self, args: &[String], ctx: &mut Invocation<'_>) -> Result<ExitCode>;
}

/// The standard `-h, --help` switch. It overrides required checks.
pub fn help_option<T: 'static>(access: fn(&mut T) -> &mut bool) -> OptionSpec<T, FlagSetter<T>> {
    OptionSpec::flag("help", access)
        .short('h')
        .long("help")
        .overrides()
        .help("print this help and exit")
}
