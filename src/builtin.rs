//! Built-in commands known to the shell at compile time.
//!
//! Every builtin declares its fields through [`Declare`] and accepts
//! `-h, --help`, which prints its usage even when required arguments are missing.

use crate::command::{Command, ExitCode, Invocation, help_option};
use crate::descriptor::{ArgumentSpec, OptionSpec};
use crate::discovery::{Declarations, Declare};
use crate::scanner::ScanMode;
use anyhow::Result;
use std::io::Write;
use std::time::Duration;

/// Write the arguments to standard output, separated by spaces.
#[derive(Debug, Default)]
pub struct Echo {
    pub help: bool,
    /// Do not output the trailing newline.
    pub no_newline: bool,
    pub words: Vec<String>,
}

impl Declare for Echo {
    fn declare(decl: &mut Declarations<Self>) {
        decl.option(help_option(|c: &mut Echo| &mut c.help))
            .option(
                OptionSpec::flag("no_newline", |c: &mut Echo| &mut c.no_newline)
                    .short('n')
                    .help("do not output the trailing newline"),
            )
            .argument(
                ArgumentSpec::list("words", 0, |c: &mut Echo| &mut c.words)
                    .help("values to print as-is, separated by spaces"),
            );
    }
}

impl Command for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn about() -> &'static str {
        "write the arguments to standard output"
    }

    fn help_requested(&self) -> bool {
        self.help
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        let s = self.words.join(" ");
        if self.no_newline {
            write!(ctx.stdout, "{}", s)?;
        } else {
            writeln!(ctx.stdout, "{}", s)?;
        }
        Ok(0)
    }
}

/// Set a shell variable, print one, or list them all.
#[derive(Debug, Default)]
pub struct Set {
    pub help: bool,
    pub name: Option<String>,
    pub value: Option<String>,
}

impl Declare for Set {
    fn declare(decl: &mut Declarations<Self>) {
        decl.option(help_option(|c: &mut Set| &mut c.help))
            .argument(
                ArgumentSpec::optional("name", 0, |c: &mut Set| &mut c.name)
                    .help("variable to set or print; all variables are listed when omitted"),
            )
            .argument(
                ArgumentSpec::optional("value", 1, |c: &mut Set| &mut c.value)
                    .help("new value"),
            );
    }
}

impl Command for Set {
    fn name() -> &'static str {
        "set"
    }

    fn about() -> &'static str {
        "set or show shell variables"
    }

    fn help_requested(&self) -> bool {
        self.help
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        match (self.name, self.value) {
            (None, _) => {
                for (name, value) in ctx.env.sorted_vars() {
                    writeln!(ctx.stdout, "{}={}", name, value)?;
                }
                Ok(0)
            }
            (Some(name), Some(value)) => {
                ctx.env.set_var(name, value);
                Ok(0)
            }
            (Some(name), None) => match ctx.env.get_var(&name) {
                Some(value) => {
                    writeln!(ctx.stdout, "{}={}", name, value)?;
                    Ok(0)
                }
                None => Ok(1),
            },
        }
    }
}

/// Wait for a while. Ctrl-C ends the wait early.
#[derive(Debug, Default)]
pub struct Sleep {
    pub help: bool,
    pub duration: Duration,
}

impl Declare for Sleep {
    fn declare(decl: &mut Declarations<Self>) {
        decl.option(help_option(|c: &mut Sleep| &mut c.help))
            .argument(
                ArgumentSpec::value("duration", 0, |c: &mut Sleep| &mut c.duration)
                    .required()
                    .help("how long to wait, e.g. 500ms, 2s or 1m; a bare number is seconds"),
            );
    }
}

impl Command for Sleep {
    fn name() -> &'static str {
        "sleep"
    }

    fn about() -> &'static str {
        "wait for the given duration"
    }

    fn help_requested(&self) -> bool {
        self.help
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        ctx.cancel.sleep(self.duration)?;
        Ok(0)
    }
}

/// Run another command several times.
///
/// Option scanning stops at `COUNT`, so options after it belong to `COMMAND`.
#[derive(Debug, Default)]
pub struct Repeat {
    pub help: bool,
    pub interval: Option<Duration>,
    pub count: usize,
    pub command: String,
    pub args: Vec<String>,
}

impl Declare for Repeat {
    fn declare(decl: &mut Declarations<Self>) {
        decl.option(help_option(|c: &mut Repeat| &mut c.help))
            .option(
                OptionSpec::optional("interval", |c: &mut Repeat| &mut c.interval)
                    .short('i')
                    .long("interval")
                    .help("pause between two runs"),
            )
            .argument(
                ArgumentSpec::value("count", 0, |c: &mut Repeat| &mut c.count)
                    .required()
                    .help("number of runs"),
            )
            .argument(
                ArgumentSpec::value("command", 1, |c: &mut Repeat| &mut c.command)
                    .required()
                    .help("command to run"),
            )
            .argument(
                ArgumentSpec::list("args", 2, |c: &mut Repeat| &mut c.args)
                    .help("arguments passed to COMMAND"),
            );
    }
}

impl Command for Repeat {
    fn name() -> &'static str {
        "repeat"
    }

    fn about() -> &'static str {
        "run a command several times"
    }

    fn scan_mode() -> ScanMode {
        ScanMode::StopAtNonOption
    }

    fn help_requested(&self) -> bool {
        self.help
    }

    /// Returns the exit code of the last run.
    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        let mut status = 0;
        for round in 0..self.count {
            if round > 0 {
                if let Some(interval) = self.interval {
                    ctx.cancel.sleep(interval)?;
                }
            }
            ctx.cancel.check()?;
            status = ctx.interpreter.run(
                &self.command,
                &self.args,
                &mut *ctx.env,
                &mut *ctx.stdout,
                ctx.cancel,
            )?;
        }
        Ok(status)
    }
}

/// List the commands, or show the usage of one.
#[derive(Debug, Default)]
pub struct Help {
    pub help: bool,
    pub command: Option<String>,
}

impl Declare for Help {
    fn declare(decl: &mut Declarations<Self>) {
        decl.option(help_option(|c: &mut Help| &mut c.help))
            .argument(
                ArgumentSpec::optional("command", 0, |c: &mut Help| &mut c.command)
                    .help("command to describe"),
            );
    }
}

impl Command for Help {
    fn name() -> &'static str {
        "help"
    }

    fn about() -> &'static str {
        "list the commands or show how to use one"
    }

    fn help_requested(&self) -> bool {
        self.help
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        let interpreter = ctx.interpreter;
        let Some(name) = self.command else {
            let width = interpreter
                .commands()
                .map(|f| f.name().len())
                .max()
                .unwrap_or(0);
            writeln!(ctx.stdout, "Commands:")?;
            for factory in interpreter.commands() {
                writeln!(
                    ctx.stdout,
                    "  {:<width$}  {}",
                    factory.name(),
                    factory.about(),
                    width = width
                )?;
            }
            return Ok(0);
        };
        match interpreter.find(&name) {
            Some(factory) => {
                write!(ctx.stdout, "{}", factory.usage(interpreter.usage_width())?)?;
                Ok(0)
            }
            None => {
                writeln!(ctx.stdout, "help: no such command: {}", name)?;
                Ok(1)
            }
        }
    }
}

/// Leave the shell.
#[derive(Debug, Default)]
pub struct Exit {
    pub help: bool,
    pub code: Option<ExitCode>,
}

impl Declare for Exit {
    fn declare(decl: &mut Declarations<Self>) {
        decl.option(help_option(|c: &mut Exit| &mut c.help))
            .argument(
                ArgumentSpec::optional("code", 0, |c: &mut Exit| &mut c.code)
                    .help("exit status, 0 when omitted"),
            );
    }
}

impl Command for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn about() -> &'static str {
        "leave the shell"
    }

    fn help_requested(&self) -> bool {
        self.help
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        ctx.env.should_exit = true;
        Ok(self.code.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use crate::command::ExitCode;
    use crate::env::Environment;
    use crate::interpreter::Interpreter;
    use crate::task::Cancellation;
    use pretty_assertions::assert_eq;

    fn run(line: &str, env: &mut Environment) -> (ExitCode, String) {
        let sh = Interpreter::default();
        let mut out = Vec::new();
        let code = sh
            .run_line(line, env, &mut out, &Cancellation::new())
            .unwrap();
        (code, String::from_utf8(out).unwrap())
    }

    fn env() -> Environment {
        Environment::empty("/")
    }

    #[test]
    fn test_echo_with_and_without_newline() {
        let mut env = env();
        assert_eq!(run("echo hello world", &mut env), (0, "hello world\n".into()));
        assert_eq!(run("echo -n foo bar", &mut env), (0, "foo bar".into()));
        assert_eq!(run("echo", &mut env), (0, "\n".into()));
    }

    #[test]
    fn test_echo_passes_negative_numbers_and_escaped_dashes() {
        let mut env = env();
        assert_eq!(run("echo -5 x", &mut env), (0, "-5 x\n".into()));
        assert_eq!(run("echo -- -n", &mut env), (0, "-n\n".into()));
    }

    #[test]
    fn test_echo_help() {
        let mut env = env();
        let (code, out) = run("echo --help", &mut env);
        assert_eq!(code, 0);
        assert_eq!(
            out,
            concat!(
                "write the arguments to standard output\n",
                "\n",
                "Usage: echo [OPTIONS] [WORDS...]\n",
                "\n",
                "Arguments:\n",
                "  WORDS       values to print as-is, separated by spaces\n",
                "\n",
                "Options:\n",
                "  -h, --help  print this help and exit\n",
                "  -n          do not output the trailing newline\n",
            )
        );
    }

    #[test]
    fn test_unknown_option_is_reported() {
        let mut env = env();
        assert_eq!(
            run("echo --bogus", &mut env),
            (
                2,
                "echo: unknown option '--bogus'\nUsage: echo [OPTIONS] [WORDS...]\n".into()
            )
        );
    }

    #[test]
    fn test_set_print_and_list() {
        let mut env = env();
        assert_eq!(run("set B two", &mut env), (0, String::new()));
        assert_eq!(run("set A 'one and a half'", &mut env), (0, String::new()));
        assert_eq!(env.get_var("B").as_deref(), Some("two"));

        assert_eq!(run("set B", &mut env), (0, "B=two\n".into()));
        assert_eq!(run("set", &mut env), (0, "A=one and a half\nB=two\n".into()));
        assert_eq!(run("set MISSING", &mut env), (1, String::new()));

        let (code, out) = run("set a b c", &mut env);
        assert_eq!(code, 2);
        assert!(out.starts_with("set: too many arguments, unexpected 'c'\n"));
    }

    #[test]
    fn test_sleep() {
        let mut env = env();
        assert_eq!(run("sleep 5ms", &mut env), (0, String::new()));

        let (code, out) = run("sleep", &mut env);
        assert_eq!(code, 2);
        assert!(out.starts_with("sleep: argument DURATION is required\n"));

        let (code, out) = run("sleep soon", &mut env);
        assert_eq!(code, 2);
        assert!(out.starts_with(
            "sleep: DURATION: invalid value 'soon': expected a duration like 500ms, 2s or 1h\n"
        ));
    }

    #[test]
    fn test_help_flag_overrides_required_arguments() {
        let mut env = env();
        let (code, out) = run("sleep -h", &mut env);
        assert_eq!(code, 0);
        assert!(out.contains("Usage: sleep [OPTIONS] DURATION\n"));

        let (code, out) = run("repeat --help", &mut env);
        assert_eq!(code, 0);
        assert!(out.contains("Usage: repeat [OPTIONS] COUNT COMMAND [ARGS...]\n"));
    }

    #[test]
    fn test_repeat() {
        let mut env = env();
        assert_eq!(run("repeat 3 echo hi", &mut env), (0, "hi\nhi\nhi\n".into()));
        assert_eq!(run("repeat -i 1ms 2 echo -n x", &mut env), (0, "xx".into()));
        assert_eq!(run("repeat 0 echo never", &mut env), (0, String::new()));

        let (code, out) = run("repeat -5 echo", &mut env);
        assert_eq!(code, 2);
        assert!(out.starts_with(
            "repeat: COUNT: invalid value '-5': expected a non-negative integer\n"
        ));
    }

    #[test]
    fn test_repeat_reports_inner_status_and_errors() {
        let mut env = env();
        assert_eq!(run("repeat 2 set NOPE", &mut env), (1, String::new()));
        assert_eq!(env.last_status, 1);

        let sh = Interpreter::default();
        let err = sh
            .run_line("repeat 2 nope", &mut env, &mut Vec::new(), &Cancellation::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "command not found: nope");
    }

    #[test]
    fn test_help_lists_and_describes() {
        let mut env = env();
        let (code, out) = run("help", &mut env);
        assert_eq!(code, 0);
        assert_eq!(
            out,
            concat!(
                "Commands:\n",
                "  echo    write the arguments to standard output\n",
                "  set     set or show shell variables\n",
                "  sleep   wait for the given duration\n",
                "  repeat  run a command several times\n",
                "  help    list the commands or show how to use one\n",
                "  exit    leave the shell\n",
            )
        );

        let (code, out) = run("help exit", &mut env);
        assert_eq!(code, 0);
        assert!(out.starts_with("leave the shell\n\nUsage: exit [OPTIONS] [CODE]\n"));

        assert_eq!(
            run("help nope", &mut env),
            (1, "help: no such command: nope\n".into())
        );
    }

    #[test]
    fn test_exit_sets_flag() {
        let mut env = env();
        assert_eq!(run("exit", &mut env), (0, String::new()));
        assert!(env.should_exit);

        let mut env = self::env();
        assert_eq!(run("exit 3", &mut env), (3, String::new()));
        assert!(env.should_exit);
    }
}
