use crate::builtin::{Echo, Exit, Help, Repeat, Set, Sleep};
use crate::command::{Command, CommandFactory, ExitCode, Invocation, USAGE_ERROR};
use crate::console::TaskFactory;
use crate::discovery::Descriptors;
use crate::env::Environment;
use crate::lexer;
use crate::processor::process;
use crate::task::{Cancellation, Task};
use crate::usage::Usage;
use anyhow::anyhow;
use std::io::Write;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Factory allows creating instances of a [`Command`] by name.
///
/// Descriptors are discovered again on every invocation, so a factory holds no state.
pub(crate) struct Factory<T> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: Command> CommandFactory for Factory<T> {
    fn name(&self) -> &'static str {
        T::name()
    }

    fn about(&self) -> &'static str {
        T::about()
    }

    fn usage(&self, width: usize) -> anyhow::Result<String> {
        let descriptors = Descriptors::<T>::discover()?;
        let usage = Usage::new(&descriptors).width(width);
        Ok(format!("{}\n\n{}", T::about(), usage.to_text(Some(T::name()))))
    }

    fn invoke(&self, args: &[String], ctx: &mut Invocation<'_>) -> anyhow::Result<ExitCode> {
        let descriptors = Descriptors::<T>::discover()?;
        let mut cmd = T::default();
        if let Err(err) = process(&mut cmd, &descriptors, args, T::scan_mode()) {
            debug!(command = T::name(), error = %err, "invalid arguments");
            writeln!(ctx.stdout, "{}: {}", T::name(), err)?;
            writeln!(
                ctx.stdout,
                "Usage: {}",
                Usage::new(&descriptors).synopsis(T::name())
            )?;
            return Ok(USAGE_ERROR);
        }
        if cmd.help_requested() {
            write!(ctx.stdout, "{}", self.usage(ctx.interpreter.usage_width())?)?;
            return Ok(0);
        }
        cmd.execute(ctx)
    }
}

/// A minimal shell-like interpreter for the commands registered with it.
///
/// See [`Default`] for the built-in commands included out of the box.
///
/// Example
/// ```
/// use cmdshell::env::Environment;
/// use cmdshell::interpreter::Interpreter;
/// use cmdshell::task::Cancellation;
///
/// let sh = Interpreter::default();
/// let mut env = Environment::empty("/");
/// let mut out = Vec::new();
/// let code = sh
///     .run_line("echo hello world", &mut env, &mut out, &Cancellation::new())
///     .unwrap();
/// assert_eq!(code, 0);
/// assert_eq!(out, b"hello world\n");
/// ```
pub struct Interpreter {
    commands: Vec<Box<dyn CommandFactory>>,
    usage_width: usize,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            commands,
            usage_width: 80,
        }
    }

    pub fn with_usage_width(mut self, width: usize) -> Self {
        self.usage_width = width;
        self
    }

    pub fn usage_width(&self) -> usize {
        self.usage_width
    }

    /// Adds `T`, replacing any command registered under the same name.
    pub fn register<T: Command>(&mut self) -> &mut Self {
        self.commands.retain(|f| f.name() != T::name());
        self.commands.push(Box::new(Factory::<T>::default()));
        self
    }

    pub fn find(&self, name: &str) -> Option<&dyn CommandFactory> {
        self.commands
            .iter()
            .find(|f| f.name() == name)
            .map(|f| &**f)
    }

    pub fn commands(&self) -> impl Iterator<Item = &dyn CommandFactory> {
        self.commands.iter().map(|f| &**f)
    }

    /// Run a single command invocation by name with arguments.
    ///
    /// Bad arguments are reported on `stdout` and yield exit code 2. An unknown
    /// command or a failing command body is an error.
    pub fn run(
        &self,
        name: &str,
        args: &[String],
        env: &mut Environment,
        stdout: &mut dyn Write,
        cancel: &Cancellation,
    ) -> anyhow::Result<ExitCode> {
        let factory = self
            .find(name)
            .ok_or_else(|| anyhow!("command not found: {}", name))?;
        let mut ctx = Invocation {
            env,
            stdout,
            cancel,
            interpreter: self,
        };
        factory.invoke(args, &mut ctx)
    }

    /// Splits `line` into words and runs the first word as a command.
    ///
    /// The exit code is also stored as `env.last_status`.
    pub fn run_line(
        &self,
        line: &str,
        env: &mut Environment,
        stdout: &mut dyn Write,
        cancel: &Cancellation,
    ) -> anyhow::Result<ExitCode> {
        let words = lexer::split_into_words(line)?;
        let Some((name, args)) = words.split_first() else {
            return Ok(0);
        };
        let code = self.run(name, args, env, stdout, cancel)?;
        env.last_status = code;
        Ok(code)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(vec![
            Box::new(Factory::<Echo>::default()),
            Box::new(Factory::<Set>::default()),
            Box::new(Factory::<Sleep>::default()),
            Box::new(Factory::<Repeat>::default()),
            Box::new(Factory::<Help>::default()),
            Box::new(Factory::<Exit>::default()),
        ])
    }
}

/// Output shared by every task of one console.
pub type SharedOutput = Arc<Mutex<dyn Write + Send>>;

/// Creates tasks that run their line through an [`Interpreter`].
///
/// A task asks the console to stop once a command set `should_exit`.
pub struct ShellTaskFactory {
    interpreter: Arc<Interpreter>,
    stdout: SharedOutput,
}

impl ShellTaskFactory {
    pub fn new(interpreter: Arc<Interpreter>, stdout: SharedOutput) -> Self {
        Self {
            interpreter,
            stdout,
        }
    }
}

impl TaskFactory for ShellTaskFactory {
    fn create(&self) -> Task {
        let interpreter = Arc::clone(&self.interpreter);
        let stdout = Arc::clone(&self.stdout);
        Task::new(
            move |line: &str, env: &mut Environment, cancel: &Cancellation| -> anyhow::Result<bool> {
                let mut out = stdout.lock().unwrap_or_else(PoisonError::into_inner);
                let result = interpreter.run_line(line, env, &mut *out, cancel);
                out.flush()?;
                result?;
                Ok(!env.should_exit)
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::Console;
    use crate::descriptor::{ArgumentSpec, OptionSpec};
    use crate::discovery::{Declarations, Declare};
    use crate::interrupt::ManualInterrupts;
    use crate::line_source::ReaderLines;
    use crate::task::Interrupted;
    use std::io::Cursor;
    use std::thread;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Greet {
        loud: bool,
        name: String,
    }

    impl Declare for Greet {
        fn declare(decl: &mut Declarations<Self>) {
            decl.option(OptionSpec::flag("loud", |g: &mut Greet| &mut g.loud).short('l'))
                .argument(ArgumentSpec::value("name", 0, |g: &mut Greet| &mut g.name).required());
        }
    }

    impl Command for Greet {
        fn name() -> &'static str {
            "greet"
        }

        fn about() -> &'static str {
            "say hello"
        }

        fn execute(self, ctx: &mut Invocation<'_>) -> anyhow::Result<ExitCode> {
            let greeting = format!("hello, {}", self.name);
            if self.loud {
                writeln!(ctx.stdout, "{}!", greeting.to_uppercase())?;
            } else {
                writeln!(ctx.stdout, "{}", greeting)?;
            }
            Ok(0)
        }
    }

    fn run_line(sh: &Interpreter, line: &str, env: &mut Environment) -> (ExitCode, String) {
        let mut out = Vec::new();
        let code = sh
            .run_line(line, env, &mut out, &Cancellation::new())
            .unwrap();
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_registered_command_runs() {
        let mut sh = Interpreter::new(Vec::new());
        sh.register::<Greet>();
        let mut env = Environment::empty("/");

        assert_eq!(run_line(&sh, "greet world", &mut env), (0, "hello, world\n".into()));
        assert_eq!(
            run_line(&sh, "greet -l 'big world'", &mut env),
            (0, "HELLO, BIG WORLD!\n".into())
        );
        assert_eq!(env.last_status, 0);
    }

    #[test]
    fn test_processing_error_prints_line_and_returns_2() {
        let mut sh = Interpreter::new(Vec::new());
        sh.register::<Greet>();
        let mut env = Environment::empty("/");

        let (code, out) = run_line(&sh, "greet", &mut env);
        assert_eq!(code, 2);
        assert_eq!(out, "greet: argument NAME is required\nUsage: greet [OPTIONS] NAME\n");
        assert_eq!(env.last_status, 2);

        let (code, out) = run_line(&sh, "greet --shout x", &mut env);
        assert_eq!(code, 2);
        assert!(out.starts_with("greet: unknown option '--shout'\n"));
    }

    #[test]
    fn test_unknown_command_and_lexing_errors() {
        let sh = Interpreter::default();
        let mut env = Environment::empty("/");
        let mut out = Vec::new();
        let cancel = Cancellation::new();

        let err = sh.run_line("nope", &mut env, &mut out, &cancel).unwrap_err();
        assert_eq!(err.to_string(), "command not found: nope");

        let err = sh.run_line("echo 'open", &mut env, &mut out, &cancel).unwrap_err();
        assert!(err.downcast_ref::<lexer::LexingError>().is_some());
        assert!(out.is_empty());
    }

    #[test]
    fn test_blank_line_is_a_no_op() {
        let sh = Interpreter::default();
        let mut env = Environment::empty("/");
        assert_eq!(run_line(&sh, "   ", &mut env), (0, String::new()));
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut sh = Interpreter::default();
        let before = sh.commands().count();
        sh.register::<Echo>();
        assert_eq!(sh.commands().count(), before);
        assert_eq!(sh.commands().last().map(|f| f.name()), Some("echo"));
    }

    #[test]
    fn test_usage_includes_about() {
        let mut sh = Interpreter::new(Vec::new());
        sh.register::<Greet>();
        let usage = sh.find("greet").unwrap().usage(80).unwrap();
        assert!(usage.starts_with("say hello\n\nUsage: greet [OPTIONS] NAME\n"));
    }

    fn shared() -> (Arc<Mutex<Vec<u8>>>, SharedOutput) {
        let buf = Arc::new(Mutex::new(Vec::<u8>::new()));
        let out: SharedOutput = buf.clone();
        (buf, out)
    }

    #[test]
    fn test_console_runs_script_until_exit() {
        let (buf, out) = shared();
        let factory = ShellTaskFactory::new(Arc::new(Interpreter::default()), out);
        let script = "set GREETING hi\n\necho one\necho -n done\nexit\necho unreachable\n";
        let mut console = Console::new(
            Environment::empty("/"),
            ReaderLines::new(Cursor::new(script)),
            factory,
        )
        .with_interrupts(ManualInterrupts::new());

        console.run().unwrap();

        let text = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        assert_eq!(text, "one\ndone");
        assert_eq!(console.env().get_var("GREETING").as_deref(), Some("hi"));
        assert!(console.env().should_exit);
    }

    #[test]
    fn test_stopping_a_sleeping_command() {
        let (_buf, out) = shared();
        let factory = ShellTaskFactory::new(Arc::new(Interpreter::default()), out);
        let task = Arc::new(factory.create());
        let runner = Arc::clone(&task);
        let started = Instant::now();
        let handle = thread::spawn(move || {
            let mut env = Environment::empty("/");
            runner.execute("sleep 60", &mut env)
        });

        while !task.is_running() {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(task.stop());

        let err = handle.join().unwrap().unwrap_err();
        assert_eq!(err.downcast_ref::<Interrupted>(), Some(&Interrupted::Stopped));
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[test]
    fn test_stopping_a_sleep_longer_than_the_clock_reaches() {
        let (_buf, out) = shared();
        let factory = ShellTaskFactory::new(Arc::new(Interpreter::default()), out);
        let task = Arc::new(factory.create());
        let runner = Arc::clone(&task);
        let handle = thread::spawn(move || {
            let mut env = Environment::empty("/");
            runner.execute("sleep 10000000000000000000", &mut env)
        });

        while !task.is_running() {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(task.stop());

        // a panic on the task thread would surface here as a join error
        let err = handle.join().unwrap().unwrap_err();
        assert_eq!(err.downcast_ref::<Interrupted>(), Some(&Interrupted::Stopped));
    }
}
