//! The read-evaluate loop.
//!
//! A [`Console`] repeatedly asks its [`PromptProvider`] for a prompt, reads a
//! line from its [`LineSource`], and runs non-blank lines as a [`Task`] created
//! by its [`TaskFactory`]. While a task runs it is published as the console's
//! current task, so an interrupt arriving on another thread can stop it.

use crate::env::Environment;
use crate::interrupt::{InterruptSource, SignalInterrupts};
use crate::task::{InterruptAction, Interrupted, Task};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

/// Where input lines come from.
pub trait LineSource {
    /// `Ok(None)` means the input is exhausted.
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>>;
}

pub trait PromptProvider {
    fn prompt(&self, env: &Environment) -> String;
}

impl<F> PromptProvider for F
where
    F: Fn(&Environment) -> String,
{
    fn prompt(&self, env: &Environment) -> String {
        self(env)
    }
}

/// Supplies a fresh task for every line.
pub trait TaskFactory {
    fn create(&self) -> Task;
}

impl<F> TaskFactory for F
where
    F: Fn() -> Task,
{
    fn create(&self) -> Task {
        self()
    }
}

/// Context attached to errors of the [`LineSource`].
#[derive(Debug, Error)]
#[error("cannot read input")]
pub struct InputFailed;

/// Decides what happens after a failed line. Returning `false` ends the loop.
pub trait ErrorHandler {
    fn handle(&self, err: &anyhow::Error) -> bool;
}

impl<F> ErrorHandler for F
where
    F: Fn(&anyhow::Error) -> bool,
{
    fn handle(&self, err: &anyhow::Error) -> bool {
        self(err)
    }
}

/// Reports the error on stderr. The loop goes on after failed commands and
/// ends when the input itself fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportErrors;

impl ErrorHandler for ReportErrors {
    fn handle(&self, err: &anyhow::Error) -> bool {
        if err.downcast_ref::<InputFailed>().is_some() {
            warn!("giving up on input: {:#}", err);
            eprintln!("error: {:#}", err);
            return false;
        }
        match err.downcast_ref::<Interrupted>() {
            Some(interrupted) => eprintln!("{}", interrupted),
            None => {
                warn!(error = %err, "command failed");
                eprintln!("error: {:#}", err);
            }
        }
        true
    }
}

/// A fixed prompt that the `PROMPT` shell variable overrides.
#[derive(Debug, Clone)]
pub struct DefaultPrompt {
    text: String,
}

impl DefaultPrompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Default for DefaultPrompt {
    fn default() -> Self {
        Self::new("$ ")
    }
}

impl PromptProvider for DefaultPrompt {
    fn prompt(&self, env: &Environment) -> String {
        env.get_var("PROMPT").unwrap_or_else(|| self.text.clone())
    }
}

type CurrentTask = Arc<Mutex<Option<Arc<Task>>>>;

fn lock(current: &CurrentTask) -> MutexGuard<'_, Option<Arc<Task>>> {
    current.lock().unwrap_or_else(PoisonError::into_inner)
}

fn interrupt_current(current: &CurrentTask) -> InterruptAction {
    let task = lock(current).clone();
    let action = match task {
        Some(task) => task.interrupt(),
        None => InterruptAction::Ignored,
    };
    debug!(?action, "interrupt received");
    action
}

/// Unpublishes the current task, also when the task panics.
struct Published<'a>(&'a CurrentTask);

impl Drop for Published<'_> {
    fn drop(&mut self) {
        lock(self.0).take();
    }
}

pub struct Console {
    env: Environment,
    lines: Box<dyn LineSource>,
    tasks: Box<dyn TaskFactory>,
    prompt: Box<dyn PromptProvider>,
    errors: Box<dyn ErrorHandler>,
    interrupts: Box<dyn InterruptSource>,
    current: CurrentTask,
    running: bool,
    quit_on_idle_interrupt: bool,
    idle_interrupted: Arc<AtomicBool>,
}

impl Console {
    /// A console with the default prompt, error reporting on stderr and the
    /// process Ctrl-C handler.
    pub fn new(
        env: Environment,
        lines: impl LineSource + 'static,
        tasks: impl TaskFactory + 'static,
    ) -> Self {
        Self {
            env,
            lines: Box::new(lines),
            tasks: Box::new(tasks),
            prompt: Box::new(DefaultPrompt::default()),
            errors: Box::new(ReportErrors),
            interrupts: Box::new(SignalInterrupts),
            current: Arc::new(Mutex::new(None)),
            running: false,
            quit_on_idle_interrupt: false,
            idle_interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_prompt(mut self, prompt: impl PromptProvider + 'static) -> Self {
        self.prompt = Box::new(prompt);
        self
    }

    pub fn with_error_handler(mut self, errors: impl ErrorHandler + 'static) -> Self {
        self.errors = Box::new(errors);
        self
    }

    pub fn with_interrupts(mut self, interrupts: impl InterruptSource + 'static) -> Self {
        self.interrupts = Box::new(interrupts);
        self
    }

    /// Ends the loop when an interrupt arrives while no task runs. By default
    /// such interrupts are ignored.
    pub fn quit_on_idle_interrupt(mut self, quit: bool) -> Self {
        self.quit_on_idle_interrupt = quit;
        self
    }

    /// Runs until the line source is exhausted, a task returns `false`, or the
    /// error handler gives up.
    ///
    /// Fails only when the interrupt handler cannot be installed. The handler
    /// is uninstalled again before this returns. Read failures reach the error
    /// handler with [`InputFailed`] as context.
    pub fn run(&mut self) -> anyhow::Result<()> {
        let current = Arc::clone(&self.current);
        let idle = self
            .quit_on_idle_interrupt
            .then(|| Arc::clone(&self.idle_interrupted));
        self.idle_interrupted.store(false, Ordering::Release);
        let _guard = self.interrupts.install(Arc::new(move || {
            if interrupt_current(&current) == InterruptAction::Ignored {
                if let Some(idle) = &idle {
                    idle.store(true, Ordering::Release);
                }
            }
        }))?;

        self.running = true;
        while self.running && !self.interrupted_while_idle() {
            let prompt = self.prompt.prompt(&self.env);
            let line = match self.lines.read_line(&prompt) {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("end of input");
                    break;
                }
                Err(err) => {
                    self.running = self.errors.handle(&err.context(InputFailed));
                    continue;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if self.interrupted_while_idle() {
                break;
            }
            self.running = match self.execute(line) {
                Ok(keep_going) => keep_going,
                Err(err) => self.errors.handle(&err),
            };
        }
        self.running = false;
        Ok(())
    }

    fn interrupted_while_idle(&self) -> bool {
        let interrupted = self.idle_interrupted.load(Ordering::Acquire);
        if interrupted {
            debug!("interrupted between lines");
        }
        interrupted
    }

    fn execute(&mut self, line: &str) -> anyhow::Result<bool> {
        let task = Arc::new(self.tasks.create());
        *lock(&self.current) = Some(Arc::clone(&task));
        let _published = Published(&self.current);
        task.execute(line, &mut self.env)
    }

    /// Forwards an interrupt to the current task, if any.
    pub fn interrupt(&self) -> InterruptAction {
        interrupt_current(&self.current)
    }

    /// A handle that interrupts this console's current task from any thread.
    pub fn interrupter(&self) -> impl Fn() -> InterruptAction + Send + Sync + use<> {
        let current = Arc::clone(&self.current);
        move || interrupt_current(&current)
    }

    pub fn current_task(&self) -> Option<Arc<Task>> {
        lock(&self.current).clone()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }
}
