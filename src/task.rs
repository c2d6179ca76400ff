//! One in-flight execution of one input line, and its cancellation.
//!
//! A [`Task`] is shared between the loop thread, which runs it, and the signal
//! thread, which may ask it to stop. All lifecycle flags live behind the task's
//! own mutex so an interrupt never races with the task clearing its state.
//!
//! Stopping is cooperative: the body has to look at its [`Cancellation`] (or
//! wait through [`Cancellation::sleep`]) to notice. There is no way to kill a
//! body that never checks; only ending the thread itself would do that.

use crate::env::Environment;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace};

/// Returned by cancellation checks once the running task was asked to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    #[error("interrupted")]
    Stopped,
    #[error("aborted")]
    Aborted,
}

const CLEAR: u8 = 0;
const STOP: u8 = 1;
const ABORT: u8 = 2;

/// Cancellation token passed to task bodies.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    level: Arc<AtomicU8>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Err` once a stop or abort was requested.
    pub fn check(&self) -> Result<(), Interrupted> {
        match self.level.load(Ordering::Acquire) {
            CLEAR => Ok(()),
            STOP => Err(Interrupted::Stopped),
            _ => Err(Interrupted::Aborted),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.check().is_err()
    }

    /// Blocks for `duration` unless cancelled first. A duration too large for
    /// the clock blocks until cancellation.
    ///
    /// Must be called from the thread that runs the task, which is the one
    /// [`Task::stop`] unparks.
    pub fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        // beyond what an Instant can represent the sleep only ends by cancellation
        let Some(deadline) = Instant::now().checked_add(duration) else {
            loop {
                self.check()?;
                thread::park();
            }
        };
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::park_timeout(deadline - now);
        }
    }

    fn request(&self, level: u8) {
        self.level.fetch_max(level, Ordering::AcqRel);
    }

    fn reset(&self) {
        self.level.store(CLEAR, Ordering::Release);
    }
}

/// The work a task performs for one input line.
///
/// The returned boolean tells the console whether to keep reading lines.
pub trait TaskBody: Send {
    fn work(
        &mut self,
        input: &str,
        env: &mut Environment,
        cancel: &Cancellation,
    ) -> anyhow::Result<bool>;
}

impl<F> TaskBody for F
where
    F: FnMut(&str, &mut Environment, &Cancellation) -> anyhow::Result<bool> + Send,
{
    fn work(
        &mut self,
        input: &str,
        env: &mut Environment,
        cancel: &Cancellation,
    ) -> anyhow::Result<bool> {
        self(input, env, cancel)
    }
}

/// What an interrupt request did to the current task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    /// Nothing was running.
    Ignored,
    /// The task was asked to stop.
    Stopped,
    /// The task was already stopping and got escalated.
    Aborted,
}

#[derive(Debug, Default)]
struct TaskState {
    input: Option<String>,
    thread: Option<Thread>,
    running: bool,
    stopping: bool,
    aborting: bool,
}

pub struct Task {
    state: Mutex<TaskState>,
    cancel: Cancellation,
    body: Mutex<Box<dyn TaskBody>>,
}

impl Task {
    pub fn new(body: impl TaskBody + 'static) -> Self {
        Self {
            state: Mutex::new(TaskState::default()),
            cancel: Cancellation::new(),
            body: Mutex::new(Box::new(body)),
        }
    }

    /// Runs the body on the calling thread.
    ///
    /// The running and stopping flags and the recorded thread are cleared on
    /// every exit path, including a panicking body.
    pub fn execute(&self, input: &str, env: &mut Environment) -> anyhow::Result<bool> {
        self.cancel.reset();
        {
            let mut state = self.lock_state();
            state.input = Some(input.to_string());
            state.thread = Some(thread::current());
            state.running = true;
            state.stopping = false;
            state.aborting = false;
        }
        trace!(input, "task started");
        let _finished = Finished(self);

        let mut body = self.body.lock().unwrap_or_else(PoisonError::into_inner);
        body.work(input, env, &self.cancel)
    }

    /// Asks the running body to stop. Returns `false` when nothing is running.
    pub fn stop(&self) -> bool {
        let mut state = self.lock_state();
        self.stop_locked(&mut state)
    }

    /// Escalated stop.
    ///
    /// A thread cannot be killed safely, so this is still cooperative: the next
    /// cancellation check in the body reports [`Interrupted::Aborted`] instead of
    /// [`Interrupted::Stopped`]. A body that never checks keeps running.
    pub fn abort(&self) -> bool {
        let mut state = self.lock_state();
        self.abort_locked(&mut state)
    }

    /// Stop on the first request, abort once already stopping.
    pub fn interrupt(&self) -> InterruptAction {
        let mut state = self.lock_state();
        if !state.running {
            InterruptAction::Ignored
        } else if state.stopping {
            self.abort_locked(&mut state);
            InterruptAction::Aborted
        } else {
            self.stop_locked(&mut state);
            InterruptAction::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().running
    }

    pub fn is_stopping(&self) -> bool {
        self.lock_state().stopping
    }

    pub fn is_aborting(&self) -> bool {
        self.lock_state().aborting
    }

    /// The line passed to the last [`execute`](Self::execute).
    pub fn input(&self) -> Option<String> {
        self.lock_state().input.clone()
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }

    fn stop_locked(&self, state: &mut TaskState) -> bool {
        if !state.running {
            return false;
        }
        state.stopping = true;
        self.cancel.request(STOP);
        if let Some(thread) = &state.thread {
            thread.unpark();
        }
        debug!(input = state.input.as_deref(), "task stop requested");
        true
    }

    fn abort_locked(&self, state: &mut TaskState) -> bool {
        if !state.running {
            return false;
        }
        state.aborting = true;
        self.cancel.request(ABORT);
        if let Some(thread) = &state.thread {
            thread.unpark();
        }
        debug!(input = state.input.as_deref(), "task abort requested");
        true
    }

    fn lock_state(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Finished<'a>(&'a Task);

impl Drop for Finished<'_> {
    fn drop(&mut self) {
        let mut state = self.0.lock_state();
        state.thread = None;
        state.running = false;
        state.stopping = false;
        state.aborting = false;
        trace!("task finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn wait_until(cond: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "timed out waiting");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_execute_returns_body_result_and_clears_state() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let task = Task::new(
            move |input: &str, env: &mut Environment, _: &Cancellation| -> anyhow::Result<bool> {
                seen.fetch_add(1, Ordering::SeqCst);
                env.set_var("LAST", input);
                Ok(input != "quit")
            },
        );
        let mut env = Environment::empty("/");

        assert!(!task.is_running());
        assert!(task.execute("echo hi", &mut env).unwrap());
        assert!(!task.is_running());
        assert_eq!(task.input().as_deref(), Some("echo hi"));
        assert_eq!(env.get_var("LAST").as_deref(), Some("echo hi"));

        assert!(!task.execute("quit", &mut env).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_state_cleared_when_body_fails() {
        let task = Task::new(
            |_: &str, _: &mut Environment, _: &Cancellation| -> anyhow::Result<bool> {
                anyhow::bail!("boom")
            },
        );
        let mut env = Environment::empty("/");
        let err = task.execute("x", &mut env).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(!task.is_running());
        assert!(!task.is_stopping());
    }

    #[test]
    fn test_stop_and_interrupt_ignored_when_idle() {
        let task = Task::new(
            |_: &str, _: &mut Environment, _: &Cancellation| -> anyhow::Result<bool> { Ok(true) },
        );
        assert!(!task.stop());
        assert!(!task.abort());
        assert_eq!(task.interrupt(), InterruptAction::Ignored);
        assert!(!task.is_stopping());
    }

    #[test]
    fn test_stop_wakes_a_sleeping_body() {
        let task = Arc::new(Task::new(
            |_: &str, _: &mut Environment, cancel: &Cancellation| -> anyhow::Result<bool> {
                cancel.sleep(Duration::from_secs(60))?;
                Ok(true)
            },
        ));
        let runner = Arc::clone(&task);
        let handle = thread::spawn(move || {
            let mut env = Environment::empty("/");
            runner.execute("sleep 60", &mut env)
        });

        wait_until(|| task.is_running());
        assert!(task.stop());
        assert!(task.is_stopping());

        let err = handle.join().unwrap().unwrap_err();
        assert_eq!(err.downcast_ref::<Interrupted>(), Some(&Interrupted::Stopped));
        assert!(!task.is_running());
        assert!(!task.is_stopping());
    }

    #[test]
    fn test_unrepresentable_sleep_waits_for_stop() {
        let task = Arc::new(Task::new(
            |_: &str, _: &mut Environment, cancel: &Cancellation| -> anyhow::Result<bool> {
                cancel.sleep(Duration::MAX)?;
                Ok(true)
            },
        ));
        let runner = Arc::clone(&task);
        let handle = thread::spawn(move || {
            let mut env = Environment::empty("/");
            runner.execute("sleep forever", &mut env)
        });

        wait_until(|| task.is_running());
        assert!(task.stop());

        let err = handle.join().unwrap().unwrap_err();
        assert_eq!(err.downcast_ref::<Interrupted>(), Some(&Interrupted::Stopped));
    }

    #[test]
    fn test_second_interrupt_escalates_to_abort() {
        // Ignores the stop request and only gives up on abort.
        let task = Arc::new(Task::new(
            |_: &str, _: &mut Environment, cancel: &Cancellation| -> anyhow::Result<bool> {
                loop {
                    match cancel.check() {
                        Err(Interrupted::Aborted) => return Err(Interrupted::Aborted.into()),
                        _ => thread::park_timeout(Duration::from_millis(5)),
                    }
                }
            },
        ));
        let runner = Arc::clone(&task);
        let handle = thread::spawn(move || {
            let mut env = Environment::empty("/");
            runner.execute("stubborn", &mut env)
        });

        wait_until(|| task.is_running());
        assert!(!task.is_stopping());

        assert_eq!(task.interrupt(), InterruptAction::Stopped);
        assert!(task.is_stopping());
        assert!(!task.is_aborting());
        assert_eq!(task.cancellation().check(), Err(Interrupted::Stopped));

        assert_eq!(task.interrupt(), InterruptAction::Aborted);
        assert!(task.is_aborting());

        let err = handle.join().unwrap().unwrap_err();
        assert_eq!(err.downcast_ref::<Interrupted>(), Some(&Interrupted::Aborted));
        assert!(!task.is_running());
        assert!(!task.is_aborting());
        assert_eq!(task.interrupt(), InterruptAction::Ignored);
    }

    #[test]
    fn test_cancellation_resets_between_executions() {
        let task = Task::new(
            |_: &str, _: &mut Environment, cancel: &Cancellation| -> anyhow::Result<bool> {
                cancel.check()?;
                Ok(true)
            },
        );
        task.cancellation().request(STOP);
        let mut env = Environment::empty("/");
        assert!(task.execute("again", &mut env).unwrap());
    }

    #[test]
    fn test_sleep_completes_without_cancellation() {
        let cancel = Cancellation::new();
        let started = Instant::now();
        cancel.sleep(Duration::from_millis(20)).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
