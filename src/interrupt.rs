//! Delivery of user interrupts (Ctrl-C) to the console.
//!
//! An [`InterruptSource`] installs a callback for the lifetime of the returned
//! [`InterruptGuard`]; dropping the guard puts back whatever was installed
//! before.

use anyhow::anyhow;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::{debug, trace};

pub type InterruptHandler = Arc<dyn Fn() + Send + Sync>;

pub trait InterruptSource {
    fn install(&self, handler: InterruptHandler) -> anyhow::Result<InterruptGuard>;
}

/// Restores the previous handler when dropped.
#[must_use = "the handler is uninstalled as soon as the guard is dropped"]
pub struct InterruptGuard {
    restore: Option<Box<dyn FnOnce() + Send>>,
}

impl InterruptGuard {
    pub fn new(restore: impl FnOnce() + Send + 'static) -> Self {
        Self {
            restore: Some(Box::new(restore)),
        }
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        if let Some(restore) = self.restore.take() {
            restore();
        }
    }
}

impl fmt::Debug for InterruptGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptGuard")
            .field("armed", &self.restore.is_some())
            .finish()
    }
}

type Slot = Mutex<Option<InterruptHandler>>;

fn lock(slot: &Slot) -> MutexGuard<'_, Option<InterruptHandler>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Swaps `handler` into `slot` and returns a guard that swaps the old one back.
fn swap_in(slot: Arc<Slot>, handler: InterruptHandler) -> InterruptGuard {
    let previous = lock(&slot).replace(handler);
    InterruptGuard::new(move || {
        *lock(&slot) = previous;
    })
}

/// The process SIGINT (Ctrl-C on Windows) handler.
///
/// The OS hook is registered once per process; installs after that only swap
/// the callback it dispatches to.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalInterrupts;

static SIGNAL_SLOT: OnceLock<Arc<Slot>> = OnceLock::new();
static SIGNAL_HOOK: OnceLock<Result<(), String>> = OnceLock::new();

fn signal_slot() -> &'static Arc<Slot> {
    SIGNAL_SLOT.get_or_init(|| Arc::new(Mutex::new(None)))
}

fn dispatch_signal() {
    // clone first so the callback runs without the slot locked
    let handler = lock(signal_slot()).clone();
    match handler {
        Some(handler) => handler(),
        None => trace!("interrupt with no handler installed"),
    }
}

impl InterruptSource for SignalInterrupts {
    fn install(&self, handler: InterruptHandler) -> anyhow::Result<InterruptGuard> {
        let hooked = SIGNAL_HOOK.get_or_init(|| {
            debug!("registering process interrupt hook");
            ctrlc::set_handler(dispatch_signal).map_err(|e| e.to_string())
        });
        if let Err(err) = hooked {
            return Err(anyhow!("cannot install interrupt handler: {}", err));
        }
        Ok(swap_in(Arc::clone(signal_slot()), handler))
    }
}

/// An interrupt source fired by hand. Used by tests and by embedders that
/// deliver interrupts from their own event loop.
#[derive(Clone, Default)]
pub struct ManualInterrupts {
    slot: Arc<Slot>,
}

impl ManualInterrupts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invokes the installed handler. Returns `false` when none is installed.
    pub fn fire(&self) -> bool {
        let handler = lock(&self.slot).clone();
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }

    pub fn is_installed(&self) -> bool {
        lock(&self.slot).is_some()
    }
}

impl InterruptSource for ManualInterrupts {
    fn install(&self, handler: InterruptHandler) -> anyhow::Result<InterruptGuard> {
        Ok(swap_in(Arc::clone(&self.slot), handler))
    }
}

impl fmt::Debug for ManualInterrupts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualInterrupts")
            .field("installed", &self.is_installed())
            .finish()
    }
}
