//! Owner-execution-context marshaling.
//!
//! Inbound channel events arrive on background tasks. Anything the consumer
//! will observe — an event bus publication, a UI-visible mutation — hops
//! through a [`Dispatcher`] first, making the target execution context an
//! explicit, injectable dependency instead of an assumed main loop.

use tokio::runtime::Handle;

/// Delivers closures onto the consumer-owned execution context.
pub trait Dispatcher: Send + Sync {
    /// Run `task` on the owned context. Must not block the caller.
    fn dispatch(&self, task: Box<dyn FnOnce() + Send>);
}

/// Dispatches onto a tokio runtime.
pub struct RuntimeDispatcher {
    handle: Handle,
}

impl RuntimeDispatcher {
    /// Dispatch onto the given runtime handle.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Dispatch onto the current runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Dispatcher for RuntimeDispatcher {
    fn dispatch(&self, task: Box<dyn FnOnce() + Send>) {
        self.handle.spawn(async move { task() });
    }
}

/// Runs tasks immediately on the calling thread.
///
/// For tests and headless consumers with no separate UI context.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, task: Box<dyn FnOnce() + Send>) {
        task();
    }
}
