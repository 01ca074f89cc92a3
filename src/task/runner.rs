use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use tokio_util::sync::CancellationToken;

use super::{Instance, TaskCore, TaskOptions};
use crate::error::TaskError;
use crate::state::AsyncState;

/// Race-safe coordinator for a single logical async operation.
///
/// Re-triggering before a previous attempt settles cancels the old attempt
/// and fences out its result; the published state always reflects the most
/// recently initiated trigger or abort.
pub struct TaskRunner<P, Args> {
    core: TaskCore<P, Args>,
}

impl<P: Clone + 'static, Args> TaskRunner<P, Args> {
    pub fn new<F, Fut>(operation: F, options: TaskOptions<P>) -> Self
    where
        F: Fn(CancellationToken, Args) -> Fut + 'static,
        Fut: Future<Output = Result<P, TaskError>> + 'static,
    {
        TaskRunner {
            core: TaskCore {
                instance: Rc::new(RefCell::new(Instance::default())),
                operation: Rc::new(move |token, args| -> crate::task::TaskFuture<P> {
                    Box::pin(operation(token, args))
                }),
                options: Rc::new(options),
            },
        }
    }

    /// Snapshot of the current published state.
    pub fn state(&self) -> AsyncState<P> {
        self.core.snapshot()
    }

    /// Starts a new attempt; see [`AsyncState`] for the states it publishes.
    /// The InProgress / invalidated-Success publish happens before this
    /// returns. The returned future must be awaited (or spawned) to drive
    /// the operation; it resolves to the outcome of this specific call even
    /// if a later trigger superseded it.
    pub fn trigger(&self, args: Args) -> impl Future<Output = AsyncState<P>> + 'static {
        self.core.trigger(args)
    }

    /// Cancels any in-flight attempt and reverts to `Init`. The `aborted`
    /// flag is set only if something was actually outstanding.
    pub fn abort(&self) {
        self.core.abort();
    }

    /// Same contract as [`TaskRunner::abort`]; distinct name for call sites
    /// that read better as a reset.
    pub fn reset(&self) {
        self.abort();
    }
}

impl<P, Args> Drop for TaskRunner<P, Args> {
    fn drop(&mut self) {
        // Owning scope is ending: signal outstanding work and fence out any
        // settlement still racing toward the shared instance.
        let mut inst = self.core.instance.borrow_mut();
        inst.generation += 1;
        if let Some(token) = inst.cancel.take() {
            token.cancel();
        }
    }
}
