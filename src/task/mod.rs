pub mod auto;
pub mod guard;
pub mod registry;
pub mod runner;

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::TaskError;
use crate::state::AsyncState;

/// Boxed local future produced by a task operation.
pub type TaskFuture<P> = Pin<Box<dyn Future<Output = Result<P, TaskError>>>>;

/// The operation contract: given a fresh cancellation token and the trigger
/// arguments, build the future doing the actual work.
pub(crate) type SharedOperation<P, Args> = Rc<dyn Fn(CancellationToken, Args) -> TaskFuture<P>>;

/// Completion callbacks for one runner or registry. `on_change` fires after
/// every publish; `on_success` / `on_error` fire at most once per settled,
/// non-superseded trigger.
pub struct TaskOptions<P> {
    pub on_change: Option<Box<dyn Fn()>>,
    pub on_success: Option<Box<dyn Fn(&P)>>,
    pub on_error: Option<Box<dyn Fn(&anyhow::Error)>>,
}

impl<P> Default for TaskOptions<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> TaskOptions<P> {
    pub fn new() -> Self {
        TaskOptions {
            on_change: None,
            on_success: None,
            on_error: None,
        }
    }

    pub fn on_change(mut self, f: impl Fn() + 'static) -> Self {
        self.on_change = Some(Box::new(f));
        self
    }

    pub fn on_success(mut self, f: impl Fn(&P) + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&anyhow::Error) + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

/// Per-instance tracked tuple. Exclusively owned by the runner (or registry
/// entry) that created it; readers only ever see cloned state snapshots.
pub(crate) struct Instance<P> {
    pub state: AsyncState<P>,
    /// Fencing token: bumped on every trigger and abort. A settlement only
    /// publishes if the counter still matches the value captured at its
    /// trigger.
    pub generation: u64,
    pub cancel: Option<CancellationToken>,
}

impl<P> Default for Instance<P> {
    fn default() -> Self {
        Instance {
            state: AsyncState::default(),
            generation: 0,
            cancel: None,
        }
    }
}

/// Shared trigger/abort machinery behind both [`runner::TaskRunner`] and
/// registry handles.
pub(crate) struct TaskCore<P, Args> {
    pub instance: Rc<RefCell<Instance<P>>>,
    pub operation: SharedOperation<P, Args>,
    pub options: Rc<TaskOptions<P>>,
}

impl<P, Args> Clone for TaskCore<P, Args> {
    fn clone(&self) -> Self {
        TaskCore {
            instance: Rc::clone(&self.instance),
            operation: Rc::clone(&self.operation),
            options: Rc::clone(&self.options),
        }
    }
}

impl<P: Clone + 'static, Args> TaskCore<P, Args> {
    pub fn snapshot(&self) -> AsyncState<P> {
        self.instance.borrow().state.clone()
    }

    /// Starts a new attempt. The race-relevant prologue runs synchronously
    /// before this returns: the generation is bumped, any live token is
    /// cancelled (supersession always cancels), and the InProgress or
    /// invalidated-Success state is published. The returned future drives
    /// the operation to settlement and resolves to the outcome computed for
    /// this specific call, published or not.
    pub fn trigger(&self, args: Args) -> impl Future<Output = AsyncState<P>> + 'static {
        let (my_gen, token) = {
            let mut inst = self.instance.borrow_mut();
            inst.generation += 1;
            let my_gen = inst.generation;
            if let Some(prev) = inst.cancel.take() {
                prev.cancel();
            }
            let token = CancellationToken::new();
            inst.cancel = Some(token.clone());
            let prev_state = std::mem::take(&mut inst.state);
            inst.state = prev_state.into_in_progress_or_invalidated();
            (my_gen, token)
        };
        self.notify_change();
        debug!(generation = my_gen, "task triggered");

        let fut = (self.operation)(token, args);
        let instance = Rc::clone(&self.instance);
        let options = Rc::clone(&self.options);
        async move { settle(instance, options, my_gen, fut).await }
    }

    /// Cancels live work and reverts to Init. Synchronous, so it can never
    /// be overtaken by a same-tick trigger; the generation bump fences out
    /// any still-settling attempt.
    pub fn abort(&self) {
        {
            let mut inst = self.instance.borrow_mut();
            inst.generation += 1;
            if let Some(token) = inst.cancel.take() {
                token.cancel();
            }
            let prev_state = std::mem::take(&mut inst.state);
            inst.state = prev_state.into_init_or_aborted();
            debug!(generation = inst.generation, "task aborted");
        }
        self.notify_change();
    }

    fn notify_change(&self) {
        if let Some(cb) = &self.options.on_change {
            cb();
        }
    }
}

/// Awaits the operation and performs the fenced check-and-publish. All
/// mutation happens synchronously after the single await, so no lock is
/// needed under the cooperative single-threaded model.
async fn settle<P: Clone>(
    instance: Rc<RefCell<Instance<P>>>,
    options: Rc<TaskOptions<P>>,
    my_gen: u64,
    fut: TaskFuture<P>,
) -> AsyncState<P> {
    match fut.await {
        Ok(payload) => {
            let outcome = AsyncState::success(payload);
            let published = {
                let mut inst = instance.borrow_mut();
                if inst.generation == my_gen {
                    inst.cancel = None;
                    inst.state = outcome.clone();
                    true
                } else {
                    false
                }
            };
            if published {
                if let Some(cb) = &options.on_change {
                    cb();
                }
                if let (Some(cb), Some(payload)) = (&options.on_success, outcome.payload()) {
                    cb(payload);
                }
            } else {
                trace!(generation = my_gen, "discarding superseded success");
            }
            outcome
        }
        Err(TaskError::Cancelled) => {
            // A supersession-caused cancellation always fails the fence (the
            // newer trigger bumped the generation first), so only an
            // operation cancelling itself while still current lands here.
            let published = {
                let mut inst = instance.borrow_mut();
                if inst.generation == my_gen {
                    inst.cancel = None;
                    let prev_state = std::mem::take(&mut inst.state);
                    inst.state = prev_state.into_init_or_aborted();
                    true
                } else {
                    false
                }
            };
            if published {
                if let Some(cb) = &options.on_change {
                    cb();
                }
            } else {
                trace!(generation = my_gen, "discarding superseded cancellation");
            }
            AsyncState::aborted()
        }
        Err(TaskError::Failed(error)) => {
            let outcome = AsyncState::Error {
                error: Arc::new(error),
            };
            let published = {
                let mut inst = instance.borrow_mut();
                if inst.generation == my_gen {
                    inst.cancel = None;
                    inst.state = outcome.clone();
                    true
                } else {
                    false
                }
            };
            if published {
                if let Some(cb) = &options.on_change {
                    cb();
                }
                if let (Some(cb), Some(error)) = (&options.on_error, outcome.error()) {
                    cb(error);
                }
            } else {
                trace!(generation = my_gen, "discarding superseded failure");
            }
            outcome
        }
    }
}
