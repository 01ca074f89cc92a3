use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::ops::Deref;
use std::rc::Rc;

use tokio_util::sync::CancellationToken;

use super::{Instance, SharedOperation, TaskCore, TaskOptions};
use crate::error::TaskError;
use crate::state::AsyncState;

/// Independent [`TaskRunner`](super::runner::TaskRunner) semantics for an
/// open-ended set of keys.
///
/// Each key owns its own state, generation counter, and cancellation handle;
/// triggering or aborting one key never touches another. Entries are created
/// lazily on first access and kept until the registry is dropped, at which
/// point every live handle is cancelled exactly once.
pub struct KeyedTaskRegistry<K, P, Args> {
    instances: RefCell<HashMap<K, Rc<RefCell<Instance<P>>>>>,
    operation: SharedOperation<P, Args>,
    options: Rc<TaskOptions<P>>,
}

impl<K, P, Args> KeyedTaskRegistry<K, P, Args>
where
    K: Eq + Hash + Clone,
    P: Clone + 'static,
{
    pub fn new<F, Fut>(operation: F, options: TaskOptions<P>) -> Self
    where
        F: Fn(CancellationToken, Args) -> Fut + 'static,
        Fut: Future<Output = Result<P, TaskError>> + 'static,
    {
        KeyedTaskRegistry {
            instances: RefCell::new(HashMap::new()),
            operation: Rc::new(move |token, args| -> crate::task::TaskFuture<P> {
                Box::pin(operation(token, args))
            }),
            options: Rc::new(options),
        }
    }

    /// Returns the key's current state decorated with bound `trigger` and
    /// `abort`. A never-seen key reads as `Init { aborted: false }`.
    pub fn get(&self, key: &K) -> AsyncTaskHandle<P, Args> {
        let instance = Rc::clone(
            self.instances
                .borrow_mut()
                .entry(key.clone())
                .or_insert_with(|| Rc::new(RefCell::new(Instance::default()))),
        );
        let core = TaskCore {
            instance,
            operation: Rc::clone(&self.operation),
            options: Rc::clone(&self.options),
        };
        AsyncTaskHandle {
            state: core.snapshot(),
            core,
        }
    }
}

impl<K, P, Args> Drop for KeyedTaskRegistry<K, P, Args> {
    fn drop(&mut self) {
        for instance in self.instances.borrow_mut().values() {
            let mut inst = instance.borrow_mut();
            inst.generation += 1;
            if let Some(token) = inst.cancel.take() {
                token.cancel();
            }
        }
    }
}

/// One key's state snapshot plus bound `trigger`/`abort`, scoped to that
/// key's private generation counter and cancellation handle.
///
/// Derefs to the [`AsyncState`] snapshot taken at `get` time; use
/// [`AsyncTaskHandle::current`] for a fresh read.
pub struct AsyncTaskHandle<P, Args> {
    state: AsyncState<P>,
    core: TaskCore<P, Args>,
}

impl<P: Clone + 'static, Args> AsyncTaskHandle<P, Args> {
    /// Fresh snapshot of the key's published state.
    pub fn current(&self) -> AsyncState<P> {
        self.core.snapshot()
    }

    /// Starts a new attempt for this key; same contract as
    /// [`TaskRunner::trigger`](super::runner::TaskRunner::trigger).
    pub fn trigger(&self, args: Args) -> impl Future<Output = AsyncState<P>> + 'static {
        self.core.trigger(args)
    }

    /// Cancels this key's in-flight attempt, leaving every other key's
    /// entry and in-flight generation untouched.
    pub fn abort(&self) {
        self.core.abort();
    }
}

impl<P, Args> Deref for AsyncTaskHandle<P, Args> {
    type Target = AsyncState<P>;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}
