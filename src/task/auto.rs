use std::cell::RefCell;
use std::rc::Rc;

use super::guard::RunawayGuard;
use super::runner::TaskRunner;
use crate::state::AsyncState;

/// Host lifecycle seam. An adapter for whatever scheduling framework hosts
/// the task implements this; the core only assumes "run this now and on
/// dependency changes, run cleanup on teardown".
pub trait Lifecycle {
    fn on_setup(&mut self, hook: Box<dyn FnMut()>);
    fn on_dependencies_changed(&mut self, hook: Box<dyn FnMut()>);
    fn on_teardown(&mut self, hook: Box<dyn FnOnce()>);
}

/// Auto-run binding over a [`TaskRunner`]: triggers on mount and on
/// dependency changes (unless disabled), aborts on unmount. Carries no
/// state of its own beyond the disabled flag and the dev-time runaway
/// guard.
///
/// Triggered operations are driven via `tokio::task::spawn_local`, so the
/// binding must live inside a [`tokio::task::LocalSet`] (or another
/// current-thread local context).
pub struct AutoTask<P, Args> {
    runner: TaskRunner<P, Args>,
    args: Rc<dyn Fn() -> Args>,
    disabled: bool,
    guard: RunawayGuard,
}

impl<P: Clone + 'static, Args: 'static> AutoTask<P, Args> {
    /// Wraps a runner with an argument provider supplying the then-current
    /// trigger arguments.
    pub fn new(runner: TaskRunner<P, Args>, args: impl Fn() -> Args + 'static) -> Self {
        AutoTask {
            runner,
            args: Rc::new(args),
            disabled: false,
            guard: RunawayGuard::default(),
        }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn state(&self) -> AsyncState<P> {
        self.runner.state()
    }

    pub fn runner(&self) -> &TaskRunner<P, Args> {
        &self.runner
    }

    /// Host hook: the owning scope has mounted.
    pub fn mounted(&mut self) {
        self.run_if_enabled();
    }

    /// Host hook: a dependency of the operation changed.
    pub fn dependencies_changed(&mut self) {
        self.run_if_enabled();
    }

    /// Enabled -> disabled aborts in-flight work; disabled -> enabled
    /// triggers a fresh attempt.
    pub fn set_disabled(&mut self, disabled: bool) {
        if disabled == self.disabled {
            return;
        }
        self.disabled = disabled;
        if disabled {
            self.runner.abort();
        } else {
            self.run_if_enabled();
        }
    }

    /// Host hook: the owning scope is going away.
    pub fn unmounted(&mut self) {
        self.runner.abort();
    }

    fn run_if_enabled(&mut self) {
        if self.disabled {
            return;
        }
        self.guard.note_trigger();
        let fut = self.runner.trigger((self.args)());
        tokio::task::spawn_local(async move {
            let _ = fut.await;
        });
    }
}

/// Wires an [`AutoTask`] to a host's lifecycle hooks.
pub fn bind<L, P, Args>(host: &mut L, task: Rc<RefCell<AutoTask<P, Args>>>)
where
    L: Lifecycle,
    P: Clone + 'static,
    Args: 'static,
{
    host.on_setup(Box::new({
        let task = Rc::clone(&task);
        move || task.borrow_mut().mounted()
    }));
    host.on_dependencies_changed(Box::new({
        let task = Rc::clone(&task);
        move || task.borrow_mut().dependencies_changed()
    }));
    host.on_teardown(Box::new(move || task.borrow_mut().unmounted()));
}
