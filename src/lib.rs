//! Race-safe coordination of async operations for interactive callers.
//!
//! Each tracked instance exposes a single consistent [`AsyncState`] at all
//! times; re-triggering cancels and fences out the superseded attempt so a
//! stale result can never overwrite fresher state.

pub mod cancel;
pub mod error;
pub mod state;
pub mod task;

// Re-export the working set so most callers only need the crate root.
pub use cancel::{abortable, CancellationToken};
pub use error::TaskError;
pub use state::{AsyncState, Progress, Visitors};
pub use task::auto::{bind, AutoTask, Lifecycle};
pub use task::registry::{AsyncTaskHandle, KeyedTaskRegistry};
pub use task::runner::TaskRunner;
pub use task::{TaskFuture, TaskOptions};
