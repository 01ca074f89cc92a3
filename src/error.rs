use thiserror::Error;

/// How a task operation can fail.
///
/// The runner treats the two variants very differently: `Cancelled` is
/// absorbed into `Init { aborted: true }` (if still current) and never
/// reaches the error callback, while `Failed` is published as an `Error`
/// state and surfaced through `on_error`.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The operation observed its cancellation token and stopped early.
    #[error("task was cancelled")]
    Cancelled,

    /// The operation failed for a domain reason (network error, bad
    /// response, ...).
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl TaskError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }
}
