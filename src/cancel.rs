use std::future::Future;

use crate::error::TaskError;

pub use tokio_util::sync::CancellationToken;

/// Races an operation body against its cancellation token, turning the
/// cancelled branch into the cancellation-shaped [`TaskError::Cancelled`].
///
/// Operations that want cooperative cancellation wrap their body in this;
/// operations that ignore the token are still safe, because the runner's
/// generation fencing prevents their stale results from being published.
pub async fn abortable<P, F>(token: &CancellationToken, fut: F) -> Result<P, TaskError>
where
    F: Future<Output = anyhow::Result<P>>,
{
    tokio::select! {
        biased;
        () = token.cancelled() => Err(TaskError::Cancelled),
        out = fut => out.map_err(TaskError::from),
    }
}
