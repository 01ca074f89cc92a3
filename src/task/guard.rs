use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::warn;

const CALLS_LIMIT: usize = 5;
const TIME_LIMIT: Duration = Duration::from_millis(500);

/// Development-time guard against runaway auto-trigger loops: an auto task
/// whose dependencies "change" on every host re-render would otherwise
/// re-trigger forever. Compiled to a no-op in release builds.
#[derive(Debug, Default)]
pub(crate) struct RunawayGuard {
    recent: VecDeque<Instant>,
}

impl RunawayGuard {
    /// Records one auto-trigger. Panics if the rate exceeds the limit.
    pub fn note_trigger(&mut self) {
        if !cfg!(debug_assertions) {
            return;
        }
        let now = Instant::now();
        while let Some(oldest) = self.recent.front() {
            if now.duration_since(*oldest) > TIME_LIMIT {
                self.recent.pop_front();
            } else {
                break;
            }
        }
        self.recent.push_back(now);
        if self.recent.len() >= CALLS_LIMIT {
            warn!(
                calls = self.recent.len(),
                window_ms = TIME_LIMIT.as_millis() as u64,
                "runaway auto task detected"
            );
            panic!(
                "runaway auto task detected: re-triggered {CALLS_LIMIT} times within \
                 {TIME_LIMIT:?}. Its dependencies are reported as changed far faster than \
                 any reasonable host re-render cadence; make sure they are stable."
            );
        }
    }
}
