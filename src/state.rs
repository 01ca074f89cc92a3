use std::sync::Arc;

/// Discriminant tag for an [`AsyncState`], useful when callers need to
/// aggregate over states carrying different payload types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Init,
    InProgress,
    Success,
    Error,
}

/// The current knowledge about one async operation instance.
///
/// Exactly one variant holds at any instant. `invalidated` is only carried by
/// `Success` and means a newer attempt is in flight while the stale payload
/// stays visible. A failed refresh of a previously successful instance
/// discards the stale payload in favor of `Error`; that is deliberate, not
/// an oversight.
#[derive(Debug, Clone)]
pub enum AsyncState<P> {
    Init { aborted: bool },
    InProgress,
    Success { payload: P, invalidated: bool },
    Error { error: Arc<anyhow::Error> },
}

impl<P> Default for AsyncState<P> {
    fn default() -> Self {
        AsyncState::Init { aborted: false }
    }
}

impl<P> AsyncState<P> {
    pub fn init() -> Self {
        AsyncState::Init { aborted: false }
    }

    pub fn aborted() -> Self {
        AsyncState::Init { aborted: true }
    }

    pub fn in_progress() -> Self {
        AsyncState::InProgress
    }

    pub fn success(payload: P) -> Self {
        AsyncState::Success {
            payload,
            invalidated: false,
        }
    }

    pub fn failure(error: anyhow::Error) -> Self {
        AsyncState::Error {
            error: Arc::new(error),
        }
    }

    pub fn progress(&self) -> Progress {
        match self {
            AsyncState::Init { .. } => Progress::Init,
            AsyncState::InProgress => Progress::InProgress,
            AsyncState::Success { .. } => Progress::Success,
            AsyncState::Error { .. } => Progress::Error,
        }
    }

    pub fn is_init(&self) -> bool {
        matches!(self, AsyncState::Init { .. })
    }

    /// True for `Init` states produced by cancelling live work, as opposed
    /// to never-started ones.
    pub fn is_aborted(&self) -> bool {
        matches!(self, AsyncState::Init { aborted: true })
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, AsyncState::InProgress)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AsyncState::Success { .. })
    }

    pub fn is_valid_success(&self) -> bool {
        matches!(self, AsyncState::Success { invalidated: false, .. })
    }

    pub fn is_invalidated(&self) -> bool {
        matches!(self, AsyncState::Success { invalidated: true, .. })
    }

    /// True iff work is conceptually outstanding: either a bare `InProgress`
    /// or a stale `Success` kept visible while a refresh runs.
    pub fn is_in_progress_or_invalidated(&self) -> bool {
        self.is_in_progress() || self.is_invalidated()
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AsyncState::Error { .. })
    }

    pub fn payload(&self) -> Option<&P> {
        match self {
            AsyncState::Success { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&anyhow::Error> {
        match self {
            AsyncState::Error { error } => Some(error.as_ref()),
            _ => None,
        }
    }

    /// Transition used when a new attempt starts: a prior `Success` keeps
    /// its payload and is flagged invalidated instead of flashing back to a
    /// payload-less `InProgress`; everything else becomes bare `InProgress`.
    pub fn into_in_progress_or_invalidated(self) -> Self {
        match self {
            AsyncState::Success { payload, .. } => AsyncState::Success {
                payload,
                invalidated: true,
            },
            _ => AsyncState::InProgress,
        }
    }

    /// Transition used when cancelling or resetting. The `aborted` flag is
    /// set only when something was actually outstanding, so aborting an
    /// untouched instance stays a clean `Init`.
    pub fn into_init_or_aborted(self) -> Self {
        AsyncState::Init {
            aborted: self.is_in_progress_or_invalidated(),
        }
    }

    /// Maps the payload of a `Success`, preserving `invalidated`; any other
    /// variant passes through with its payload type widened.
    pub fn map<T>(self, f: impl FnOnce(P) -> T) -> AsyncState<T> {
        match self {
            AsyncState::Success {
                payload,
                invalidated,
            } => AsyncState::Success {
                payload: f(payload),
                invalidated,
            },
            AsyncState::Init { aborted } => AsyncState::Init { aborted },
            AsyncState::InProgress => AsyncState::InProgress,
            AsyncState::Error { error } => AsyncState::Error { error },
        }
    }

    /// Consumes the state through up to four visitors. A missing visitor
    /// yields the neutral `R::default()` for that branch. This is the sole
    /// read interface intended for rendering layers.
    pub fn fold<R: Default>(&self, visitors: Visitors<'_, P, R>) -> R {
        match self {
            AsyncState::Init { aborted } => match visitors.init {
                Some(f) => f(*aborted),
                None => R::default(),
            },
            AsyncState::InProgress => match visitors.in_progress {
                Some(f) => f(),
                None => R::default(),
            },
            AsyncState::Success {
                payload,
                invalidated,
            } => match visitors.success {
                Some(f) => f(payload, *invalidated),
                None => R::default(),
            },
            AsyncState::Error { error } => match visitors.error {
                Some(f) => f(error.as_ref()),
                None => R::default(),
            },
        }
    }
}

/// Visitor set for [`AsyncState::fold`]. Built incrementally; every branch
/// is optional.
pub struct Visitors<'a, P, R> {
    pub init: Option<Box<dyn FnOnce(bool) -> R + 'a>>,
    pub in_progress: Option<Box<dyn FnOnce() -> R + 'a>>,
    pub success: Option<Box<dyn FnOnce(&P, bool) -> R + 'a>>,
    pub error: Option<Box<dyn FnOnce(&anyhow::Error) -> R + 'a>>,
}

impl<'a, P, R> Default for Visitors<'a, P, R> {
    fn default() -> Self {
        Visitors {
            init: None,
            in_progress: None,
            success: None,
            error: None,
        }
    }
}

impl<'a, P, R> Visitors<'a, P, R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_init(mut self, f: impl FnOnce(bool) -> R + 'a) -> Self {
        self.init = Some(Box::new(f));
        self
    }

    pub fn on_in_progress(mut self, f: impl FnOnce() -> R + 'a) -> Self {
        self.in_progress = Some(Box::new(f));
        self
    }

    pub fn on_success(mut self, f: impl FnOnce(&P, bool) -> R + 'a) -> Self {
        self.success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(&anyhow::Error) -> R + 'a) -> Self {
        self.error = Some(Box::new(f));
        self
    }
}
