use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};

use crate::error::ScraperError;

/// Lifecycle of the scraper as seen by pair handles.
#[derive(Debug, Default)]
pub(crate) enum Lifecycle {
    #[default]
    Running,

    /// Terminal, with the error the scraper stopped on, if any.
    Closed(Option<Arc<ScraperError>>),
}

impl Lifecycle {
    /// Fails with the stored error, or [`ScraperError::Closed`] once closed.
    pub(crate) fn ensure_running(&self) -> Result<(), ScraperError> {
        match self {
            Lifecycle::Running => Ok(()),
            Lifecycle::Closed(Some(err)) => Err(ScraperError::Terminated(err.clone())),
            Lifecycle::Closed(None) => Err(ScraperError::Closed),
        }
    }
}

/// Terminal state shared between the scraper task and pair handles.
///
/// Written exactly once, by the shutdown path, read-only afterwards.
#[derive(Clone, Debug, Default)]
pub(crate) struct SharedState {
    inner: Arc<RwLock<Lifecycle>>,
}

impl SharedState {
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Lifecycle> {
        self.inner.read()
    }

    /// Moves to the terminal state. Returns `false` if it was already closed,
    /// in which case the stored error is left untouched.
    pub(crate) fn close(&self, error: Option<ScraperError>) -> bool {
        let mut state = self.inner.write();
        if matches!(*state, Lifecycle::Closed(_)) {
            return false;
        }
        *state = Lifecycle::Closed(error.map(Arc::new));
        true
    }

    pub(crate) fn is_closed(&self) -> bool {
        matches!(*self.inner.read(), Lifecycle::Closed(_))
    }

    pub(crate) fn error(&self) -> Option<Arc<ScraperError>> {
        match &*self.inner.read() {
            Lifecycle::Closed(err) => err.clone(),
            Lifecycle::Running => None,
        }
    }
}
