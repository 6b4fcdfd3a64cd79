//! Cancellation of requests in flight.

use futures_util::future::{AbortHandle, AbortRegistration};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Cancellation flag shared between a request pipeline and whoever wants to cancel it.
///
/// The flag only ever goes from unset to set. Besides the flag, the token holds the
/// abort handle of the operation the pipeline is currently suspended on, so that
/// `cancel()` can interrupt it. Both live behind the same mutex, which means a
/// cancel either lands before the pipeline checks the flag (and no operation is
/// started), or after the operation is armed (and the operation is aborted).
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<Mutex<TokenState>>);

#[derive(Default)]
struct TokenState {
    cancelled: bool,
    outstanding: Option<AbortHandle>,
}

impl CancellationToken {
    /// Create a new, unset, token.
    pub fn new() -> Self {
        CancellationToken::default()
    }

    /// Set the flag and interrupt the outstanding operation, if any.
    ///
    /// Calling this more than once has no further effect.
    pub fn cancel(&self) {
        let mut state = self.0.lock().unwrap();

        if !state.cancelled {
            trace!("Cancellation token set");
        }
        state.cancelled = true;

        if let Some(handle) = state.outstanding.take() {
            handle.abort();
        }
    }

    /// Tell if the token is set.
    pub fn is_cancelled(&self) -> bool {
        self.0.lock().unwrap().cancelled
    }

    /// Check the flag before starting the next operation.
    ///
    /// Returns `None` if cancelled. Otherwise arms a fresh abort handle and returns the
    /// registration the operation must be wrapped with.
    pub(crate) fn guard(&self) -> Option<AbortRegistration> {
        let mut state = self.0.lock().unwrap();

        if state.cancelled {
            return None;
        }

        let (handle, registration) = AbortHandle::new_pair();
        state.outstanding = Some(handle);

        Some(registration)
    }

    /// Forget the outstanding operation. Used once the pipeline is terminal.
    pub(crate) fn disarm(&self) {
        self.0.lock().unwrap().outstanding = None;
    }

    pub(crate) fn same_as(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CancellationToken({})", self.is_cancelled())
    }
}
