use thiserror::Error;

/// Faults raised by the settlement machinery itself, as opposed to the
/// domain errors that flow through awaitables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// `resolve()`, `fail()` or `resolve_with()` was called on a resolution
    /// that had already been settled. The earlier outcome is kept.
    #[error("awaitable has already been settled")]
    AlreadySettled,

    /// `resolve_with()` was handed the very resolution it was called on,
    /// which could never settle.
    #[error("a resolution cannot adopt its own outcome")]
    SelfAdoption,

    /// `EventLoop::wait()` ran out of scheduled work while the awaitable
    /// was still pending.
    #[error("event loop has no more work but the awaitable is still pending")]
    Stalled,
}

/// A coroutine yielded something that is not an awaitable.
///
/// The driver raises this into the coroutine (through `From<InvalidYield>`
/// on the coroutine's error type) and fails the coroutine with it, unless
/// the coroutine's cleanup fails with a newer error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unexpected yield of {yielded}; coroutines may only yield awaitables")]
pub struct InvalidYield {
    yielded: String,
}

impl InvalidYield {
    pub fn new(yielded: impl Into<String>) -> Self {
        Self {
            yielded: yielded.into(),
        }
    }

    /// A description of the offending value.
    pub fn yielded(&self) -> &str {
        &self.yielded
    }
}
