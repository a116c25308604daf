use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};

use tracing::warn;

use crate::awaitable::Observer;
use crate::event_loop::panic_message;
use crate::scheduler;

/// The observers of one pending awaitable, in registration order.
///
/// Queues merge by moving elements, never by nesting one queue inside
/// another, so handing a queue from resolution to resolution along a chain
/// of adoptions costs no extra stack depth when it is finally invoked.
pub struct ContinuationQueue<T, E> {
    observers: Vec<Observer<T, E>>,
}

impl<T, E> ContinuationQueue<T, E> {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// A queue holding a single observer.
    pub fn with(observer: Observer<T, E>) -> Self {
        Self {
            observers: vec![observer],
        }
    }

    pub fn push(&mut self, observer: Observer<T, E>) {
        self.observers.push(observer);
    }

    /// Moves every observer of `other` to the back of this queue, keeping
    /// their order.
    pub fn append(&mut self, mut other: ContinuationQueue<T, E>) {
        self.observers.append(&mut other.observers);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl<T: Clone, E: Clone> ContinuationQueue<T, E> {
    /// Invokes every observer with `outcome`, in order, consuming the queue.
    ///
    /// An observer that panics does not stop the ones after it.
    pub fn invoke(self, outcome: Result<T, E>) {
        let mut observers = self.observers.into_iter();
        let Some(last) = observers.next_back() else {
            return;
        };
        for observer in observers {
            notify(observer, outcome.clone());
        }
        notify(last, outcome);
    }
}

impl<T, E> Default for ContinuationQueue<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for ContinuationQueue<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContinuationQueue")
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Invokes a single observer, redirecting a panic to the next turn of the
/// current scheduler.
pub(crate) fn notify<T, E>(observer: Observer<T, E>, outcome: Result<T, E>) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(move || observer(outcome))) {
        warn!(
            panic = panic_message(payload.as_ref()),
            "observer panicked; re-raising on the next turn"
        );
        scheduler::defer(move || resume_unwind(payload));
    }
}
