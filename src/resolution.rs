use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::awaitable::{Awaitable, Observer, impl_suspension};
use crate::error::Error;
use crate::queue::{ContinuationQueue, notify};

/// Where a resolution is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Pending,
    Resolved,
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Pending => "pending",
            Status::Resolved => "resolved",
            Status::Failed => "failed",
        })
    }
}

enum State<T, E> {
    Pending(ContinuationQueue<T, E>),
    // Locked in to another awaitable's outcome, which is not known yet.
    Following(Rc<dyn Awaitable<T, E>>),
    Resolved(T),
    Failed(E),
}

enum Known<T, E> {
    Following(Rc<dyn Awaitable<T, E>>),
    Outcome(Result<T, E>),
}

/// The settlement state shared by a producer and its consumers.
///
/// A `Resolution` starts pending and is settled exactly once with
/// `resolve()`, `fail()` or `resolve_with()`. Every clone is a handle to the
/// same state, so the producer keeps one clone to settle and hands out others
/// to observe.
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use coawait::{Awaitable, Error, Resolution, Status};
///
/// let resolution = Resolution::<u32, String>::new();
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = seen.clone();
/// resolution.when(Box::new(move |outcome| sink.borrow_mut().push(outcome)));
///
/// resolution.resolve(7).unwrap();
/// assert_eq!(resolution.status(), Status::Resolved);
/// assert_eq!(*seen.borrow(), vec![Ok(7)]);
///
/// // Settlement happens once; later attempts are rejected.
/// assert_eq!(resolution.fail("late".to_string()), Err(Error::AlreadySettled));
/// assert_eq!(resolution.outcome(), Some(Ok(7)));
/// ```
pub struct Resolution<T, E> {
    state: Rc<RefCell<State<T, E>>>,
}

impl<T, E> Resolution<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(State::Pending(ContinuationQueue::new()))),
        }
    }

    /// Resolves with `value` and notifies every queued observer.
    pub fn resolve(&self, value: T) -> Result<(), Error> {
        self.settle(Ok(value))
    }

    /// Fails with `error` and notifies every queued observer.
    pub fn fail(&self, error: E) -> Result<(), Error> {
        self.settle(Err(error))
    }

    /// Settles with `outcome`.
    ///
    /// Returns `Err(Error::AlreadySettled)` without touching the stored
    /// outcome or notifying anyone if this resolution was settled before.
    pub fn settle(&self, outcome: Result<T, E>) -> Result<(), Error> {
        let queue = {
            let mut state = self.state.borrow_mut();
            let State::Pending(queue) = &mut *state else {
                return Err(Error::AlreadySettled);
            };
            let queue = std::mem::take(queue);
            *state = match &outcome {
                Ok(value) => State::Resolved(value.clone()),
                Err(error) => State::Failed(error.clone()),
            };
            queue
        };
        trace!(
            status = %if outcome.is_ok() { Status::Resolved } else { Status::Failed },
            observers = queue.len(),
            "resolution settled"
        );
        queue.invoke(outcome);
        Ok(())
    }

    /// Settles with whatever `awaitable` eventually settles with.
    ///
    /// The observers queued so far are handed to `awaitable` in one piece,
    /// and observers registered from now on are forwarded to it until it
    /// settles. When `awaitable` is itself a pending `Resolution`, the queues
    /// are merged rather than chained, so long chains of resolutions adopting
    /// each other notify their observers without nesting.
    ///
    /// This counts as settling: a later `resolve()`, `fail()` or
    /// `resolve_with()` is rejected even while the adopted awaitable is still
    /// pending, and `status()` stays `Pending` until it settles.
    ///
    /// ```rust
    /// use coawait::{Resolution, Status};
    ///
    /// let inner = Resolution::<&str, ()>::new();
    /// let outer = Resolution::<&str, ()>::new();
    /// outer.resolve_with(inner.clone()).unwrap();
    /// assert_eq!(outer.status(), Status::Pending);
    ///
    /// inner.resolve("done").unwrap();
    /// assert_eq!(outer.outcome(), Some(Ok("done")));
    /// ```
    pub fn resolve_with<A>(&self, awaitable: A) -> Result<(), Error>
    where
        A: Awaitable<T, E> + 'static,
    {
        if awaitable.state_ptr() == self.state_ptr() {
            return Err(Error::SelfAdoption);
        }
        let source: Rc<dyn Awaitable<T, E>> = Rc::new(awaitable);
        let queue = {
            let mut state = self.state.borrow_mut();
            let State::Pending(queue) = &mut *state else {
                return Err(Error::AlreadySettled);
            };
            let queue = std::mem::take(queue);
            *state = State::Following(source.clone());
            queue
        };
        trace!(observers = queue.len(), "resolution adopting another awaitable");
        let mut forwarded = ContinuationQueue::with(self.recorder());
        forwarded.append(queue);
        source.when_queue(forwarded);
        Ok(())
    }

    pub fn status(&self) -> Status {
        match &*self.state.borrow() {
            State::Pending(_) | State::Following(_) => Status::Pending,
            State::Resolved(_) => Status::Resolved,
            State::Failed(_) => Status::Failed,
        }
    }

    /// The outcome, once known.
    pub fn outcome(&self) -> Option<Result<T, E>> {
        match &*self.state.borrow() {
            State::Pending(_) | State::Following(_) => None,
            State::Resolved(value) => Some(Ok(value.clone())),
            State::Failed(error) => Some(Err(error.clone())),
        }
    }

    // An observer that stores the adopted awaitable's outcome on this
    // resolution. Holds the state weakly so that an adopted awaitable that
    // never settles does not keep this resolution alive.
    fn recorder(&self) -> Observer<T, E> {
        let state = Rc::downgrade(&self.state);
        Box::new(move |outcome| record(&state, outcome))
    }
}

fn record<T, E>(state: &Weak<RefCell<State<T, E>>>, outcome: Result<T, E>) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let mut state = state.borrow_mut();
    if let State::Following(_) = &*state {
        *state = match outcome {
            Ok(value) => State::Resolved(value),
            Err(error) => State::Failed(error),
        };
    }
}

impl<T, E> Awaitable<T, E> for Resolution<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    fn when(&self, observer: Observer<T, E>) {
        let known = match &mut *self.state.borrow_mut() {
            State::Pending(queue) => {
                queue.push(observer);
                return;
            }
            State::Following(source) => Known::Following(source.clone()),
            State::Resolved(value) => Known::Outcome(Ok(value.clone())),
            State::Failed(error) => Known::Outcome(Err(error.clone())),
        };
        match known {
            Known::Following(source) => source.when(observer),
            Known::Outcome(outcome) => notify(observer, outcome),
        }
    }

    fn when_queue(&self, incoming: ContinuationQueue<T, E>) {
        let known = match &mut *self.state.borrow_mut() {
            State::Pending(queue) => {
                queue.append(incoming);
                return;
            }
            State::Following(source) => Known::Following(source.clone()),
            State::Resolved(value) => Known::Outcome(Ok(value.clone())),
            State::Failed(error) => Known::Outcome(Err(error.clone())),
        };
        match known {
            Known::Following(source) => source.when_queue(incoming),
            Known::Outcome(outcome) => incoming.invoke(outcome),
        }
    }

    fn state_ptr(&self) -> Option<*const ()> {
        Some(Rc::as_ptr(&self.state).cast())
    }
}

impl_suspension!(Resolution);

impl<T, E> Clone for Resolution<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T, E> Default for Resolution<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for Resolution<T, E>
where
    T: fmt::Debug,
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Resolution");
        match &*self.state.borrow() {
            State::Pending(queue) => debug.field("pending", queue),
            State::Following(_) => debug.field("following", &"<awaitable>"),
            State::Resolved(value) => debug.field("resolved", value),
            State::Failed(error) => debug.field("failed", error),
        };
        debug.finish()
    }
}
