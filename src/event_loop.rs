//! A minimal single-threaded event loop.
//!
//! The awaitables in this crate only need a "run this later" primitive from
//! their host. `EventLoop` is the smallest host that provides it: a FIFO
//! queue of callbacks, drained one turn at a time. Real hosts with timers and
//! I/O implement [`Scheduler`] themselves; this one is what the crate's tests
//! and simple programs run on.

use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::rc::Rc;

use tracing::{error, trace};

use crate::awaitable::Awaitable;
use crate::error::Error;
use crate::scheduler::{self, Callback, Scheduler};

/// A panic payload that escaped a scheduled callback.
pub type Unhandled = Box<dyn Any + Send>;

type ErrorHandler = Rc<dyn Fn(Unhandled)>;

struct Inner {
    queue: RefCell<VecDeque<Callback>>,
    error_handler: RefCell<Option<ErrorHandler>>,
}

/// A FIFO queue of callbacks run in turns.
///
/// `EventLoop` is a cheap handle: clones share the same queue. One turn runs
/// every callback that was queued when the turn began, in order; callbacks
/// queued while a turn is running wait for the next one.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use coawait::{EventLoop, scheduler};
///
/// let event_loop = EventLoop::new();
/// let turns = Rc::new(Cell::new(0));
/// let seen = turns.clone();
/// event_loop.enter(|| {
///     scheduler::defer(move || {
///         seen.set(seen.get() + 1);
///         scheduler::defer(move || seen.set(seen.get() + 1));
///     });
/// });
/// assert_eq!(turns.get(), 0);
/// assert_eq!(event_loop.run_turn(), 1);
/// assert_eq!(turns.get(), 1);
/// event_loop.run();
/// assert_eq!(turns.get(), 2);
/// ```
#[derive(Clone)]
pub struct EventLoop {
    inner: Rc<Inner>,
}

thread_local! {
    static THREAD_DEFAULT: EventLoop = EventLoop::new();
}

impl EventLoop {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Inner {
                queue: RefCell::new(VecDeque::new()),
                error_handler: RefCell::new(None),
            }),
        }
    }

    /// The loop that `scheduler::defer()` falls back to on this thread when
    /// no scheduler has been entered.
    pub fn thread_default() -> Self {
        THREAD_DEFAULT.with(|event_loop| event_loop.clone())
    }

    /// Installs a handler for panics escaping scheduled callbacks, including
    /// observer panics redirected here by awaitables.
    ///
    /// Without a handler such a panic propagates out of `run()`,
    /// `run_turn()` or `wait()`. Callbacks of the interrupted turn that had
    /// not run yet stay queued.
    pub fn set_error_handler(&self, handler: impl Fn(Unhandled) + 'static) {
        *self.inner.error_handler.borrow_mut() = Some(Rc::new(handler));
    }

    /// Number of callbacks waiting for a turn.
    pub fn pending(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Runs `function` with this loop as the thread's current scheduler.
    pub fn enter<F, R>(&self, function: F) -> R
    where
        F: FnOnce() -> R,
    {
        scheduler::enter(Rc::new(self.clone()), function)
    }

    /// Runs one turn and returns how many callbacks it ran.
    pub fn run_turn(&self) -> usize {
        let mut batch = std::mem::take(&mut *self.inner.queue.borrow_mut());
        let count = batch.len();
        if count == 0 {
            return 0;
        }
        trace!(callbacks = count, "event loop turn");
        self.enter(|| {
            while let Some(callback) = batch.pop_front() {
                if let Err(payload) = catch_unwind(AssertUnwindSafe(callback)) {
                    self.unhandled(payload, &mut batch);
                }
            }
        });
        count
    }

    /// Runs turns until no callbacks are left.
    pub fn run(&self) {
        while self.run_turn() > 0 {}
    }

    /// Runs turns until `awaitable` settles and returns its outcome.
    ///
    /// Returns `Err(Error::Stalled)` when the loop runs out of callbacks while
    /// the awaitable is still pending; nothing queued on this loop could
    /// settle it anymore.
    pub fn wait<T, E, A>(&self, awaitable: &A) -> Result<Result<T, E>, Error>
    where
        A: Awaitable<T, E> + ?Sized,
        T: 'static,
        E: 'static,
    {
        let slot = Rc::new(RefCell::new(None));
        let sink = slot.clone();
        self.enter(|| {
            awaitable.when(Box::new(move |outcome| {
                *sink.borrow_mut() = Some(outcome);
            }))
        });
        loop {
            if let Some(outcome) = slot.borrow_mut().take() {
                return Ok(outcome);
            }
            if self.run_turn() == 0 {
                return Err(Error::Stalled);
            }
        }
    }

    fn unhandled(&self, payload: Unhandled, rest: &mut VecDeque<Callback>) {
        let handler = self.inner.error_handler.borrow().clone();
        match handler {
            Some(handler) => {
                error!(
                    panic = panic_message(payload.as_ref()),
                    "unhandled panic in scheduled callback"
                );
                handler(payload);
            }
            None => {
                let mut queue = self.inner.queue.borrow_mut();
                while let Some(callback) = rest.pop_back() {
                    queue.push_front(callback);
                }
                drop(queue);
                resume_unwind(payload);
            }
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

impl Scheduler for EventLoop {
    fn schedule_later(&self, callback: Callback) {
        self.inner.queue.borrow_mut().push_back(callback);
    }
}

/// The message of a panic payload, when it carries one.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}
