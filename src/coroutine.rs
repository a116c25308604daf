use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use either::Either::{Left, Right};
use tracing::{debug, error, trace};

use crate::awaitable::{Awaitable, Observer, Suspension, impl_suspension};
use crate::error::InvalidYield;
use crate::fixed_point::FixedPointCoro;
use crate::queue::ContinuationQueue;
use crate::resolution::{Resolution, Status};
use crate::resumption::Resumption;
use crate::scheduler;
use crate::suspend::Suspend::{Return, Yield};

/// How many continuations may nest synchronously on the native stack before
/// the next one is deferred to a later scheduler turn.
pub const DEFAULT_MAX_CONTINUATION_DEPTH: usize = 3;

/// An awaitable driven by a computation that suspends on other awaitables.
///
/// The computation runs up to its first suspension point as soon as the
/// coroutine is created. Every time it yields an awaitable, the coroutine
/// subscribes to it and resumes the computation with the outcome: a
/// `Resumption::Value` on success, a `Resumption::Error` on failure, raised
/// at the suspension point so that the computation can recover. The
/// coroutine resolves with the computation's final `Ok` value, or fails with
/// its final `Err`.
///
/// Awaitables that are already settled resume the computation synchronously.
/// After `max_continuation_depth` such resumptions have nested on the stack,
/// the next one is deferred to a later turn of the current scheduler, so a
/// computation awaiting an unbounded number of settled awaitables runs in
/// bounded stack space.
///
/// A computation that yields something that is not an awaitable is
/// disposed of: the `InvalidYield` fault is raised into it until it returns,
/// then the coroutine fails with the fault, or with the error its cleanup
/// returned instead.
///
/// A computation that panics is not disposed of. A panic while the
/// coroutine is being created propagates to the caller. A panic while it is
/// being resumed by a settling awaitable is isolated like any observer
/// panic and re-raised on a later scheduler turn, and the coroutine stays
/// pending for good: its observers are never called.
///
/// # Examples
///
/// ```rust
/// use core::ops::ControlFlow::{Break, Continue};
///
/// use coawait::{Coroutine, EventLoop, InvalidYield, Resolution, Resumption, from_control_flow};
///
/// #[derive(Debug, Clone, PartialEq)]
/// enum FetchError {
///     NotFound,
///     Invalid(InvalidYield),
/// }
/// impl From<InvalidYield> for FetchError {
///     fn from(fault: InvalidYield) -> Self {
///         FetchError::Invalid(fault)
///     }
/// }
///
/// let event_loop = EventLoop::new();
/// let primary = Resolution::<String, FetchError>::new();
/// let awaited = primary.clone();
/// let mut tried_primary = false;
/// let fetch = event_loop.enter(|| {
///     Coroutine::new(from_control_flow(move |input: Resumption<String, FetchError>| match input {
///         Resumption::Start => Continue(awaited.clone()),
///         // Fall back once when the primary source is missing.
///         Resumption::Error(FetchError::NotFound) if !tried_primary => {
///             tried_primary = true;
///             let fallback = Resolution::new();
///             fallback.resolve("cached".to_string()).unwrap();
///             Continue(fallback)
///         }
///         Resumption::Error(error) => Break(Err(error)),
///         Resumption::Value(body) => Break(Ok(body.to_uppercase())),
///     }))
/// });
///
/// primary.fail(FetchError::NotFound).unwrap();
/// assert_eq!(event_loop.wait(&fetch), Ok(Ok("CACHED".to_string())));
/// ```
pub struct Coroutine<T, E> {
    resolution: Resolution<T, E>,
}

/// Configures and starts a [`Coroutine`].
///
/// ```rust
/// use core::ops::ControlFlow::Break;
///
/// use coawait::{CoroutineBuilder, InvalidYield, Resumption, Status, Success, from_control_flow};
///
/// let coroutine = CoroutineBuilder::new()
///     .max_continuation_depth(16)
///     .spawn(from_control_flow(|_: Resumption<u8, InvalidYield>| {
///         Break::<_, Success<u8, InvalidYield>>(Ok(1))
///     }));
/// assert_eq!(coroutine.status(), Status::Resolved);
/// ```
#[derive(Debug, Clone)]
pub struct CoroutineBuilder {
    max_continuation_depth: usize,
}

impl Default for CoroutineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CoroutineBuilder {
    pub fn new() -> Self {
        Self {
            max_continuation_depth: DEFAULT_MAX_CONTINUATION_DEPTH,
        }
    }

    /// Sets how many synchronous continuations may nest before deferring to
    /// the scheduler. Zero defers every continuation that would otherwise
    /// run inside the settlement of the awaitable being waited on.
    pub fn max_continuation_depth(mut self, depth: usize) -> Self {
        self.max_continuation_depth = depth;
        self
    }

    /// Starts driving `computation`.
    pub fn spawn<T, E, Y, C>(self, computation: C) -> Coroutine<T, E>
    where
        T: Clone + 'static,
        E: Clone + From<InvalidYield> + 'static,
        Y: Suspension<T, E> + 'static,
        C: FixedPointCoro<Resumption<T, E>, Y, Result<T, E>> + 'static,
    {
        let resolution = Resolution::new();
        let driver: Rc<RefCell<Driver<T, E, Y, C>>> = Rc::new(RefCell::new(Driver {
            computation: None,
            depth: 0,
            max_depth: self.max_continuation_depth,
            resolution: resolution.clone(),
            _yield: PhantomData,
        }));
        Driver::advance(&driver, computation, Resumption::Start);
        Coroutine { resolution }
    }
}

impl<T, E> Coroutine<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Starts driving `computation` with the default configuration.
    pub fn new<Y, C>(computation: C) -> Self
    where
        E: From<InvalidYield>,
        Y: Suspension<T, E> + 'static,
        C: FixedPointCoro<Resumption<T, E>, Y, Result<T, E>> + 'static,
    {
        CoroutineBuilder::new().spawn(computation)
    }

    pub fn status(&self) -> Status {
        self.resolution.status()
    }

    /// The final outcome, once the computation has finished.
    pub fn outcome(&self) -> Option<Result<T, E>> {
        self.resolution.outcome()
    }
}

impl<T, E> Awaitable<T, E> for Coroutine<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    fn when(&self, observer: Observer<T, E>) {
        self.resolution.when(observer)
    }

    fn when_queue(&self, queue: ContinuationQueue<T, E>) {
        self.resolution.when_queue(queue)
    }

    fn state_ptr(&self) -> Option<*const ()> {
        self.resolution.state_ptr()
    }
}

impl_suspension!(Coroutine);

impl<T, E> Clone for Coroutine<T, E> {
    fn clone(&self) -> Self {
        Self {
            resolution: self.resolution.clone(),
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Coroutine<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Coroutine").field(&self.resolution).finish()
    }
}

// The computation and bookkeeping behind a `Coroutine`. Kept alive by the
// continuation registered on whatever the computation is waiting on.
struct Driver<T, E, Y, C> {
    // `None` while the computation is running or once it has finished.
    computation: Option<C>,
    // Continuations of this driver currently nested on the native stack.
    depth: usize,
    max_depth: usize,
    resolution: Resolution<T, E>,
    _yield: PhantomData<fn() -> Y>,
}

impl<T, E, Y, C> Driver<T, E, Y, C>
where
    T: Clone + 'static,
    E: Clone + From<InvalidYield> + 'static,
    Y: Suspension<T, E> + 'static,
    C: FixedPointCoro<Resumption<T, E>, Y, Result<T, E>> + 'static,
{
    // Resumes the computation and acts on where it stops next.
    fn advance(driver: &Rc<RefCell<Self>>, computation: C, input: Resumption<T, E>) {
        match computation.resume(input) {
            Yield(suspension, next) => match suspension.into_awaitable() {
                Left(awaitable) => {
                    driver.borrow_mut().computation = Some(next);
                    Self::subscribe(driver, awaitable);
                }
                Right(fault) => {
                    debug!(%fault, "coroutine yielded a non-awaitable");
                    Self::dispose(driver, next, E::from(fault));
                }
            },
            Return(Ok(value)) => Self::settle(driver, Ok(value)),
            Return(Err(error)) => Self::settle(driver, Err(error)),
        }
    }

    fn subscribe(driver: &Rc<RefCell<Self>>, awaitable: Rc<dyn Awaitable<T, E>>) {
        let continuation = {
            let driver = driver.clone();
            Box::new(move |outcome| Self::on_settled(&driver, outcome))
        };
        driver.borrow_mut().depth += 1;
        awaitable.when(continuation);
        driver.borrow_mut().depth -= 1;
    }

    // The single re-entry point: the awaitable being waited on has settled.
    fn on_settled(driver: &Rc<RefCell<Self>>, outcome: Result<T, E>) {
        let (depth, max_depth) = {
            let driver = driver.borrow();
            (driver.depth, driver.max_depth)
        };
        if depth > max_depth {
            debug!(depth, "deferring coroutine continuation to the next turn");
            let driver = driver.clone();
            scheduler::defer(move || Self::on_settled(&driver, outcome));
            return;
        }
        let Some(computation) = driver.borrow_mut().computation.take() else {
            error!("coroutine continuation ran without a suspended computation");
            return;
        };
        Self::advance(driver, computation, Resumption::from(outcome));
    }

    // Runs the computation to completion by raising `error` into it at every
    // suspension point, then fails with `error` or with whatever newer error
    // the computation finished with.
    fn dispose(driver: &Rc<RefCell<Self>>, computation: C, error: E) {
        let mut computation = computation;
        let mut raised = 1usize;
        let error = loop {
            match computation.resume(Resumption::Error(error.clone())) {
                Yield(_, next) => {
                    computation = next;
                    raised += 1;
                }
                Return(Ok(_)) => break error,
                Return(Err(newer)) => break newer,
            }
        };
        debug!(raised, "disposed of coroutine computation");
        Self::settle(driver, Err(error));
    }

    fn settle(driver: &Rc<RefCell<Self>>, outcome: Result<T, E>) {
        let resolution = driver.borrow().resolution.clone();
        trace!(ok = outcome.is_ok(), "coroutine finished");
        if let Err(err) = resolution.settle(outcome) {
            error!(%err, "coroutine settled more than once");
        }
    }
}
