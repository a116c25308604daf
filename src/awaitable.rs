use std::rc::Rc;

use either::Either;

use crate::error::InvalidYield;
use crate::queue::ContinuationQueue;

/// A callback waiting for an awaitable to settle.
pub type Observer<T, E> = Box<dyn FnOnce(Result<T, E>)>;

/// A value that settles at most once, either resolving with a `T` or failing
/// with an `E`.
///
/// Observers registered with `when()` are invoked exactly once with the
/// outcome: in registration order once it is known, or immediately if it
/// already is. A panicking observer never disturbs the awaitable or the
/// other observers; the panic is re-raised on a later turn of the current
/// scheduler instead.
pub trait Awaitable<T, E> {
    /// Registers `observer` to receive the outcome.
    fn when(&self, observer: Observer<T, E>);

    /// Registers a whole queue of observers at once.
    ///
    /// The default wraps the queue in a single observer. Pending resolutions
    /// override this to splice the observers into their own queue instead,
    /// which keeps chains of resolutions adopting each other flat.
    fn when_queue(&self, queue: ContinuationQueue<T, E>)
    where
        T: Clone + 'static,
        E: Clone + 'static,
    {
        self.when(Box::new(move |outcome| queue.invoke(outcome)));
    }

    /// The address of the settlement state behind this awaitable, for
    /// awaitables that share one between handles.
    #[doc(hidden)]
    fn state_ptr(&self) -> Option<*const ()> {
        None
    }
}

impl<T, E, A> Awaitable<T, E> for Rc<A>
where
    A: Awaitable<T, E> + ?Sized,
{
    fn when(&self, observer: Observer<T, E>) {
        (**self).when(observer)
    }

    fn when_queue(&self, queue: ContinuationQueue<T, E>)
    where
        T: Clone + 'static,
        E: Clone + 'static,
    {
        (**self).when_queue(queue)
    }

    fn state_ptr(&self) -> Option<*const ()> {
        (**self).state_ptr()
    }
}

/// A value a computation suspends on.
///
/// The `Coroutine` driver classifies each yielded value with
/// `into_awaitable()`: `Left` is something to wait on, `Right` is an
/// invalid-suspension fault that fails the coroutine.
///
/// Every awaitable in this crate is a `Suspension`. So are `Option`s of
/// them, where `None` is invalid, and `Either<A, X>`, where anything on the
/// right is invalid and described with its `Debug` output.
pub trait Suspension<T, E> {
    fn into_awaitable(self) -> Either<Rc<dyn Awaitable<T, E>>, InvalidYield>;
}

impl<T, E> Suspension<T, E> for Rc<dyn Awaitable<T, E>> {
    fn into_awaitable(self) -> Either<Rc<dyn Awaitable<T, E>>, InvalidYield> {
        Either::Left(self)
    }
}

impl<T, E, A> Suspension<T, E> for Option<A>
where
    A: Suspension<T, E>,
{
    fn into_awaitable(self) -> Either<Rc<dyn Awaitable<T, E>>, InvalidYield> {
        match self {
            Some(suspension) => suspension.into_awaitable(),
            None => Either::Right(InvalidYield::new("None")),
        }
    }
}

impl<T, E, A, X> Suspension<T, E> for Either<A, X>
where
    A: Suspension<T, E>,
    X: std::fmt::Debug,
{
    fn into_awaitable(self) -> Either<Rc<dyn Awaitable<T, E>>, InvalidYield> {
        match self {
            Either::Left(suspension) => suspension.into_awaitable(),
            Either::Right(other) => Either::Right(InvalidYield::new(format!("{other:?}"))),
        }
    }
}

/// Implements `Suspension` for a concrete awaitable type by boxing it into a
/// trait object.
macro_rules! impl_suspension {
    ($($awaitable:ident),* $(,)?) => {
        $(
            impl<T, E> $crate::awaitable::Suspension<T, E> for $awaitable<T, E>
            where
                T: Clone + 'static,
                E: Clone + 'static,
            {
                fn into_awaitable(
                    self,
                ) -> ::either::Either<
                    ::std::rc::Rc<dyn $crate::awaitable::Awaitable<T, E>>,
                    $crate::error::InvalidYield,
                > {
                    ::either::Either::Left(::std::rc::Rc::new(self))
                }
            }
        )*
    };
}

pub(crate) use impl_suspension;
