use core::marker::PhantomData;
use core::ops::ControlFlow;

use ControlFlow::*;
use Suspend::*;

use crate::coro::Coro;
use crate::suspend::Suspend;

#[derive(Clone)]
pub struct FromControlFlow<F, I, Y, R> {
    f: F,
    _marker: PhantomData<(I, Y, R)>,
}

/// Creates a computation from a function that returns [`ControlFlow`].
///
/// The function is called every time the computation is resumed.
/// `Continue(y)` suspends the computation at `y`; `Break(r)` finishes it with
/// `r`. State carried across suspension points lives in the closure's
/// captures, which makes the result a fixed-point computation that the
/// `Coroutine` driver can run.
///
/// # Examples
///
/// A computation that waits on two awaitables and joins their values:
///
/// ```rust
/// use core::ops::ControlFlow::{Break, Continue};
///
/// use coawait::{Coroutine, Resumption, Status, Success, from_control_flow};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Oops(String);
/// impl From<coawait::InvalidYield> for Oops {
///     fn from(fault: coawait::InvalidYield) -> Self {
///         Oops(fault.to_string())
///     }
/// }
///
/// let mut parts: Vec<String> = Vec::new();
/// let joined = Coroutine::new(from_control_flow(move |input: Resumption<String, Oops>| match input {
///     Resumption::Start => Continue(Success::<String, Oops>::new("hello".to_string())),
///     Resumption::Value(part) => {
///         parts.push(part);
///         if parts.len() < 2 {
///             Continue(Success::new("world".to_string()))
///         } else {
///             Break(Ok(parts.join(" ")))
///         }
///     }
///     Resumption::Error(Oops(reason)) => Break(Err(Oops(reason))),
/// }));
///
/// assert_eq!(joined.status(), Status::Resolved);
/// assert_eq!(joined.outcome(), Some(Ok("hello world".to_string())));
/// ```
pub fn from_control_flow<I, Y, R, F>(f: F) -> FromControlFlow<F, I, Y, R>
where
    F: FnMut(I) -> ControlFlow<R, Y>,
{
    FromControlFlow {
        f,
        _marker: PhantomData,
    }
}

impl<I, Y, R, F> Coro<I, Y, R> for FromControlFlow<F, I, Y, R>
where
    F: FnMut(I) -> ControlFlow<R, Y>,
{
    type Next = Self;

    fn resume(mut self, input: I) -> Suspend<Y, R, Self> {
        match (self.f)(input) {
            Continue(y) => Yield(y, self),
            Break(r) => Return(r),
        }
    }
}
