use crate::coro::Coro;
use crate::suspend::Suspend::Return;
use crate::suspend::Suspend::Yield;

/// Extension trait with assertions for stepping a computation by hand in
/// tests, without a `Coroutine` driver in the way.
///
/// Each assertion resumes the computation once and, when it suspends, hands
/// back the next state so that assertions chain:
///
/// ```rust
/// use core::ops::ControlFlow::{Break, Continue};
///
/// use coawait::{CoroAssertions, Resumption, from_control_flow};
///
/// let mut total = 0;
/// from_control_flow(move |input: Resumption<i32, String>| match input {
///     Resumption::Start => Continue("first"),
///     Resumption::Value(n) if total == 0 => {
///         total += n;
///         Continue("second")
///     }
///     Resumption::Value(n) => Break(Ok(total + n)),
///     Resumption::Error(e) => Break(Err(e)),
/// })
/// .assert_yields(Resumption::Start, "first")
/// .assert_yields(Resumption::Value(1), "second")
/// .assert_returns(Resumption::Value(2), Ok(3));
/// ```
pub trait CoroAssertions<I, Y, R>: Coro<I, Y, R> {
    /// Resumes with `input` and asserts that the computation suspends with a
    /// value equal to `expected`. Panics if it returns instead.
    fn assert_yields(self, input: I, expected: Y) -> Self::Next
    where
        Y: PartialEq + core::fmt::Debug,
        R: core::fmt::Debug,
    {
        match self.resume(input) {
            Yield(actual, next) => {
                assert_eq!(
                    actual, expected,
                    "expected Yield({expected:?}), got Yield({actual:?})"
                );
                next
            }
            Return(actual) => {
                panic!("expected Yield({expected:?}), got Return({actual:?})")
            }
        }
    }

    /// Resumes with `input` and asserts that the computation suspends, without
    /// looking at what it suspended on. Awaitables are rarely comparable, so
    /// this is the usual way to step through a computation's awaits.
    fn assert_suspends(self, input: I) -> Self::Next
    where
        R: core::fmt::Debug,
    {
        match self.resume(input) {
            Yield(_, next) => next,
            Return(actual) => {
                panic!("expected a suspension, got Return({actual:?})")
            }
        }
    }

    /// Resumes with `input` and asserts that the computation finishes with a
    /// value equal to `expected`. Panics if it suspends instead.
    fn assert_returns(self, input: I, expected: R)
    where
        R: PartialEq + core::fmt::Debug,
    {
        match self.resume(input) {
            Yield(_, _) => {
                panic!("expected Return({expected:?}), got a suspension")
            }
            Return(actual) => {
                assert_eq!(
                    actual, expected,
                    "expected Return({expected:?}), got Return({actual:?})"
                );
            }
        }
    }
}

impl<I, Y, R, T> CoroAssertions<I, Y, R> for T where T: Coro<I, Y, R> {}
