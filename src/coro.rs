use crate::suspend::Suspend;

/// A suspendable computation that can be resumed with an input value of type
/// `I`, returning a suspended state that either "yields" a value of type `Y`
/// or "returns" a value of type `R`.
///
/// The `resume()` method consumes the computation. The caller only gets a
/// computation back to resume again if it yielded. Once it has returned,
/// there is nothing left to resume, so the "resumed after completion" class of
/// bugs cannot be expressed.
///
/// The `Coroutine` driver consumes computations of the shape
/// `Coro<Resumption<T, E>, Y, Result<T, E>>`:
///
///   * the input is a `Resumption`: the initial `Start`, a `Value` sent back
///     in from a resolved awaitable, or an `Error` raised at the suspension
///     point by a failed one;
///   * the yield type is something the driver can wait on (see
///     `Suspension`);
///   * the return type is `Ok` with the final value, or `Err` when the
///     computation raises.
///
/// Computations are usually hand-written state machines, or closures turned
/// into computations with `from_control_flow()`.
///
/// # Examples
///
/// ```rust
/// use coawait::{Coro, CoroAssertions, Return, Suspend, Yield};
///
/// enum Countdown {
///     At(u32),
/// }
///
/// impl Coro<(), u32, &'static str> for Countdown {
///     type Next = Self;
///     fn resume(self, _: ()) -> Suspend<u32, &'static str, Self> {
///         match self {
///             Countdown::At(0) => Return("liftoff"),
///             Countdown::At(n) => Yield(n, Countdown::At(n - 1)),
///         }
///     }
/// }
///
/// Countdown::At(2)
///     .assert_yields((), 2)
///     .assert_yields((), 1)
///     .assert_returns((), "liftoff");
/// ```
pub trait Coro<I, Y, R>: Sized {
    /// The next state of the computation after a call to `resume()`, if it
    /// yields a value.
    ///
    /// When `Next` is `Self` the computation is a fixed-point coroutine and
    /// automatically implements `FixedPointCoro`, which is what the driver
    /// needs to keep it in place between suspension points.
    type Next: Coro<I, Y, R>;

    /// Runs the computation up to its next suspension point or to completion.
    fn resume(self, input: I) -> Suspend<Y, R, Self::Next>;
}
