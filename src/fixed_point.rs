use crate::coro::Coro;

/// A refinement of `Coro` whose `Next` associated type is `Self`.
///
/// The `Coroutine` driver stores the computation between suspension points,
/// so it needs a single type for every state the computation can be in. Any
/// `Coro` with `Next = Self` gets this trait for free; hand-written enum state
/// machines and `from_control_flow()` closures both qualify.
///
/// ```rust
/// use coawait::{Coro, FixedPointCoro, Return, Suspend, Yield};
///
/// struct Ticks(u8);
/// impl Coro<(), u8, ()> for Ticks {
///     type Next = Self;
///     fn resume(self, _: ()) -> Suspend<u8, (), Self> {
///         match self.0 {
///             0 => Return(()),
///             n => Yield(n, Ticks(n - 1)),
///         }
///     }
/// }
///
/// fn drain(mut k: impl FixedPointCoro<(), u8, ()>) -> Vec<u8> {
///     let mut seen = Vec::new();
///     while let Yield(n, next) = k.resume(()) {
///         seen.push(n);
///         k = next;
///     }
///     seen
/// }
///
/// assert_eq!(drain(Ticks(3).fixed_point()), vec![3, 2, 1]);
/// ```
///
/// # Safety
///
/// This is a marker trait. It is implemented automatically for every `Coro`
/// whose `Next` is `Self` and should never be implemented by hand.
pub unsafe trait FixedPointCoro<I, Y, R>:
    Coro<I, Y, R, Next = Self>
{
    /// A no-op that fails to compile when `self` is not a fixed point. Useful
    /// for checking a computation before handing it to a `Coroutine`.
    fn fixed_point(self) -> Self {
        self
    }
}

unsafe impl<I, Y, R, C> FixedPointCoro<I, Y, R> for C where
    C: Coro<I, Y, R, Next = C>
{
}
