/// The state of a computation after a call to `resume()` has finished.
///
///   * `Yield(y, n)`: the computation stopped at a suspension point with the
///     value `y`. `n` is the computation to resume once `y` settles.
///   * `Return(r)`: the computation ran to completion with `r`. Nothing is
///     left to resume, because `resume()` consumed it.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Suspend<Y, R, N> {
    Yield(Y, N),
    Return(R),
}
