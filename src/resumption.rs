/// What a computation is resumed with.
///
/// The driver starts every computation with `Start`. After that, each
/// suspension point is resumed with the outcome of the awaitable the
/// computation suspended on: `Value` when it resolved, `Error` when it
/// failed. Receiving an `Error` is the computation's chance to recover, the
/// same way it would from a failing synchronous call: handle it and keep
/// going, or `Return(Err(..))` to raise it further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resumption<T, E> {
    Start,
    Value(T),
    Error(E),
}

impl<T, E> Resumption<T, E> {
    /// `None` for `Start`, otherwise the delivered outcome.
    pub fn into_outcome(self) -> Option<Result<T, E>> {
        match self {
            Resumption::Start => None,
            Resumption::Value(value) => Some(Ok(value)),
            Resumption::Error(error) => Some(Err(error)),
        }
    }
}

impl<T, E> From<Result<T, E>> for Resumption<T, E> {
    fn from(outcome: Result<T, E>) -> Self {
        match outcome {
            Ok(value) => Resumption::Value(value),
            Err(error) => Resumption::Error(error),
        }
    }
}
