use std::fmt;
use std::marker::PhantomData;

use crate::awaitable::{Awaitable, Observer, impl_suspension};
use crate::queue::notify;

/// An awaitable that has already resolved.
///
/// Every observer is invoked on the spot with the value. Yielding one from a
/// computation resumes it synchronously, which is how chains of synchronous
/// settlements build up on the native stack.
pub struct Success<T, E> {
    value: T,
    _error: PhantomData<fn() -> E>,
}

impl<T, E> Success<T, E> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            _error: PhantomData,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<T: Clone, E> Awaitable<T, E> for Success<T, E> {
    fn when(&self, observer: Observer<T, E>) {
        notify(observer, Ok(self.value.clone()));
    }
}

impl_suspension!(Success);

impl<T: Clone, E> Clone for Success<T, E> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Success<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Success").field(&self.value).finish()
    }
}
