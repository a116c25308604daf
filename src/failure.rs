use std::fmt;
use std::marker::PhantomData;

use crate::awaitable::{Awaitable, Observer, impl_suspension};
use crate::queue::notify;

/// An awaitable that has already failed.
///
/// Every observer is invoked on the spot with the error. If an observer
/// panics, the panic is re-raised on the next turn of the current scheduler
/// and `when()` still returns normally.
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use coawait::{Awaitable, Failure};
///
/// let failure = Failure::<u8, &str>::new("unreachable host");
/// let seen = Rc::new(RefCell::new(None));
/// let sink = seen.clone();
/// failure.when(Box::new(move |outcome| *sink.borrow_mut() = Some(outcome)));
/// assert_eq!(*seen.borrow(), Some(Err("unreachable host")));
/// ```
pub struct Failure<T, E> {
    error: E,
    _value: PhantomData<fn() -> T>,
}

impl<T, E> Failure<T, E> {
    pub fn new(error: E) -> Self {
        Self {
            error,
            _value: PhantomData,
        }
    }

    pub fn error(&self) -> &E {
        &self.error
    }
}

impl<T, E: Clone> Awaitable<T, E> for Failure<T, E> {
    fn when(&self, observer: Observer<T, E>) {
        notify(observer, Err(self.error.clone()));
    }
}

impl_suspension!(Failure);

impl<T, E: Clone> Clone for Failure<T, E> {
    fn clone(&self) -> Self {
        Self::new(self.error.clone())
    }
}

impl<T, E: fmt::Debug> fmt::Debug for Failure<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Failure").field(&self.error).finish()
    }
}
